//! pistis CLI - Command line interface for pistis_db
//!
//! Each invocation replays the fact log into a fresh index, so every command
//! sees the same root digest for the same log.

use clap::{Parser, Subcommand};
use pistis_db::snapshot::{read_bundle, write_bundle};
use pistis_db::{
    prove_membership, verify, Config, FactLog, FactRecord, Hash, Membership, NullSink,
    QueryEngine, QueryResult, SinkConfig, SnapshotEncryptor, TripleIndex,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pistis")]
#[command(about = "A verifiable triple index with proofs, encrypted snapshots and join queries")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the fact log (overrides the config)
    #[arg(long)]
    facts: Option<PathBuf>,

    /// Write bucket digests to this sink file (overrides the config)
    #[arg(long)]
    sink: Option<PathBuf>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty fact log
    Init,

    /// Insert a fact
    Insert {
        subject: String,
        predicate: String,
        object: String,
        /// Human-readable statement (defaults to "<subject> <predicate> <object>")
        #[arg(short, long)]
        payload: Option<String>,
    },

    /// List facts touching a term in any role
    Lookup {
        term: String,
    },

    /// Show the root digest
    Root,

    /// Produce and check a membership proof for a term's bucket
    Prove {
        term: String,
    },

    /// Run a two-hop join: <subject> <predicate1> ?o . ?o <predicate2> ?x
    Query {
        subject: String,
        predicate1: String,
        predicate2: String,
        /// Parties receiving shares (comma separated; defaults to the config)
        #[arg(short, long, value_delimiter = ',')]
        parties: Vec<String>,
        /// Keep only results whose object is this term
        #[arg(long)]
        filter: Option<String>,
    },

    /// Export an encrypted, shuffled snapshot of the index
    Export {
        /// Seed the encryption key is derived from
        #[arg(short, long)]
        seed: String,
        /// Seed for the shuffle, for reproducible exports
        #[arg(long)]
        rng_seed: Option<u64>,
        /// Write the export to this bundle file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Decrypt every record of an exported bundle
    Decrypt {
        /// Bundle file written by `export --out`
        bundle: PathBuf,
        /// Seed the encryption key is derived from
        #[arg(short, long)]
        seed: String,
    },

    /// Show index status
    Status,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    if let Some(facts) = &cli.facts {
        config.facts = facts.clone();
    }
    if let Some(sink) = &cli.sink {
        config.sink = SinkConfig::File { path: sink.clone() };
    }
    let log = FactLog::new(&config.facts);

    match cli.command {
        Commands::Init => {
            log.init()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "message": format!("Created fact log at {}", log.path().display())
                }),
            );
        }

        Commands::Insert {
            subject,
            predicate,
            object,
            payload,
        } => {
            let payload = payload.unwrap_or_else(|| format!("{} {} {}", subject, predicate, object));
            log.append(&FactRecord::new(subject, predicate, object, payload))?;
            let index = open_index(&config, &log)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "facts": index.fact_count(),
                    "root": index.root_digest().to_hex()
                }),
            );
        }

        Commands::Lookup { term } => {
            let index = open_index(&config, &log)?;
            let items: Vec<_> = index
                .lookup_term(&term)
                .iter()
                .map(|fact| {
                    serde_json::json!({
                        "payload": fact.payload,
                        "subject": fact.triple.subject.to_hex(),
                        "predicate": fact.triple.predicate.to_hex(),
                        "object": fact.triple.object.to_hex()
                    })
                })
                .collect();
            output(
                &cli.format,
                &serde_json::json!({
                    "term": term,
                    "count": items.len(),
                    "facts": items
                }),
            );
        }

        Commands::Root => {
            let index = open_index(&config, &log)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "root": index.root_digest().to_hex()
                }),
            );
        }

        Commands::Prove { term } => {
            let index = open_index(&config, &log)?;
            let target = Hash::of_term(&term);
            let value = match prove_membership(&index, &target) {
                Membership::Found(proof) => {
                    let leaf = index.bucket(&target).map(|n| n.digest()).unwrap_or_default();
                    serde_json::json!({
                        "term": term,
                        "found": true,
                        "root": index.root_digest().to_hex(),
                        "leaf": leaf.to_hex(),
                        "path": hex_list(&proof.path),
                        "verified": verify(&proof, &index.root_digest(), &leaf)
                    })
                }
                Membership::Absent => serde_json::json!({
                    "term": term,
                    "found": false,
                    "root": index.root_digest().to_hex()
                }),
            };
            output(&cli.format, &value);
        }

        Commands::Query {
            subject,
            predicate1,
            predicate2,
            parties,
            filter,
        } => {
            let index = open_index(&config, &log)?;
            let parties = if parties.is_empty() {
                config.parties.clone()
            } else {
                parties
            };

            let engine = QueryEngine::new(&index);
            let result = match &filter {
                Some(term) => {
                    engine.extended_query(&subject, &predicate1, &predicate2, term, &parties)?
                }
                None => engine.query(&subject, &predicate1, &predicate2, &parties)?,
            };

            match cli.format {
                OutputFormat::Text => print!("{}", result),
                OutputFormat::Json => output(&cli.format, &query_json(&result)),
            }
        }

        Commands::Export {
            seed,
            rng_seed,
            out,
        } => {
            let index = open_index(&config, &log)?;
            let encryptor = SnapshotEncryptor::new();
            let records = match rng_seed {
                Some(s) => encryptor.export(&index, seed.as_bytes(), &mut StdRng::seed_from_u64(s))?,
                None => encryptor.export(&index, seed.as_bytes(), &mut rand::thread_rng())?,
            };

            if let Some(path) = &out {
                write_bundle(path, &records)?;
                output(
                    &cli.format,
                    &serde_json::json!({
                        "status": "ok",
                        "records": records.len(),
                        "bundle": path.display().to_string()
                    }),
                );
            } else {
                output(
                    &cli.format,
                    &serde_json::json!({
                        "root": index.root_digest(),
                        "count": records.len(),
                        "records": records
                    }),
                );
            }
        }

        Commands::Decrypt { bundle, seed } => {
            let records = read_bundle(&bundle)?;
            let encryptor = SnapshotEncryptor::new();
            let items = records
                .iter()
                .map(|r| -> anyhow::Result<serde_json::Value> {
                    let plaintext = encryptor.decrypt_node(r, seed.as_bytes())?;
                    Ok(serde_json::json!({
                        "digest": r.digest.to_hex(),
                        "plaintext": hex::encode(plaintext)
                    }))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "count": items.len(),
                    "records": items
                }),
            );
        }

        Commands::Status => {
            let index = open_index(&config, &log)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "facts_log": log.path().display().to_string(),
                    "facts": index.fact_count(),
                    "buckets": index.bucket_count(),
                    "root": index.root_digest().to_hex()
                }),
            );
        }
    }

    Ok(())
}

/// Replay the fact log, then publish the final bucket digests to the sink
///
/// Replaying straight into the sink would write every intermediate digest on
/// each invocation.
fn open_index(config: &Config, log: &FactLog) -> anyhow::Result<TripleIndex> {
    if !log.exists() {
        log::warn!(
            "no fact log at {}; run `pistis init` first",
            log.path().display()
        );
    }
    let facts = log.records()?.iter().map(FactRecord::to_fact).collect::<Vec<_>>();
    let mut index = TripleIndex::from_facts(facts, Arc::new(NullSink));
    index.attach_sink(config.sink.open()?);
    Ok(index)
}

fn hex_list(hashes: &[Hash]) -> Vec<String> {
    hashes.iter().map(Hash::to_hex).collect()
}

fn query_json(result: &QueryResult) -> serde_json::Value {
    let items: Vec<_> = result
        .facts
        .iter()
        .zip(&result.shares)
        .zip(&result.witnesses)
        .map(|((fact, shares), witness)| {
            serde_json::json!({
                "payload": fact.payload,
                "proof": hex_list(witness.path()),
                "shares": shares
            })
        })
        .collect();

    serde_json::json!({
        "count": items.len(),
        "results": items,
        "proof": hex_list(&result.proof),
        "trace": result.trace
    })
}

fn output(format: &OutputFormat, value: &serde_json::Value) {
    match format {
        OutputFormat::Json => {
            println!("{}", value);
        }
        OutputFormat::Text => {
            match serde_json::to_string_pretty(value) {
                Ok(pretty) => println!("{}", pretty),
                Err(_) => println!("{}", value),
            }
        }
    }
}
