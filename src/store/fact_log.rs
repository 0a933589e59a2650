//! JSON-lines log of inserted facts
//!
//! The index itself keeps nothing on disk. The CLI appends every inserted
//! statement to this log and replays it in order on startup, which rebuilds
//! an index with the same root digest.

use crate::model::Fact;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// One logged statement, kept as plain terms
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRecord {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub payload: String,
}

impl FactRecord {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        FactRecord {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            payload: payload.into(),
        }
    }

    /// Hash the terms into an indexable fact
    pub fn to_fact(&self) -> Fact {
        Fact::from_terms(&self.subject, &self.predicate, &self.object, &self.payload)
    }
}

/// Append-only fact log at a fixed path
pub struct FactLog {
    path: PathBuf,
}

impl FactLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FactLog {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create an empty log, truncating any existing one
    pub fn init(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::File::create(&self.path)?;
        Ok(())
    }

    /// Append one record
    pub fn append(&self, record: &FactRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Read every record in insertion order; a missing log reads as empty
    pub fn records(&self) -> Result<Vec<FactRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = std::fs::File::open(&self.path)?;
        let mut records = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| {
                Error::Format(format!(
                    "{}:{}: {}",
                    self.path.display(),
                    lineno + 1,
                    e
                ))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}
