//! CLI configuration
//!
//! Stored as JSON in `~/.config/pistis/config.json` unless a path is given.
//! A missing file means defaults.

use crate::store::{FileSink, KeyValueSink, MemorySink, NullSink};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where bucket digests are written
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SinkConfig {
    #[default]
    None,
    Memory,
    File { path: PathBuf },
}

impl SinkConfig {
    /// Open the configured sink
    pub fn open(&self) -> Result<Arc<dyn KeyValueSink>> {
        let sink: Arc<dyn KeyValueSink> = match self {
            SinkConfig::None => Arc::new(NullSink),
            SinkConfig::Memory => Arc::new(MemorySink::new()),
            SinkConfig::File { path } => Arc::new(FileSink::open_or_create(path)?),
        };
        Ok(sink)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Parties receiving shares when a query names none
    pub parties: Vec<String>,
    /// Fact log replayed into the index on startup
    pub facts: PathBuf,
    pub sink: SinkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            parties: Vec::new(),
            facts: PathBuf::from("facts.pistis"),
            sink: SinkConfig::default(),
        }
    }
}

impl Config {
    /// Default location (`<config dir>/pistis/config.json`)
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".into()))?;
        Ok(dir.join("pistis").join("config.json"))
    }

    /// Load from `path`, falling back to defaults if the file does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from the default location
    pub fn load_default() -> Result<Self> {
        Self::load(Self::default_path()?)
    }

    /// Write to `path`, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            parties: vec!["OrgX".into(), "OrgY".into()],
            facts: dir.path().join("facts.jsonl"),
            sink: SinkConfig::File {
                path: dir.path().join("digests.kv"),
            },
        };

        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"parties": ["a"], "sink": {"kind": "memory"}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.parties, vec!["a".to_string()]);
        assert_eq!(config.sink, SinkConfig::Memory);
        assert_eq!(config.facts, Config::default().facts);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "parties = [").unwrap();

        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_file_sink_opens() {
        let dir = tempdir().unwrap();
        let sink = SinkConfig::File {
            path: dir.path().join("digests.kv"),
        }
        .open()
        .unwrap();
        sink.put(b"k", b"v").unwrap();
        assert!(dir.path().join("digests.kv").exists());
    }
}
