//! Error types for pistis_db

use thiserror::Error;

/// Result type alias for pistis_db operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pistis_db operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Invalid parties: {0}")]
    InvalidParties(String),

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Config error: {0}")]
    Config(String),
}
