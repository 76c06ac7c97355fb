//! Error types for the ArraySense system.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Capture loading error: {0}")]
    Capture(String),

    #[error("Malformed capture record in {source_name} at line {line}: {reason}")]
    MalformedRecord {
        source_name: String,
        line: usize,
        reason: String,
    },

    #[error("Node count mismatch: registry has {expected} nodes, got {actual} capture sources")]
    NodeCount { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
