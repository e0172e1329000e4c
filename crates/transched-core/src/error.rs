//! Error types for transched

use thiserror::Error;

/// Main error type for transched
#[derive(Error, Debug)]
pub enum TranschedError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Device configured with a capacity below one
    #[error("Invalid capacity: {0}")]
    InvalidCapacity(String),

    /// Graph shape rejected by a strategy or generator
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// Edge or lookup referencing a device outside the graph
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// A round made no progress while transfers remained
    #[error("Scheduling stalled: {0}")]
    Stalled(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for transched operations
pub type TranschedResult<T> = Result<T, TranschedError>;

impl From<serde_json::Error> for TranschedError {
    fn from(err: serde_json::Error) -> Self {
        TranschedError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for TranschedError {
    fn from(err: toml::de::Error) -> Self {
        TranschedError::Config(err.to_string())
    }
}
