//! Unified error handling for the dispatch engine
//!
//! Single error type for everything that can abort a run. Provider-level
//! throttle and transient failures are deliberately NOT errors - they are
//! returned as [`crate::core::types::ExecOutcome`] variants so the
//! dispatcher's try-next-provider control flow stays uniform and
//! exception-free.

use thiserror::Error;

/// Result type alias using SwarmError
pub type Result<T> = std::result::Result<T, SwarmError>;

/// Unified error type for the dispatch engine
#[derive(Debug, Error)]
pub enum SwarmError {
    /// Malformed or invalid configuration (rejected at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(String),

    /// JSON/YAML (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Result or summary persistence failed (aborts the sprint)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl SwarmError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an HTTP client error
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

impl From<serde_json::Error> for SwarmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for SwarmError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for SwarmError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
