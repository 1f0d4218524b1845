use thiserror::Error;

/// Top-level error type for the Charla system.
///
/// Subsystem crates define their own error types where failures are
/// recovered locally (the completion client does this), and convert into
/// `CharlaError` wherever a failure must cross a crate boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CharlaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Knowledge base error: {0}")]
    Knowledge(String),

    #[error("Session not found: {0}")]
    SessionNotFound(i64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for CharlaError {
    fn from(err: toml::de::Error) -> Self {
        CharlaError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CharlaError {
    fn from(err: toml::ser::Error) -> Self {
        CharlaError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CharlaError {
    fn from(err: serde_json::Error) -> Self {
        CharlaError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Charla operations.
pub type Result<T> = std::result::Result<T, CharlaError>;
