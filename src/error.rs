//! Error types for feeder.

use thiserror::Error;

/// Common error type for feeder.
#[derive(Error, Debug)]
pub enum FeederError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error (parse failure or failed validation).
    #[error("configuration error: {0}")]
    Config(String),

    /// Cache or state file could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    /// RSS/Atom feed could not be fetched or parsed.
    #[error("feed error: {0}")]
    Fetch(String),

    /// GitHub release listing failed.
    #[error("GitHub error: {0}")]
    GitHub(String),

    /// The source identifier is malformed.
    #[error("invalid source: {0}")]
    InvalidSource(String),

    /// The refresh cycle was cancelled before this source was fetched.
    #[error("refresh cancelled")]
    Cancelled,

    /// A fetch task panicked or was aborted.
    #[error("fetch task failed: {0}")]
    Task(String),
}

/// Result type alias for feeder operations.
pub type Result<T> = std::result::Result<T, FeederError>;
