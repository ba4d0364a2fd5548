//! Error types for wsync

use thiserror::Error;

/// Result type alias for wsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for wsync operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed repository list or identifier. Fatal before any git or API work.
    #[error("Invalid input: {0}")]
    InputFormat(String),

    /// Clone, fetch or push failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx response from the code host
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Repository, branch or ref absence
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local git command failure
    #[error("Git error: {0}")]
    Git(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error reports an absent resource rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Error::Git(err.message().to_string())
    }
}
