//! Error types for GitHub operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub operations
#[derive(Error, Debug)]
pub enum Error {
    /// GitHub API error reported through octocrab
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// HTTP transport failure of a raw request
    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response to a raw request
    #[error("GitHub returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Authentication error
    #[error("GitHub authentication error: {0}")]
    Auth(String),

    /// Unusable client settings
    #[error("Invalid GitHub client configuration: {0}")]
    Config(String),

    /// The merge call returned without merging
    #[error("Pull request #{number} was not merged: {message}")]
    NotMerged { number: u64, message: String },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<Error> for wsync_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Api(octocrab::Error::GitHub { source, .. }) => {
                let status = source.status_code.as_u16();
                if status == 404 {
                    wsync_core::Error::NotFound(source.message)
                } else {
                    wsync_core::Error::Api {
                        status,
                        body: source.message,
                    }
                }
            }
            Error::Status { status: 404, body } => wsync_core::Error::NotFound(body),
            Error::Status { status, body } => wsync_core::Error::Api { status, body },
            Error::NotMerged { number, message } => wsync_core::Error::Api {
                status: 405,
                body: format!("pull request #{} not merged: {}", number, message),
            },
            Error::Auth(msg) | Error::Config(msg) => wsync_core::Error::Config(msg),
            other @ (Error::Api(_) | Error::Http(_)) => {
                wsync_core::Error::Transport(other.to_string())
            }
            Error::Other(msg) => wsync_core::Error::Other(msg),
        }
    }
}
