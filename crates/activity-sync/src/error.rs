//! Error types shared by the sync core and its collaborators.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by an activity or calendar source
#[derive(Debug, Error)]
pub enum SourceError {
    /// Token exchange or credential problem
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The service answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, TLS or timeout failure before a response arrived
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body did not have the expected shape
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl SourceError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        SourceError::UnexpectedResponse(message.into())
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => SourceError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None if err.is_decode() => SourceError::UnexpectedResponse(err.to_string()),
            None => SourceError::Transport(err.to_string()),
        }
    }
}

/// Startup validation failure. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingVars(Vec<String>),

    #[error(
        "Google credentials not found: GOOGLE_CREDENTIALS is not set and {} does not exist",
        .path.display()
    )]
    MissingGoogleCredentials { path: PathBuf },
}
