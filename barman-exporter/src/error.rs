//! Application-wide error types.

use thiserror::Error;

use crate::barman::CommandError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// The server list could not be obtained, so no collection happened.
    #[error("Failed to enumerate servers: {0}")]
    Pipeline(#[source] CommandError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("HTTP server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }
}
