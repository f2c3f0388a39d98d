//! Error types for the LP portfolio service

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("Balance indexer error: {0}")]
    Indexer(String),

    #[error("Request deadline of {0} ms exceeded")]
    Deadline(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure was caused by the caller's input rather than by
    /// this service or one of its collaborators.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidAddress(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
