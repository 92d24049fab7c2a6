//! Error types shared across the hub, pumps and transports.

use thiserror::Error;

/// Value object validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueObjectError {
    #[error("message content must not be empty")]
    EmptyContent,

    #[error("message content is too long ({actual} characters, max {max})")]
    ContentTooLong { actual: usize, max: usize },
}

/// Failures reported by a transport. Recovered locally by the owning pump.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("read failed: {0}")]
    Read(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("transport closed by peer")]
    Closed,
}

/// A frame that could not be turned into a message. The frame is skipped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid content: {0}")]
    InvalidContent(#[from] ValueObjectError),
}

/// Hub submission errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HubError {
    /// The hub has shut down and no longer accepts requests
    #[error("hub is closed")]
    Closed,
}

/// Message repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
