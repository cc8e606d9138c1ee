//! Error types for rx-combine
//!
//! Stream failures are always the caller's own `E`; the errors here only
//! describe misuse of the library plumbing (promises, subscriptions, config).

use thiserror::Error;

/// Main error type for rx-combine operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The subscriber went away before the value could be delivered
    #[error("Operation cancelled")]
    Cancelled,
    /// A one-shot promise was resolved more than once
    #[error("Promise already resolved")]
    AlreadyResolved,
    /// `sink` was called outside of a tokio runtime
    #[error("No tokio runtime available to drive the subscription")]
    NoRuntime,
    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Config(err.to_string())
    }
}

impl From<tokio::runtime::TryCurrentError> for StreamError {
    fn from(_: tokio::runtime::TryCurrentError) -> Self {
        StreamError::NoRuntime
    }
}

/// Result type for rx-combine operations
pub type StreamResult<T> = Result<T, StreamError>;
