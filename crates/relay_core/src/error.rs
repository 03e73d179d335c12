//! Error types for the relay core.
//!
//! Only two kinds of failure ever reach a caller: client errors (a request
//! was missing something it needs) and internal faults. An unknown client id
//! is never an error; lookups resolve to `false`, `None` or an empty list.

use thiserror::Error;

/// Errors surfaced by [`RelayService`](crate::RelayService) and the HTTP layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RelayError {
    /// A required field was absent or blank.
    #[error("{0} required")]
    MissingField(&'static str),

    /// A command was enqueued without any target client.
    #[error("at least one target userid required")]
    EmptyTargets,

    /// The command payload failed validation.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Socket binding or serving failed.
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected internal fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Whether the error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RelayError::MissingField(_) | RelayError::EmptyTargets | RelayError::InvalidCommand(_)
        )
    }
}

/// Convenience alias used across the crate.
pub type RelayResult<T> = Result<T, RelayError>;
