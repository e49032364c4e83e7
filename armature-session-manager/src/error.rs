//! Error types for session operations.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
///
/// Unknown or expired session ids are not errors: the store folds them into
/// "create a new session". Malformed cookie headers are likewise recovered
/// by the parser and never reach the caller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The random source could not supply bytes for a session id
    #[error("Entropy unavailable: {0}")]
    EntropyUnavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The store was built outside a tokio runtime
    #[error("Runtime error: {0}")]
    Runtime(String),
}
