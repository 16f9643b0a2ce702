//! Error types for the persistence adapter.

use std::io;
use thiserror::Error;

/// Result type for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors that can occur in persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    /// I/O error from the underlying store.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Document failed to encode or decode.
    #[error("document codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Journal directory is locked by another process.
    #[error("journal directory locked: another process has exclusive access")]
    Locked,

    /// Injected failure (test adapters only).
    #[error("injected persistence failure")]
    Injected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            PersistError::Locked.to_string(),
            "journal directory locked: another process has exclusive access"
        );
    }
}
