//! Error types for the engine.

use crate::remote::RemoteError;
use oneiro_persist::PersistError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the dream store and sync engine.
///
/// Remote-write failures inside the dual-path store operations are *not*
/// represented here - they are converted into queued mutations and never
/// reach the caller. What does reach the caller: persistence failures,
/// quota denials, and analysis failures that need immediate user-facing
/// handling.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Local persistence failed.
    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),

    /// A remote or AI call failed where deferral is not an option.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// The user's plan does not allow another analysis right now.
    #[error("analysis quota exceeded: {message}")]
    QuotaExceeded {
        /// User-facing message, tier-aware.
        message: String,
        /// Whether upgrading the plan would lift the limit.
        upgrade_eligible: bool,
    },

    /// The referenced dream is not in the store.
    #[error("dream {0} not found")]
    DreamNotFound(u64),
}

impl EngineError {
    /// Returns true for the typed quota error.
    pub fn is_quota(&self) -> bool {
        matches!(self, EngineError::QuotaExceeded { .. })
    }
}
