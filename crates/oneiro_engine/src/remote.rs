//! Remote client abstraction for the backing service.

use oneiro_model::Dream;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors returned by the backing service or the transport under it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The server rejected or failed the request.
    #[error("server error: {0}")]
    Server(String),

    /// Validation failure; retrying the same request cannot succeed.
    #[error("client error: {0}")]
    Client(String),

    /// The service is shedding load.
    #[error("rate limited")]
    RateLimited,
}

impl RemoteError {
    /// True if a later attempt of the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Network(_) | RemoteError::Timeout | RemoteError::Server(_) => true,
            // Retryable in principle, but see should_auto_retry.
            RemoteError::RateLimited => true,
            RemoteError::Client(_) => false,
        }
    }

    /// True if the engine may retry without an external trigger.
    ///
    /// Rate-limit errors are never auto-retried so a drain cannot amplify
    /// the load that caused them; the next connectivity or auth trigger
    /// picks them up instead.
    pub fn should_auto_retry(&self) -> bool {
        self.is_retryable() && !matches!(self, RemoteError::RateLimited)
    }
}

/// Client for the remote backing store.
///
/// This trait abstracts the service API so the engine can be driven against
/// a real HTTP client or a mock in tests.
pub trait RemoteClient: Send + Sync {
    /// Creates a dream remotely; returns the server-confirmed record.
    fn create_dream(&self, dream: &Dream, user_id: &str) -> RemoteResult<Dream>;

    /// Updates a dream remotely, keyed by its `remote_id`.
    fn update_dream(&self, dream: &Dream) -> RemoteResult<Dream>;

    /// Deletes the remote record with the given id.
    fn delete_dream(&self, remote_id: &str) -> RemoteResult<()>;

    /// Fetches the full remote dream list for the authenticated user.
    fn fetch_dreams(&self) -> RemoteResult<Vec<Dream>>;
}

/// A recorded call against [`MockRemoteClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// `create_dream` was invoked.
    Create {
        /// Local id of the dream sent.
        dream_id: u64,
        /// User the record was created for.
        user_id: String,
    },
    /// `update_dream` was invoked.
    Update {
        /// Local id of the dream sent.
        dream_id: u64,
        /// Remote id the update was keyed by.
        remote_id: Option<String>,
    },
    /// `delete_dream` was invoked.
    Delete {
        /// Remote id targeted.
        remote_id: String,
    },
    /// `fetch_dreams` was invoked.
    Fetch,
}

/// A mock remote client for testing.
///
/// Failures are scripted per operation as FIFO queues; each queued error is
/// consumed by one call, after which calls succeed. Every invocation is
/// recorded for assertion.
#[derive(Debug, Default)]
pub struct MockRemoteClient {
    create_failures: Mutex<VecDeque<RemoteError>>,
    update_failures: Mutex<VecDeque<RemoteError>>,
    delete_failures: Mutex<VecDeque<RemoteError>>,
    fetch_response: Mutex<Option<RemoteResult<Vec<Dream>>>>,
    calls: Mutex<Vec<RemoteCall>>,
    next_remote_id: AtomicU64,
}

impl MockRemoteClient {
    /// Creates a mock where every call succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a failure for the next unscripted create call.
    pub fn fail_next_create(&self, error: RemoteError) {
        self.create_failures.lock().push_back(error);
    }

    /// Scripts a failure for the next unscripted update call.
    pub fn fail_next_update(&self, error: RemoteError) {
        self.update_failures.lock().push_back(error);
    }

    /// Scripts a failure for the next unscripted delete call.
    pub fn fail_next_delete(&self, error: RemoteError) {
        self.delete_failures.lock().push_back(error);
    }

    /// Sets the response for fetch calls.
    pub fn set_fetch_response(&self, response: RemoteResult<Vec<Dream>>) {
        *self.fetch_response.lock() = Some(response);
    }

    /// All recorded calls, in invocation order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    /// Number of recorded calls matching the predicate.
    pub fn count_calls(&self, predicate: impl Fn(&RemoteCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: RemoteCall) {
        self.calls.lock().push(call);
    }
}

impl RemoteClient for MockRemoteClient {
    fn create_dream(&self, dream: &Dream, user_id: &str) -> RemoteResult<Dream> {
        self.record(RemoteCall::Create {
            dream_id: dream.id,
            user_id: user_id.to_string(),
        });
        if let Some(error) = self.create_failures.lock().pop_front() {
            return Err(error);
        }
        let mut confirmed = dream.clone();
        let n = self.next_remote_id.fetch_add(1, Ordering::SeqCst) + 1;
        confirmed.remote_id = Some(format!("srv-{n}"));
        confirmed.pending_sync = false;
        Ok(confirmed)
    }

    fn update_dream(&self, dream: &Dream) -> RemoteResult<Dream> {
        self.record(RemoteCall::Update {
            dream_id: dream.id,
            remote_id: dream.remote_id.clone(),
        });
        if let Some(error) = self.update_failures.lock().pop_front() {
            return Err(error);
        }
        if dream.remote_id.is_none() {
            return Err(RemoteError::Client("update without remote id".into()));
        }
        Ok(dream.clone())
    }

    fn delete_dream(&self, remote_id: &str) -> RemoteResult<()> {
        self.record(RemoteCall::Delete {
            remote_id: remote_id.to_string(),
        });
        if let Some(error) = self.delete_failures.lock().pop_front() {
            return Err(error);
        }
        Ok(())
    }

    fn fetch_dreams(&self) -> RemoteResult<Vec<Dream>> {
        self.record(RemoteCall::Fetch);
        self.fetch_response
            .lock()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
