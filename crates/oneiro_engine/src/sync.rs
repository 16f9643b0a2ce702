//! The sync engine: drains the mutation queue against the remote client.

use crate::error::EngineResult;
use crate::remote::RemoteResult;
use crate::store::DreamStore;
use oneiro_model::{Mutation, MutationKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one drain pass.
#[derive(Debug, Clone, Default)]
pub struct DrainReport {
    /// True when another drain was already in progress and this call did
    /// nothing.
    pub skipped: bool,
    /// Number of mutations confirmed and removed this pass.
    pub drained: usize,
    /// Number of mutations still queued after the pass.
    pub remaining: usize,
    /// The failure that stopped the pass, if any.
    pub last_error: Option<String>,
}

impl DrainReport {
    fn skipped(remaining: usize) -> Self {
        Self {
            skipped: true,
            remaining,
            ..Self::default()
        }
    }

    fn noop(remaining: usize) -> Self {
        Self {
            remaining,
            ..Self::default()
        }
    }
}

/// Drains the pending-mutation queue under strict FIFO ordering.
///
/// A drain runs only when sync is enabled, a user is authenticated, the
/// device reports connectivity, and the queue is non-empty. The first
/// failure stops the pass: that entry and every later entry remain queued,
/// untouched, in original order, so operation N+1 is never applied before N
/// is confirmed. Failures are recorded on the [`DrainReport`], not thrown;
/// the next connectivity or auth trigger retries from the point of failure.
pub struct SyncEngine {
    store: Arc<DreamStore>,
    draining: AtomicBool,
}

impl SyncEngine {
    /// Creates a sync engine over the given store.
    pub fn new(store: Arc<DreamStore>) -> Self {
        Self {
            store,
            draining: AtomicBool::new(false),
        }
    }

    /// The store this engine drains for.
    pub fn store(&self) -> &Arc<DreamStore> {
        &self.store
    }

    /// Runs one drain pass.
    ///
    /// Non-re-entrant: a second invocation while a drain is in progress is
    /// a no-op and reports `skipped`.
    pub fn sync_pending_mutations(&self) -> EngineResult<DrainReport> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("drain already in progress, skipping");
            return Ok(DrainReport::skipped(self.store.queued_mutation_count()));
        }
        let result = self.drain();
        self.draining.store(false, Ordering::SeqCst);
        result
    }

    /// Forwards a connectivity signal; a restored connection triggers a
    /// drain attempt.
    pub fn on_connectivity_changed(&self, online: bool) -> EngineResult<DrainReport> {
        self.store.session().set_online(online);
        if online {
            self.sync_pending_mutations()
        } else {
            Ok(DrainReport::noop(self.store.queued_mutation_count()))
        }
    }

    /// Forwards an auth signal; an established identity triggers a drain
    /// attempt.
    pub fn on_auth_changed(&self, user_id: Option<&str>) -> EngineResult<DrainReport> {
        match user_id {
            Some(user_id) => {
                self.store.session().sign_in(user_id);
                self.sync_pending_mutations()
            }
            None => {
                self.store.session().sign_out();
                Ok(DrainReport::noop(self.store.queued_mutation_count()))
            }
        }
    }

    fn drain(&self) -> EngineResult<DrainReport> {
        let session = self.store.session();
        let pending = self.store.pending_mutations();

        let user = match session.user_id() {
            Some(user)
                if session.sync_enabled() && session.is_online() && !pending.is_empty() =>
            {
                user
            }
            _ => return Ok(DrainReport::noop(pending.len())),
        };

        let mut drained_ids = Vec::new();
        let mut last_error = None;

        for mutation in &pending {
            match self.process(mutation, &user) {
                Ok(()) => drained_ids.push(mutation.id),
                Err(error) => {
                    warn!(
                        %error,
                        mutation_id = mutation.id,
                        dream_id = mutation.dream_id(),
                        retryable = error.is_retryable(),
                        "drain stopped at failed mutation"
                    );
                    last_error = Some(error.to_string());
                    break;
                }
            }
        }

        self.store.queue().lock().remove_ids(&drained_ids)?;

        let remaining = self.store.queued_mutation_count();
        info!(drained = drained_ids.len(), remaining, "drain pass finished");
        Ok(DrainReport {
            skipped: false,
            drained: drained_ids.len(),
            remaining,
            last_error,
        })
    }

    fn process(&self, mutation: &Mutation, user: &str) -> RemoteResult<()> {
        match &mutation.kind {
            MutationKind::Create { dream } => {
                let confirmed = self.store.remote().create_dream(dream, user)?;
                self.store.confirm_remote(dream.id, confirmed);
                Ok(())
            }
            MutationKind::Update { dream } => {
                let mut payload = dream.clone();
                if payload.remote_id.is_none() {
                    // An earlier create in this same pass assigned it.
                    payload.remote_id = self.store.resolve_remote_id(dream.id);
                }
                if payload.remote_id.is_none() {
                    warn!(dream_id = dream.id, "dropping update with no remote id");
                    return Ok(());
                }
                let confirmed = self.store.remote().update_dream(&payload)?;
                self.store.confirm_remote(dream.id, confirmed);
                Ok(())
            }
            MutationKind::Delete { dream_id, remote_id } => match remote_id {
                Some(remote_id) => self.store.remote().delete_dream(remote_id),
                None => {
                    debug!(dream_id = *dream_id, "dropping delete for never-synced dream");
                    Ok(())
                }
            },
        }
    }
}
