//! The dream store: single source of truth for the journal list.

use crate::ai::{AiService, QuotaService};
use crate::analysis;
use crate::error::{EngineError, EngineResult};
use crate::queue::MutationQueue;
use crate::remote::RemoteClient;
use crate::session::SessionState;
use chrono::Utc;
use oneiro_model::{
    insert_sorted, next_dream_id, sort_newest_first, AnalysisStatus, Dream, Mutation,
    MutationKind,
};
use oneiro_persist::PersistenceAdapter;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// How a queued mutation's local side effect is applied to the list.
///
/// Applied by the store atomically with the queue append, so UI state and
/// durable queue state never diverge. The queue itself never sees the list.
pub enum LocalApply {
    /// Replace the list wholesale.
    Replace(Vec<Dream>),
    /// Reduce the current list into the next one.
    Reduce(Box<dyn FnOnce(Vec<Dream>) -> Vec<Dream> + Send>),
}

/// Authoritative in-memory list of dream records.
///
/// The store arbitrates between the direct-remote and deferred-to-queue
/// paths per operation. Remote-write failures inside `add_dream`,
/// `update_dream` and `delete_dream` never reach the caller; they become a
/// queued mutation plus a `pending_sync` flag. Quota and analysis failures
/// propagate, because they need immediate user-facing handling.
pub struct DreamStore {
    session: Arc<SessionState>,
    persist: Arc<dyn PersistenceAdapter>,
    remote: Arc<dyn RemoteClient>,
    quota: Arc<dyn QuotaService>,
    ai: Arc<dyn AiService>,
    dreams: RwLock<Vec<Dream>>,
    queue: Mutex<MutationQueue>,
    loaded: AtomicBool,
}

impl DreamStore {
    /// Creates a store over the given session and service boundaries.
    pub fn new(
        session: Arc<SessionState>,
        persist: Arc<dyn PersistenceAdapter>,
        remote: Arc<dyn RemoteClient>,
        quota: Arc<dyn QuotaService>,
        ai: Arc<dyn AiService>,
    ) -> Self {
        let queue = MutationQueue::new(persist.clone());
        Self {
            session,
            persist,
            remote,
            quota,
            ai,
            dreams: RwLock::new(Vec::new()),
            queue: Mutex::new(queue),
            loaded: AtomicBool::new(false),
        }
    }

    /// The journal list, newest-first.
    pub fn dreams(&self) -> Vec<Dream> {
        self.dreams.read().clone()
    }

    /// Whether `load` has completed.
    pub fn loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Queue introspection: pending mutations in FIFO order.
    pub fn pending_mutations(&self) -> Vec<Mutation> {
        self.queue.lock().snapshot()
    }

    /// Queue introspection: number of pending mutations.
    pub fn queued_mutation_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// The session this store observes.
    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub(crate) fn remote(&self) -> &Arc<dyn RemoteClient> {
        &self.remote
    }

    pub(crate) fn queue(&self) -> &Mutex<MutationQueue> {
        &self.queue
    }

    /// Loads the journal, merging the freshest available base with any
    /// still-pending queued mutations.
    ///
    /// Unauthenticated: the locally saved list is the base. Authenticated:
    /// a remote fetch is attempted; on success the snapshot is cached and
    /// persisted, on failure the last cached snapshot is the base. Queued
    /// mutations are overlaid so unsynced local edits remain visible.
    pub fn load(&self) -> EngineResult<()> {
        let restored = self.persist.pending_mutations()?;
        self.queue.lock().set_pending(restored);

        let mut base = match self.session.user_id() {
            None => self.persist.saved_dreams()?,
            Some(_) => match self.remote.fetch_dreams() {
                Ok(snapshot) => {
                    self.persist.save_cached_remote_dreams(&snapshot)?;
                    snapshot
                }
                Err(error) => {
                    warn!(%error, "remote fetch failed, falling back to cached snapshot");
                    self.persist.cached_remote_dreams()?
                }
            },
        };

        {
            let queue = self.queue.lock();
            overlay_mutations(&mut base, queue.pending());
        }

        for dream in &mut base {
            dream.normalize_thumbnail();
        }
        sort_newest_first(&mut base);

        *self.dreams.write() = base;
        self.loaded.store(true, Ordering::SeqCst);
        debug!(count = self.dreams.read().len(), "journal loaded");
        Ok(())
    }

    /// Adds a dream.
    ///
    /// Unauthenticated: assigns the next id, persists locally, inserts
    /// sorted. Authenticated and online: attempts the remote create and
    /// merges the confirmed fields. On remote failure the record is queued
    /// and still inserted optimistically; this path never errors for the
    /// caller on network state.
    pub fn add_dream(&self, mut dream: Dream) -> EngineResult<Dream> {
        if dream.id == 0 {
            dream.id = next_dream_id(&self.dreams.read());
        }
        if dream.client_request_id.is_none() {
            dream.client_request_id = Some(Uuid::new_v4());
        }

        let Some(user) = self.session.user_id() else {
            let mut dreams = self.dreams.write();
            insert_sorted(&mut dreams, dream.clone());
            self.persist.save_dreams(&dreams)?;
            return Ok(dream);
        };

        if self.session.is_online() {
            match self.remote.create_dream(&dream, &user) {
                Ok(confirmed) => {
                    dream.merge_remote(confirmed);
                    insert_sorted(&mut self.dreams.write(), dream.clone());
                    return Ok(dream);
                }
                Err(error) => {
                    warn!(%error, dream_id = dream.id, "remote create failed, queueing");
                }
            }
        }

        dream.pending_sync = true;
        let inserted = dream.clone();
        self.queue_offline_operation(
            MutationKind::Create { dream: dream.clone() },
            LocalApply::Reduce(Box::new(move |mut list| {
                insert_sorted(&mut list, inserted);
                list
            })),
        )?;
        Ok(dream)
    }

    /// Updates a dream, dual-path like `add_dream`.
    pub fn update_dream(&self, mut dream: Dream) -> EngineResult<Dream> {
        let current_remote_id = {
            let dreams = self.dreams.read();
            let Some(existing) = dreams.iter().find(|d| d.id == dream.id) else {
                return Err(EngineError::DreamNotFound(dream.id));
            };
            existing.remote_id.clone()
        };
        // An edit built from stale state must not drop the confirmed id.
        if dream.remote_id.is_none() {
            dream.remote_id = current_remote_id;
        }

        if self.session.user_id().is_none() {
            let mut dreams = self.dreams.write();
            replace_by_id(&mut dreams, &dream);
            self.persist.save_dreams(&dreams)?;
            return Ok(dream);
        }

        if self.session.is_online() && dream.remote_id.is_some() {
            match self.remote.update_dream(&dream) {
                Ok(confirmed) => {
                    dream.merge_remote(confirmed);
                    replace_by_id(&mut self.dreams.write(), &dream);
                    return Ok(dream);
                }
                Err(error) => {
                    warn!(%error, dream_id = dream.id, "remote update failed, queueing");
                }
            }
        }

        dream.pending_sync = true;
        let updated = dream.clone();
        self.queue_offline_operation(
            MutationKind::Update { dream: dream.clone() },
            LocalApply::Reduce(Box::new(move |mut list| {
                replace_by_id(&mut list, &updated);
                list
            })),
        )?;
        Ok(dream)
    }

    /// Deletes a dream.
    ///
    /// The in-memory removal is immediate. A record that never synced is
    /// permanently retired: its queued create/update entries are cleared
    /// and nothing is queued, because the remote never heard of it.
    pub fn delete_dream(&self, id: u64) -> EngineResult<()> {
        let existing = self.dreams.read().iter().find(|d| d.id == id).cloned();
        let Some(existing) = existing else {
            return Ok(());
        };

        {
            let mut dreams = self.dreams.write();
            dreams.retain(|d| d.id != id);
            if self.session.user_id().is_none() {
                self.persist.save_dreams(&dreams)?;
            }
        }

        let retired = self.session.user_id().is_none() || existing.remote_id.is_none();
        if retired {
            self.queue.lock().clear_for_dream(id)?;
            return Ok(());
        }

        let remote_id = existing.remote_id.clone();
        if self.session.is_online() {
            if let Some(remote_id) = &remote_id {
                match self.remote.delete_dream(remote_id) {
                    Ok(()) => return Ok(()),
                    Err(error) => {
                        warn!(%error, dream_id = id, "remote delete failed, queueing");
                    }
                }
            }
        }

        self.queue.lock().enqueue(MutationKind::Delete {
            dream_id: id,
            remote_id,
        })?;
        Ok(())
    }

    /// Flips the favorite flag; no-op if the id is absent.
    pub fn toggle_favorite(&self, id: u64) -> EngineResult<()> {
        let Some(mut dream) = self.dreams.read().iter().find(|d| d.id == id).cloned() else {
            return Ok(());
        };
        dream.is_favorite = !dream.is_favorite;
        self.update_dream(dream)?;
        Ok(())
    }

    /// Runs the quota-gated AI analysis for a dream.
    ///
    /// Fails closed on quota denial without touching `analysis_status`.
    /// Interpretation failure aborts the whole operation and propagates;
    /// image failure alone is tolerated and flagged on the record.
    pub fn analyze_dream(
        &self,
        id: u64,
        transcript: &str,
        lang: Option<&str>,
    ) -> EngineResult<Dream> {
        if !self.quota.can_analyze_dream()? {
            return Err(self.quota.quota_error());
        }

        let existing_url = {
            let dreams = self.dreams.read();
            let Some(existing) = dreams.iter().find(|d| d.id == id) else {
                return Err(EngineError::DreamNotFound(id));
            };
            existing.image_url.clone()
        };

        self.set_analysis_status(id, AnalysisStatus::Pending)?;

        let outcome =
            analysis::run_analysis(self.ai.as_ref(), transcript, existing_url.as_deref(), lang);

        let result = match outcome.analysis {
            Ok(result) => result,
            Err(error) => {
                self.set_analysis_status(id, AnalysisStatus::Failed)?;
                return Err(error.into());
            }
        };

        let updated = {
            let mut dreams = self.dreams.write();
            let Some(dream) = dreams.iter_mut().find(|d| d.id == id) else {
                return Err(EngineError::DreamNotFound(id));
            };
            dream.title = Some(result.title);
            dream.interpretation = Some(result.interpretation);
            dream.shareable_quote = Some(result.shareable_quote);
            dream.theme = Some(result.theme);
            dream.dream_type = Some(result.dream_type);
            match outcome.image {
                Ok(url) => {
                    dream.image_url = Some(url);
                    dream.image_generation_failed = false;
                    dream.normalize_thumbnail();
                }
                Err(error) => {
                    warn!(%error, dream_id = id, "image generation failed");
                    dream.image_generation_failed = true;
                }
            }
            dream.is_analyzed = true;
            dream.analyzed_at = Some(Utc::now());
            dream.analysis_status = AnalysisStatus::Done;
            let updated = dream.clone();
            if self.session.user_id().is_none() {
                self.persist.save_dreams(&dreams)?;
            }
            updated
        };

        self.quota.invalidate();
        Ok(updated)
    }

    /// Queues a deferred operation and applies its local side effect.
    ///
    /// The append is persisted first; the list change is applied under the
    /// same queue lock, so the two can never be observed apart.
    pub fn queue_offline_operation(
        &self,
        kind: MutationKind,
        apply: LocalApply,
    ) -> EngineResult<Mutation> {
        let mut queue = self.queue.lock();
        let mutation = queue.enqueue(kind)?;
        let mut dreams = self.dreams.write();
        let current = std::mem::take(&mut *dreams);
        *dreams = match apply {
            LocalApply::Replace(list) => list,
            LocalApply::Reduce(reduce) => reduce(current),
        };
        Ok(mutation)
    }

    /// Replaces the optimistic record with the server-confirmed one.
    pub(crate) fn confirm_remote(&self, dream_id: u64, confirmed: Dream) {
        let mut dreams = self.dreams.write();
        if let Some(existing) = dreams.iter_mut().find(|d| d.id == dream_id) {
            existing.merge_remote(confirmed);
        }
    }

    /// The remote id the store currently knows for a dream.
    pub(crate) fn resolve_remote_id(&self, dream_id: u64) -> Option<String> {
        self.dreams
            .read()
            .iter()
            .find(|d| d.id == dream_id)
            .and_then(|d| d.remote_id.clone())
    }

    fn set_analysis_status(&self, id: u64, status: AnalysisStatus) -> EngineResult<()> {
        let mut dreams = self.dreams.write();
        let Some(dream) = dreams.iter_mut().find(|d| d.id == id) else {
            return Err(EngineError::DreamNotFound(id));
        };
        dream.analysis_status = status;
        if status == AnalysisStatus::Failed {
            dream.is_analyzed = false;
        }
        Ok(())
    }
}

fn replace_by_id(list: &mut [Dream], dream: &Dream) {
    if let Some(existing) = list.iter_mut().find(|d| d.id == dream.id) {
        *existing = dream.clone();
    }
}

/// Overlays still-pending queued mutations onto a fetched or cached base.
fn overlay_mutations(base: &mut Vec<Dream>, pending: &[Mutation]) {
    for mutation in pending {
        match &mutation.kind {
            MutationKind::Create { dream } => {
                if !base.iter().any(|d| d.id == dream.id) {
                    let mut dream = dream.clone();
                    dream.pending_sync = true;
                    base.push(dream);
                }
            }
            MutationKind::Update { dream } => {
                if let Some(existing) = base.iter_mut().find(|d| d.id == dream.id) {
                    let confirmed_id = existing.remote_id.clone();
                    *existing = dream.clone();
                    if existing.remote_id.is_none() {
                        existing.remote_id = confirmed_id;
                    }
                    existing.pending_sync = true;
                } else {
                    let mut dream = dream.clone();
                    dream.pending_sync = true;
                    base.push(dream);
                }
            }
            MutationKind::Delete { dream_id, .. } => {
                base.retain(|d| d.id != *dream_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockAiService, MockQuotaService};
    use crate::remote::{MockRemoteClient, RemoteCall, RemoteError};
    use oneiro_persist::MemoryAdapter;

    struct Fixture {
        session: Arc<SessionState>,
        persist: Arc<MemoryAdapter>,
        remote: Arc<MockRemoteClient>,
        quota: Arc<MockQuotaService>,
        ai: Arc<MockAiService>,
        store: DreamStore,
    }

    fn fixture() -> Fixture {
        let session = Arc::new(SessionState::new());
        let persist = Arc::new(MemoryAdapter::new());
        let remote = Arc::new(MockRemoteClient::new());
        let quota = Arc::new(MockQuotaService::allowing());
        let ai = Arc::new(MockAiService::new());
        let store = DreamStore::new(
            session.clone(),
            persist.clone(),
            remote.clone(),
            quota.clone(),
            ai.clone(),
        );
        Fixture { session, persist, remote, quota, ai, store }
    }

    #[test]
    fn unauthenticated_add_persists_locally_and_sorts() {
        let f = fixture();

        f.store.add_dream(Dream::new(0, "first")).unwrap();
        f.store.add_dream(Dream::new(0, "second")).unwrap();

        let dreams = f.store.dreams();
        assert_eq!(dreams.len(), 2);
        assert_eq!(dreams[0].transcript, "second");
        assert_eq!(dreams[0].id, 2);
        assert_eq!(f.persist.saved_dreams().unwrap().len(), 2);
        assert!(f.remote.calls().is_empty());
        assert_eq!(f.store.queued_mutation_count(), 0);
    }

    #[test]
    fn authenticated_online_add_merges_remote_id() {
        let f = fixture();
        f.session.sign_in("user-1");

        let dream = f.store.add_dream(Dream::new(0, "flying")).unwrap();
        assert!(dream.remote_id.is_some());
        assert!(!dream.pending_sync);
        assert_eq!(f.store.queued_mutation_count(), 0);
    }

    #[test]
    fn failed_remote_add_queues_and_inserts_optimistically() {
        let f = fixture();
        f.session.sign_in("user-1");
        f.remote.fail_next_create(RemoteError::Network("reset".into()));

        let dream = f.store.add_dream(Dream::new(0, "storm")).unwrap();
        assert!(dream.pending_sync);
        assert!(dream.remote_id.is_none());

        assert_eq!(f.store.dreams().len(), 1);
        assert_eq!(f.store.queued_mutation_count(), 1);
        assert_eq!(f.persist.pending_mutations().unwrap().len(), 1);
    }

    #[test]
    fn offline_add_queues_without_remote_attempt() {
        let f = fixture();
        f.session.sign_in("user-1");
        f.session.set_online(false);

        f.store.add_dream(Dream::new(0, "storm")).unwrap();
        assert!(f.remote.calls().is_empty());
        assert_eq!(f.store.queued_mutation_count(), 1);
    }

    #[test]
    fn offline_ops_all_visible_and_counted() {
        let f = fixture();
        f.session.sign_in("user-1");
        f.session.set_online(false);

        let a = f.store.add_dream(Dream::new(0, "a")).unwrap();
        let b = f.store.add_dream(Dream::new(0, "b")).unwrap();
        let mut edit = a.clone();
        edit.transcript = "a edited".into();
        f.store.update_dream(edit).unwrap();

        assert_eq!(f.store.dreams().len(), 2);
        assert_eq!(
            f.store.dreams().iter().find(|d| d.id == a.id).unwrap().transcript,
            "a edited"
        );
        // create + create + update, none confirmed
        assert_eq!(f.store.queued_mutation_count(), 3);
        let _ = b;
    }

    #[test]
    fn update_of_unknown_dream_errors() {
        let f = fixture();
        let result = f.store.update_dream(Dream::new(42, "ghost"));
        assert!(matches!(result, Err(EngineError::DreamNotFound(42))));
    }

    #[test]
    fn update_restores_confirmed_remote_id_from_store() {
        let f = fixture();
        f.session.sign_in("user-1");

        let created = f.store.add_dream(Dream::new(0, "t")).unwrap();
        let mut stale_edit = created.clone();
        stale_edit.remote_id = None;
        stale_edit.transcript = "t2".into();

        let updated = f.store.update_dream(stale_edit).unwrap();
        assert_eq!(updated.remote_id, created.remote_id);
        assert_eq!(
            f.remote.count_calls(|c| matches!(c, RemoteCall::Update { .. })),
            1
        );
    }

    #[test]
    fn delete_is_optimistic_and_queues_on_failure() {
        let f = fixture();
        f.session.sign_in("user-1");

        let dream = f.store.add_dream(Dream::new(0, "t")).unwrap();
        f.remote.fail_next_delete(RemoteError::Timeout);

        f.store.delete_dream(dream.id).unwrap();
        assert!(f.store.dreams().is_empty());

        let pending = f.store.pending_mutations();
        assert_eq!(pending.len(), 1);
        match &pending[0].kind {
            MutationKind::Delete { dream_id, remote_id } => {
                assert_eq!(*dream_id, dream.id);
                assert_eq!(*remote_id, dream.remote_id);
            }
            other => panic!("expected delete, got {other:?}"),
        }
    }

    #[test]
    fn delete_before_first_sync_retires_queued_entries() {
        let f = fixture();
        f.session.sign_in("user-1");
        f.session.set_online(false);

        let dream = f.store.add_dream(Dream::new(0, "t")).unwrap();
        let mut edit = dream.clone();
        edit.transcript = "t2".into();
        f.store.update_dream(edit).unwrap();
        assert_eq!(f.store.queued_mutation_count(), 2);

        f.store.delete_dream(dream.id).unwrap();
        assert_eq!(f.store.queued_mutation_count(), 0);
        assert!(f.store.dreams().is_empty());
        // The remote never heard of the record; nothing to delete there.
        assert!(f.remote.calls().is_empty());
    }

    #[test]
    fn delete_of_absent_id_is_a_noop() {
        let f = fixture();
        f.store.delete_dream(9).unwrap();
        assert!(f.store.dreams().is_empty());
    }

    #[test]
    fn toggle_favorite_flips_and_noops_on_absent() {
        let f = fixture();
        let dream = f.store.add_dream(Dream::new(0, "t")).unwrap();

        f.store.toggle_favorite(dream.id).unwrap();
        assert!(f.store.dreams()[0].is_favorite);
        f.store.toggle_favorite(dream.id).unwrap();
        assert!(!f.store.dreams()[0].is_favorite);

        f.store.toggle_favorite(999).unwrap();
    }

    #[test]
    fn load_unauthenticated_reads_saved_dreams() {
        let f = fixture();
        f.persist
            .save_dreams(&[Dream::new(2, "b"), Dream::new(1, "a")])
            .unwrap();

        f.store.load().unwrap();
        assert!(f.store.loaded());
        let ids: Vec<u64> = f.store.dreams().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(f.remote.calls().is_empty());
    }

    #[test]
    fn load_authenticated_caches_remote_snapshot() {
        let f = fixture();
        f.session.sign_in("user-1");
        let mut remote_dream = Dream::new(5, "from server");
        remote_dream.remote_id = Some("srv-5".into());
        f.remote.set_fetch_response(Ok(vec![remote_dream]));

        f.store.load().unwrap();
        assert_eq!(f.store.dreams().len(), 1);
        assert_eq!(f.persist.cached_remote_dreams().unwrap().len(), 1);
    }

    #[test]
    fn load_falls_back_to_cached_snapshot_on_fetch_failure() {
        let f = fixture();
        f.session.sign_in("user-1");
        f.persist
            .save_cached_remote_dreams(&[Dream::new(3, "cached")])
            .unwrap();
        f.remote.set_fetch_response(Err(RemoteError::Timeout));

        f.store.load().unwrap();
        assert_eq!(f.store.dreams().len(), 1);
        assert_eq!(f.store.dreams()[0].transcript, "cached");
    }

    #[test]
    fn load_overlays_pending_mutations_on_base() {
        let f = fixture();
        f.session.sign_in("user-1");

        let mut synced = Dream::new(1, "old text");
        synced.remote_id = Some("srv-1".into());
        f.remote.set_fetch_response(Ok(vec![synced.clone()]));

        // Queue state persisted by an earlier session: an unsynced create,
        // an edit of the synced record, and a delete of a third record.
        let mut edited = synced.clone();
        edited.transcript = "new text".into();
        edited.remote_id = None;
        f.persist
            .save_pending_mutations(&[
                Mutation::new(1, MutationKind::Create { dream: Dream::new(2, "offline") }),
                Mutation::new(2, MutationKind::Update { dream: edited }),
                Mutation::new(3, MutationKind::Delete { dream_id: 3, remote_id: None }),
            ])
            .unwrap();

        f.store.load().unwrap();
        let dreams = f.store.dreams();
        assert_eq!(dreams.len(), 2);

        let edited = dreams.iter().find(|d| d.id == 1).unwrap();
        assert_eq!(edited.transcript, "new text");
        assert!(edited.pending_sync);
        // The overlay keeps the confirmed remote id even though the queued
        // edit predates it.
        assert_eq!(edited.remote_id.as_deref(), Some("srv-1"));

        assert!(dreams.iter().any(|d| d.id == 2 && d.pending_sync));
    }

    #[test]
    fn load_normalizes_missing_thumbnails() {
        let f = fixture();
        let mut dream = Dream::new(1, "t");
        dream.image_url = Some("https://img.example.com/1.png".into());
        f.persist.save_dreams(&[dream]).unwrap();

        f.store.load().unwrap();
        let thumb = f.store.dreams()[0].thumbnail_url.clone().unwrap();
        assert!(thumb.contains("width=256"));
    }

    #[test]
    fn quota_denied_analysis_leaves_status_untouched() {
        let f = fixture();
        f.quota.set_allowed(false);
        let dream = f.store.add_dream(Dream::new(0, "t")).unwrap();

        let result = f.store.analyze_dream(dream.id, "t", None);
        assert!(matches!(result, Err(EngineError::QuotaExceeded { .. })));

        let stored = &f.store.dreams()[0];
        assert_eq!(stored.analysis_status, AnalysisStatus::None);
        assert!(!stored.is_analyzed);
        assert_eq!(f.ai.analyze_calls(), 0);
        assert_eq!(f.quota.invalidations(), 0);
    }

    #[test]
    fn interpretation_failure_marks_failed_and_propagates() {
        let f = fixture();
        let dream = f.store.add_dream(Dream::new(0, "t")).unwrap();
        f.ai.fail_next_analyze(RemoteError::Server("model unavailable".into()));

        let result = f.store.analyze_dream(dream.id, "t", None);
        assert!(matches!(result, Err(EngineError::Remote(_))));

        let stored = &f.store.dreams()[0];
        assert_eq!(stored.analysis_status, AnalysisStatus::Failed);
        assert!(!stored.is_analyzed);
        assert_eq!(f.quota.invalidations(), 0);
    }

    #[test]
    fn image_failure_alone_is_tolerated() {
        let f = fixture();
        let dream = f.store.add_dream(Dream::new(0, "t")).unwrap();
        f.ai.fail_next_image(RemoteError::Timeout);

        let analyzed = f.store.analyze_dream(dream.id, "t", None).unwrap();
        assert!(analyzed.is_analyzed);
        assert_eq!(analyzed.analysis_status, AnalysisStatus::Done);
        assert!(analyzed.image_generation_failed);
        assert!(analyzed.image_url.is_none());
        assert_eq!(f.quota.invalidations(), 1);
    }

    #[test]
    fn full_analysis_merges_fields_and_invalidates_quota() {
        let f = fixture();
        let dream = f.store.add_dream(Dream::new(0, "a long fall")).unwrap();

        let analyzed = f.store.analyze_dream(dream.id, "a long fall", Some("en")).unwrap();
        assert!(analyzed.is_analyzed);
        assert_eq!(analyzed.analysis_status, AnalysisStatus::Done);
        assert!(analyzed.title.is_some());
        assert!(analyzed.interpretation.is_some());
        assert!(analyzed.image_url.is_some());
        assert!(analyzed.thumbnail_url.is_some());
        assert!(analyzed.analyzed_at.is_some());
        assert!(!analyzed.image_generation_failed);
        assert_eq!(f.quota.invalidations(), 1);
        assert_eq!(f.ai.last_lang().as_deref(), Some("en"));
    }

    #[test]
    fn analyze_unknown_dream_errors_without_spending_quota() {
        let f = fixture();
        let result = f.store.analyze_dream(404, "t", None);
        assert!(matches!(result, Err(EngineError::DreamNotFound(404))));
        assert_eq!(f.quota.invalidations(), 0);
    }

    #[test]
    fn queue_offline_operation_replace_variant() {
        let f = fixture();
        f.store
            .queue_offline_operation(
                MutationKind::Create { dream: Dream::new(1, "x") },
                LocalApply::Replace(vec![Dream::new(1, "x")]),
            )
            .unwrap();

        assert_eq!(f.store.dreams().len(), 1);
        assert_eq!(f.store.queued_mutation_count(), 1);
    }
}
