//! The pending-mutation queue.

use oneiro_model::{Mutation, MutationKind};
use oneiro_persist::{PersistResult, PersistenceAdapter};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Append-only, persisted log of operations the store could not apply
/// remotely yet.
///
/// The queue owns only the log. It never touches the in-memory dream list;
/// the store applies all list side effects itself, atomically with the
/// queue append.
///
/// # Invariants
///
/// - Entries replay strictly in FIFO order
/// - Entry ids are queue-unique but only position determines order
/// - Multiple mutations for one dream id are never coalesced
/// - Every append and removal is persisted before the call returns
pub struct MutationQueue {
    persist: Arc<dyn PersistenceAdapter>,
    entries: Vec<Mutation>,
    next_id: u64,
}

impl MutationQueue {
    /// Creates an empty queue over the given adapter.
    pub fn new(persist: Arc<dyn PersistenceAdapter>) -> Self {
        Self {
            persist,
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Produces the next queue-unique mutation id.
    pub fn next_mutation_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Appends a deferred operation and persists the queue.
    ///
    /// Returns the queued entry. The persist completes before this returns,
    /// so the durable log never lags the in-memory one.
    pub fn enqueue(&mut self, kind: MutationKind) -> PersistResult<Mutation> {
        let id = self.next_mutation_id();
        let mutation = Mutation::new(id, kind);
        self.entries.push(mutation.clone());
        self.persist_entries()?;
        debug!(mutation_id = id, queued = self.entries.len(), "queued offline mutation");
        Ok(mutation)
    }

    /// Bulk-replaces the queue from persisted state.
    ///
    /// Backfills a missing `client_request_id` on legacy entries and bumps
    /// the id counter past the highest restored id.
    pub fn set_pending(&mut self, mut mutations: Vec<Mutation>) {
        for mutation in &mut mutations {
            if mutation.client_request_id.is_none() {
                mutation.client_request_id = Some(Uuid::new_v4());
            }
        }
        self.next_id = mutations.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        self.entries = mutations;
    }

    /// Removes every entry referencing the given dream id.
    ///
    /// Persists the result and returns whether anything changed. Used when
    /// a dream is permanently retired, e.g. deleted before ever syncing.
    pub fn clear_for_dream(&mut self, dream_id: u64) -> PersistResult<bool> {
        let before = self.entries.len();
        self.entries.retain(|m| m.dream_id() != dream_id);
        if self.entries.len() == before {
            return Ok(false);
        }
        self.persist_entries()?;
        debug!(dream_id, removed = before - self.entries.len(), "retired queued mutations");
        Ok(true)
    }

    /// Removes the entries with the given ids, preserving the order of the
    /// rest, and persists the result.
    ///
    /// Persists even when `ids` is empty; the drain relies on the queue
    /// being persisted after every pass, complete or stopped early.
    pub fn remove_ids(&mut self, ids: &[u64]) -> PersistResult<()> {
        self.entries.retain(|m| !ids.contains(&m.id));
        self.persist_entries()
    }

    /// A snapshot of the pending entries in FIFO order.
    pub fn snapshot(&self) -> Vec<Mutation> {
        self.entries.clone()
    }

    /// Pending entries in FIFO order.
    pub fn pending(&self) -> &[Mutation] {
        &self.entries
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist_entries(&self) -> PersistResult<()> {
        self.persist.save_pending_mutations(&self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oneiro_model::Dream;
    use oneiro_persist::MemoryAdapter;

    fn queue_with_adapter() -> (MutationQueue, Arc<MemoryAdapter>) {
        let adapter = Arc::new(MemoryAdapter::new());
        (MutationQueue::new(adapter.clone()), adapter)
    }

    #[test]
    fn enqueue_assigns_sequential_ids_and_persists() {
        let (mut queue, adapter) = queue_with_adapter();

        let first = queue
            .enqueue(MutationKind::Create { dream: Dream::new(1, "a") })
            .unwrap();
        let second = queue
            .enqueue(MutationKind::Update { dream: Dream::new(1, "a2") })
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(adapter.pending_mutations().unwrap().len(), 2);
    }

    #[test]
    fn enqueue_failure_surfaces() {
        let (mut queue, adapter) = queue_with_adapter();
        adapter.fail_next_save();

        let result = queue.enqueue(MutationKind::Delete { dream_id: 1, remote_id: None });
        assert!(result.is_err());
    }

    #[test]
    fn set_pending_backfills_request_ids() {
        let (mut queue, _) = queue_with_adapter();

        let mut legacy = Mutation::new(7, MutationKind::Delete { dream_id: 2, remote_id: None });
        legacy.client_request_id = None;

        queue.set_pending(vec![legacy]);

        assert!(queue.pending()[0].client_request_id.is_some());
        // Counter continues past restored ids.
        assert_eq!(queue.next_mutation_id(), 8);
    }

    #[test]
    fn clear_for_dream_removes_all_and_only_matching() {
        let (mut queue, adapter) = queue_with_adapter();

        queue.enqueue(MutationKind::Create { dream: Dream::new(1, "a") }).unwrap();
        queue.enqueue(MutationKind::Update { dream: Dream::new(2, "b") }).unwrap();
        queue.enqueue(MutationKind::Update { dream: Dream::new(1, "a2") }).unwrap();
        queue
            .enqueue(MutationKind::Delete { dream_id: 1, remote_id: Some("srv-1".into()) })
            .unwrap();

        assert!(queue.clear_for_dream(1).unwrap());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pending()[0].dream_id(), 2);
        assert_eq!(adapter.pending_mutations().unwrap().len(), 1);
    }

    #[test]
    fn clear_for_dream_returns_false_when_none_match() {
        let (mut queue, _) = queue_with_adapter();
        queue.enqueue(MutationKind::Create { dream: Dream::new(1, "a") }).unwrap();

        assert!(!queue.clear_for_dream(99).unwrap());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn remove_ids_preserves_order_of_rest() {
        let (mut queue, _) = queue_with_adapter();
        for i in 1..=4 {
            queue
                .enqueue(MutationKind::Update { dream: Dream::new(i, "x") })
                .unwrap();
        }

        queue.remove_ids(&[1, 3]).unwrap();
        let ids: Vec<u64> = queue.pending().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 4]);
    }
}
