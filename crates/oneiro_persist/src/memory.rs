//! In-memory persistence adapter for testing.

use crate::adapter::PersistenceAdapter;
use crate::error::{PersistError, PersistResult};
use oneiro_model::{Dream, Mutation};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// An in-memory persistence adapter.
///
/// Stores all three documents in memory. Suitable for:
/// - Unit and integration tests
/// - Ephemeral sessions that never touch disk
///
/// Test helpers allow injecting a failure into the next save and counting
/// save calls, so callers can assert that queueing operations persist
/// before returning.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    dreams: RwLock<Vec<Dream>>,
    remote_cache: RwLock<Vec<Dream>>,
    mutations: RwLock<Vec<Mutation>>,
    fail_next_save: AtomicBool,
    save_count: AtomicU64,
}

impl MemoryAdapter {
    /// Creates a new empty adapter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an adapter pre-seeded with saved dreams.
    #[must_use]
    pub fn with_dreams(dreams: Vec<Dream>) -> Self {
        let adapter = Self::new();
        *adapter.dreams.write() = dreams;
        adapter
    }

    /// Makes the next save call fail with [`PersistError::Injected`].
    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }

    /// Number of save calls performed (all three documents combined).
    pub fn save_count(&self) -> u64 {
        self.save_count.load(Ordering::SeqCst)
    }

    fn record_save(&self) -> PersistResult<()> {
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            return Err(PersistError::Injected);
        }
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn saved_dreams(&self) -> PersistResult<Vec<Dream>> {
        Ok(self.dreams.read().clone())
    }

    fn save_dreams(&self, dreams: &[Dream]) -> PersistResult<()> {
        self.record_save()?;
        *self.dreams.write() = dreams.to_vec();
        Ok(())
    }

    fn cached_remote_dreams(&self) -> PersistResult<Vec<Dream>> {
        Ok(self.remote_cache.read().clone())
    }

    fn save_cached_remote_dreams(&self, dreams: &[Dream]) -> PersistResult<()> {
        self.record_save()?;
        *self.remote_cache.write() = dreams.to_vec();
        Ok(())
    }

    fn pending_mutations(&self) -> PersistResult<Vec<Mutation>> {
        Ok(self.mutations.read().clone())
    }

    fn save_pending_mutations(&self, mutations: &[Mutation]) -> PersistResult<()> {
        self.record_save()?;
        *self.mutations.write() = mutations.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oneiro_model::MutationKind;

    #[test]
    fn starts_empty() {
        let adapter = MemoryAdapter::new();
        assert!(adapter.saved_dreams().unwrap().is_empty());
        assert!(adapter.cached_remote_dreams().unwrap().is_empty());
        assert!(adapter.pending_mutations().unwrap().is_empty());
    }

    #[test]
    fn saves_replace_whole_documents() {
        let adapter = MemoryAdapter::new();

        adapter.save_dreams(&[Dream::new(1, "a"), Dream::new(2, "b")]).unwrap();
        assert_eq!(adapter.saved_dreams().unwrap().len(), 2);

        adapter.save_dreams(&[Dream::new(3, "c")]).unwrap();
        let dreams = adapter.saved_dreams().unwrap();
        assert_eq!(dreams.len(), 1);
        assert_eq!(dreams[0].id, 3);
    }

    #[test]
    fn injected_failure_hits_once() {
        let adapter = MemoryAdapter::new();
        adapter.fail_next_save();

        assert!(matches!(
            adapter.save_dreams(&[]),
            Err(PersistError::Injected)
        ));
        assert!(adapter.save_dreams(&[]).is_ok());
    }

    #[test]
    fn counts_saves_across_documents() {
        let adapter = MemoryAdapter::new();
        adapter.save_dreams(&[]).unwrap();
        adapter.save_cached_remote_dreams(&[]).unwrap();
        adapter
            .save_pending_mutations(&[Mutation::new(
                1,
                MutationKind::Delete { dream_id: 1, remote_id: None },
            )])
            .unwrap();
        assert_eq!(adapter.save_count(), 3);
    }
}
