//! The persistence adapter trait.

use crate::error::PersistResult;
use oneiro_model::{Dream, Mutation};

/// A local persistence adapter stores the three journal documents.
///
/// All operations have **full-replace semantics**: reads return the whole
/// document, writes replace it. Implementations must complete the write
/// durably before returning, so a crash between "apply in memory" and
/// "persist" cannot occur unobserved.
pub trait PersistenceAdapter: Send + Sync {
    /// Reads the locally saved dream list.
    fn saved_dreams(&self) -> PersistResult<Vec<Dream>>;

    /// Replaces the locally saved dream list.
    fn save_dreams(&self, dreams: &[Dream]) -> PersistResult<()>;

    /// Reads the last cached remote snapshot.
    fn cached_remote_dreams(&self) -> PersistResult<Vec<Dream>>;

    /// Replaces the cached remote snapshot.
    fn save_cached_remote_dreams(&self, dreams: &[Dream]) -> PersistResult<()>;

    /// Reads the pending-mutation log.
    fn pending_mutations(&self) -> PersistResult<Vec<Mutation>>;

    /// Replaces the pending-mutation log.
    fn save_pending_mutations(&self, mutations: &[Mutation]) -> PersistResult<()>;
}
