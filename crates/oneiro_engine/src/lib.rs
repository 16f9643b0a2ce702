//! # Oneiro Engine
//!
//! Offline-first synchronization core for the Oneiro dream journal.
//!
//! This crate provides:
//! - [`DreamStore`] - authoritative in-memory journal list with dual-path
//!   (direct-remote vs. deferred-to-queue) write operations
//! - [`MutationQueue`] - ordered, persisted log of deferred operations
//! - [`SyncEngine`] - precondition-gated, fail-fast FIFO drain
//! - Analysis orchestration with a quota gate and partial-failure policy
//! - Trait seams for the remote client, AI service, and quota service,
//!   with mock implementations for testing
//!
//! ## Architecture
//!
//! The store reconciles three divergent sources: the last-known local
//! state, the last-known remote snapshot, and the durable log of
//! not-yet-applied operations. Reads and edits resolve instantly against
//! the in-memory list regardless of network state; deferred writes replay
//! once connectivity and authentication are available.
//!
//! ## Key Invariants
//!
//! - The journal list is newest-first by client-assigned id
//! - The mutation queue replays strictly in FIFO order, uncoalesced
//! - A drain stops at the first failure; later entries stay queued in order
//! - A drain already in progress is never started twice
//! - Dual-path write operations never throw for remote failures; they
//!   queue and resolve successfully
//! - Persistence completes before any queueing operation returns

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod ai;
mod analysis;
mod error;
mod queue;
mod remote;
mod session;
mod store;
mod sync;

pub use ai::{AiService, MockAiService, MockQuotaService, QuotaService};
pub use error::{EngineError, EngineResult};
pub use queue::MutationQueue;
pub use remote::{MockRemoteClient, RemoteCall, RemoteClient, RemoteError, RemoteResult};
pub use session::SessionState;
pub use store::{DreamStore, LocalApply};
pub use sync::{DrainReport, SyncEngine};
