//! # Oneiro Model
//!
//! Data model for the Oneiro offline-first dream journal core.
//!
//! This crate provides:
//! - The [`Dream`] record and its analysis/chat sub-types
//! - The [`Mutation`] log entry for deferred remote operations
//! - Ordering helpers (the journal is newest-first by client id)
//! - Image URL normalization
//!
//! ## Key Invariants
//!
//! - Dream ids are client-assigned and monotonically increasing
//! - The journal list is sorted by id descending (newest first)
//! - A mutation references exactly one dream id
//! - Mutations carry a `client_request_id` idempotency token

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod analysis;
mod dream;
mod mutation;

pub use analysis::DreamAnalysis;
pub use dream::{
    insert_sorted, next_dream_id, sort_newest_first, thumbnail_url_for, AnalysisStatus,
    ChatExchange, ChatRole, Dream,
};
pub use mutation::{Mutation, MutationKind};
