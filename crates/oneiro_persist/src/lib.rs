//! # Oneiro Persist
//!
//! Local persistence adapter trait and implementations for the Oneiro core.
//!
//! The adapter is a **full-replace document store** - each of the three
//! documents (local dreams, cached remote snapshot, pending mutations) is
//! read and written whole; there is no partial patch API.
//!
//! ## Design Principles
//!
//! - Adapters store documents; they never interpret sync state
//! - Writes are durable before the call returns
//! - Must be `Send + Sync` so the engine can share one adapter
//!
//! ## Available Adapters
//!
//! - [`MemoryAdapter`] - For tests and ephemeral sessions
//! - [`FileAdapter`] - JSON documents in a locked journal directory

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod error;
mod file;
mod memory;

pub use adapter::PersistenceAdapter;
pub use error::{PersistError, PersistResult};
pub use file::FileAdapter;
pub use memory::MemoryAdapter;
