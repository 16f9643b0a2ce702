//! Deferred remote operations.

use crate::dream::Dream;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The operation a queued mutation defers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum MutationKind {
    /// A record the remote has never seen.
    Create {
        /// The record to create, as it stood when the write failed.
        dream: Dream,
    },
    /// An edit to a record.
    Update {
        /// The full edited record.
        dream: Dream,
    },
    /// A removal; carries both ids so the drain can target the remote record.
    Delete {
        /// Local client id.
        dream_id: u64,
        /// Remote id, if the record ever synced.
        remote_id: Option<String>,
    },
}

/// One entry in the pending-mutation log.
///
/// `id` is queue-unique but only FIFO position determines replay order.
/// `client_request_id` makes the deferred remote write idempotent across
/// drain retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
    /// Queue-unique id.
    pub id: u64,
    /// When the mutation was queued.
    pub created_at: DateTime<Utc>,
    /// Idempotency token; backfilled on legacy entries at restore time.
    #[serde(default)]
    pub client_request_id: Option<Uuid>,
    /// The deferred operation.
    #[serde(flatten)]
    pub kind: MutationKind,
}

impl Mutation {
    /// Creates a mutation queued now, with a fresh idempotency token.
    pub fn new(id: u64, kind: MutationKind) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            client_request_id: Some(Uuid::new_v4()),
            kind,
        }
    }

    /// The local dream id this mutation references.
    pub fn dream_id(&self) -> u64 {
        match &self.kind {
            MutationKind::Create { dream } | MutationKind::Update { dream } => dream.id,
            MutationKind::Delete { dream_id, .. } => *dream_id,
        }
    }
}
