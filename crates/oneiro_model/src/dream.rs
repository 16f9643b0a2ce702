//! The dream record and journal ordering helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Analysis lifecycle of a dream record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// No analysis has been requested.
    #[default]
    None,
    /// An analysis request is in flight.
    Pending,
    /// Analysis completed (possibly without an image).
    Done,
    /// Analysis failed; the record holds no derived fields.
    Failed,
}

/// Who authored a chat exchange entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The journal owner.
    User,
    /// The interpretation assistant.
    Assistant,
}

/// One entry in a dream's follow-up conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatExchange {
    /// Author of the entry.
    pub role: ChatRole,
    /// Message content.
    pub content: String,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

/// A dream journal record.
///
/// `id` is client-assigned and monotonically increasing; it is the primary
/// sort key (newest first). `remote_id` is present only once the backing
/// service has confirmed the record.
///
/// Field names serialize in camelCase because the persisted journal
/// documents are JSON shared with non-Rust consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dream {
    /// Client-assigned id, monotonically increasing.
    pub id: u64,
    /// Backing-service id, present once confirmed remotely.
    pub remote_id: Option<String>,
    /// Raw dream transcript as recorded.
    pub transcript: String,
    /// Derived title.
    pub title: Option<String>,
    /// Derived interpretation text.
    pub interpretation: Option<String>,
    /// Derived shareable quote.
    pub shareable_quote: Option<String>,
    /// Derived theme label.
    pub theme: Option<String>,
    /// Derived dream type label.
    pub dream_type: Option<String>,
    /// Full-size generated image URL.
    pub image_url: Option<String>,
    /// Thumbnail URL, derivable from `image_url`.
    pub thumbnail_url: Option<String>,
    /// Set when analysis succeeded but image generation failed.
    pub image_generation_failed: bool,
    /// Analysis lifecycle state.
    pub analysis_status: AnalysisStatus,
    /// Whether the record carries completed analysis fields.
    pub is_analyzed: bool,
    /// When the analysis completed.
    pub analyzed_at: Option<DateTime<Utc>>,
    /// Favorite flag.
    pub is_favorite: bool,
    /// True while a remote write for this record is still unconfirmed.
    pub pending_sync: bool,
    /// Idempotency token for remote writes.
    pub client_request_id: Option<Uuid>,
    /// Ordered follow-up conversation about this dream.
    pub chat_history: Vec<ChatExchange>,
}

impl Default for Dream {
    fn default() -> Self {
        Self {
            id: 0,
            remote_id: None,
            transcript: String::new(),
            title: None,
            interpretation: None,
            shareable_quote: None,
            theme: None,
            dream_type: None,
            image_url: None,
            thumbnail_url: None,
            image_generation_failed: false,
            analysis_status: AnalysisStatus::None,
            is_analyzed: false,
            analyzed_at: None,
            is_favorite: false,
            pending_sync: false,
            client_request_id: None,
            chat_history: Vec::new(),
        }
    }
}

impl Dream {
    /// Creates a fresh, unanalyzed record with a new idempotency token.
    pub fn new(id: u64, transcript: impl Into<String>) -> Self {
        Self {
            id,
            transcript: transcript.into(),
            client_request_id: Some(Uuid::new_v4()),
            ..Self::default()
        }
    }

    /// Merges server-confirmed fields from `remote` into this record.
    ///
    /// The local `id` and chat history are kept; `remote_id` and any
    /// server-derived fields are adopted. Clears `pending_sync`.
    pub fn merge_remote(&mut self, remote: Dream) {
        if remote.remote_id.is_some() {
            self.remote_id = remote.remote_id;
        }
        if remote.image_url.is_some() {
            self.image_url = remote.image_url;
        }
        if remote.thumbnail_url.is_some() {
            self.thumbnail_url = remote.thumbnail_url;
        }
        self.pending_sync = false;
    }

    /// Backfills a missing thumbnail URL from the full image URL.
    ///
    /// No-op when a thumbnail is already set or there is no image.
    pub fn normalize_thumbnail(&mut self) {
        if self.thumbnail_url.is_none() {
            if let Some(url) = &self.image_url {
                self.thumbnail_url = Some(thumbnail_url_for(url));
            }
        }
    }
}

/// Derives a thumbnail URL from a full-size image URL.
///
/// Storage objects accept render parameters, so the thumbnail is the same
/// object with width/quality constraints appended.
pub fn thumbnail_url_for(image_url: &str) -> String {
    let separator = if image_url.contains('?') { '&' } else { '?' };
    format!("{image_url}{separator}width=256&quality=60")
}

/// Sorts a journal list newest-first (id descending).
pub fn sort_newest_first(dreams: &mut [Dream]) {
    dreams.sort_by(|a, b| b.id.cmp(&a.id));
}

/// Inserts a record at its newest-first position.
///
/// Assumes `dreams` is already sorted id-descending.
pub fn insert_sorted(dreams: &mut Vec<Dream>, dream: Dream) {
    let at = dreams
        .iter()
        .position(|d| d.id < dream.id)
        .unwrap_or(dreams.len());
    dreams.insert(at, dream);
}

/// Returns the next client id: one past the highest id in the list.
pub fn next_dream_id(dreams: &[Dream]) -> u64 {
    dreams.iter().map(|d| d.id).max().unwrap_or(0) + 1
}
