//! AI analysis output.

use serde::{Deserialize, Serialize};

/// Structured output of a dream interpretation request.
///
/// `image_prompt` feeds the image-generation call; the remaining fields are
/// merged into the dream record on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamAnalysis {
    /// Short title for the dream.
    pub title: String,
    /// Interpretation text.
    pub interpretation: String,
    /// One-line shareable quote.
    pub shareable_quote: String,
    /// Theme label.
    pub theme: String,
    /// Dream type label.
    pub dream_type: String,
    /// Prompt for the companion image.
    pub image_prompt: String,
}
