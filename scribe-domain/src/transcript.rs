//! Serde model of the `TranscriptEvent` JSON payload.
//!
//! The service uses PascalCase field names throughout. Unknown fields are
//! ignored so additions on the service side do not break decoding.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TranscriptEvent
// ---------------------------------------------------------------------------

/// Payload of an inbound `event` frame with `:event-type = TranscriptEvent`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranscriptEvent {
    // ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Transcript>,
}

impl TranscriptEvent {
    // ---
    /// Iterate the results, flattening the optional layers.
    pub fn results(&self) -> impl Iterator<Item = &TranscriptResult> {
        self.transcript.iter().flat_map(|t| t.results.iter())
    }
}

// ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transcript {
    // ---
    #[serde(default)]
    pub results: Vec<TranscriptResult>,
}

// ---------------------------------------------------------------------------
// TranscriptResult
// ---------------------------------------------------------------------------

/// One utterance segment. Partial results for a segment share a
/// `result_id` and are re-sent, refined, until `is_partial` flips false.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranscriptResult {
    // ---
    #[serde(default)]
    pub result_id: String,

    /// Segment start offset in seconds of audio.
    #[serde(default)]
    pub start_time: f64,

    #[serde(default)]
    pub end_time: f64,

    #[serde(default)]
    pub is_partial: bool,

    /// Channel label (`"ch_0"`, `"ch_1"`) when channel identification is on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,

    /// Dominant language, present in language-identification modes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub language_identification: Vec<LanguageWithScore>,

    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

impl TranscriptResult {
    // ---
    /// Text of the best alternative, when any.
    pub fn best_transcript(&self) -> Option<&str> {
        self.alternatives.first().map(|a| a.transcript.as_str())
    }
}

// ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LanguageWithScore {
    // ---
    #[serde(default)]
    pub language_code: String,

    #[serde(default)]
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Alternative
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Alternative {
    // ---
    #[serde(default)]
    pub transcript: String,

    #[serde(default)]
    pub items: Vec<Item>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A single word or punctuation mark with timing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Item {
    // ---
    /// `"pronunciation"` for words, `"punctuation"` otherwise.
    #[serde(rename = "Type", default)]
    pub item_type: String,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Speaker label when diarization is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,

    /// Whether this item will no longer change, under partial-results
    /// stabilization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable: Option<bool>,

    #[serde(default)]
    pub start_time: f64,

    #[serde(default)]
    pub end_time: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary_filter_match: Option<bool>,
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A PII entity located by content identification / redaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Entity {
    // ---
    #[serde(default)]
    pub category: String,

    #[serde(rename = "Type", default)]
    pub entity_type: String,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    #[serde(default)]
    pub start_time: f64,

    #[serde(default)]
    pub end_time: f64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
