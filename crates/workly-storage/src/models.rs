// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for every table in the store.
//!
//! `New*` structs are insert payloads; the plain structs are rows read back
//! with their database id. Enumerated columns use the typed enums from
//! `workly-core`, so an unknown role or category is rejected before a write.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use workly_core::{EmotionSource, FactCategory, Role};

/// A persisted conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: i64,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    pub user_id: String,
    pub source: String,
    pub metadata: Option<Value>,
}

/// Insert payload for [`Turn`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    pub user_id: String,
    pub source: String,
    pub metadata: Option<Value>,
}

/// A persisted fact. `data` is the extractor's JSON record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub id: i64,
    pub category: FactCategory,
    pub fact_type: String,
    pub data: Value,
    pub confidence: f64,
    pub timestamp: String,
    pub source_message_id: Option<i64>,
}

/// Insert payload for [`Fact`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewFact {
    pub category: FactCategory,
    pub fact_type: String,
    pub data: Value,
    pub confidence: f64,
    pub timestamp: String,
    pub source_message_id: Option<i64>,
}

/// Outcome of recording an entity mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRecord {
    /// Fact row holding the entity.
    pub id: i64,
    /// Total mentions after this one.
    pub occurrences: i64,
    /// Whether a new row was created.
    pub created: bool,
}

/// A summarized slice of conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: i64,
    pub summary: String,
    pub message_count: i64,
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub topics: Vec<String>,
    pub metadata: Option<Value>,
}

/// Insert payload for [`Segment`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewSegment {
    pub summary: String,
    pub message_count: i64,
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub topics: Vec<String>,
    pub metadata: Option<Value>,
}

/// A stored embedding with its vector materialized.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEmbedding {
    pub id: i64,
    pub conversation_id: Option<i64>,
    pub segment_id: Option<i64>,
    pub vector: Vec<f32>,
    pub text: String,
    pub timestamp: String,
}

/// Insert payload for [`StoredEmbedding`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmbedding {
    pub conversation_id: Option<i64>,
    pub segment_id: Option<i64>,
    pub vector: Vec<f32>,
    pub text: String,
    pub timestamp: String,
}

/// One detected emotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionEntry {
    pub id: i64,
    pub emotion: String,
    /// 0 to 100.
    pub intensity: f64,
    /// 0 to 100.
    pub confidence: f64,
    pub source: EmotionSource,
    pub message_preview: Option<String>,
    pub context: Option<String>,
    pub timestamp: String,
    pub user_id: String,
}

/// Insert payload for [`EmotionEntry`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmotion {
    pub emotion: String,
    pub intensity: f64,
    pub confidence: f64,
    pub source: EmotionSource,
    pub message_preview: Option<String>,
    pub context: Option<String>,
    pub timestamp: String,
    pub user_id: String,
}

/// Current value of one personality trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityTrait {
    pub trait_name: String,
    pub score: f64,
    pub description: Option<String>,
    pub last_updated: String,
}

/// One logged transition of a trait score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitEvolution {
    pub id: i64,
    pub trait_name: String,
    pub old_score: f64,
    pub new_score: f64,
    pub reason: Option<String>,
    pub timestamp: String,
}

/// Encode an f32 vector as a little-endian BLOB.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a little-endian BLOB into an f32 vector.
///
/// Trailing bytes that do not form a whole `f32` are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Parse an optional JSON column, keeping non-JSON legacy text as a string.
pub(crate) fn parse_json_column(raw: Option<String>) -> Option<Value> {
    raw.map(|text| serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// Parse a typed enum column inside a row mapper.
pub(crate) fn parse_enum_column<T>(
    idx: usize,
    raw: String,
    parse: impl FnOnce(&str) -> Result<T, workly_core::WorklyError>,
) -> Result<T, rusqlite::Error> {
    parse(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_blob_is_little_endian() {
        let blob = vec_to_blob(&[1.0, -0.5]);
        assert_eq!(blob.len(), 8);
        assert_eq!(&blob[..4], &1.0_f32.to_le_bytes());
        assert_eq!(blob_to_vec(&blob), vec![1.0, -0.5]);
    }

    #[test]
    fn truncated_blob_drops_partial_float() {
        let mut blob = vec_to_blob(&[0.25; 3]);
        blob.pop();
        assert_eq!(blob_to_vec(&blob).len(), 2);
    }

    #[test]
    fn legacy_text_metadata_is_kept() {
        assert_eq!(
            parse_json_column(Some(r#"{"segment_seq":2}"#.into())),
            Some(serde_json::json!({"segment_seq": 2}))
        );
        assert_eq!(
            parse_json_column(Some("desktop note".into())),
            Some(Value::String("desktop note".into()))
        );
        assert_eq!(parse_json_column(None), None);
    }
}
