// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types shared by the extractor, summarizer and manager.

use serde::{Deserialize, Serialize};
use workly_core::{FactCategory, Role};

/// Kind of named entity recognised by the fact extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Person,
    Location,
    Organization,
    Date,
}

impl EntityType {
    /// Convert to the string stored in the `facts.type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "person",
            EntityType::Location => "location",
            EntityType::Organization => "organization",
            EntityType::Date => "date",
        }
    }
}

/// A named person, place, organisation or date mentioned by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: EntityType,
    pub value: String,
    /// The message the entity was found in.
    pub context: String,
    /// Heuristic confidence in 0.0..=1.0.
    pub confidence: f64,
    pub first_seen: String,
    pub occurrences: u32,
}

/// Polarity of a preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// Something the user likes or dislikes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    /// One of `food`, `hobby`, `music`, `work`, `color`.
    pub category: String,
    /// The category keyword that matched.
    pub subject: String,
    pub sentiment: Sentiment,
    /// Strength in 0.0..=1.0.
    pub intensity: f64,
    pub context: String,
    pub timestamp: String,
}

/// Tense/aspect class of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PastAction,
    CurrentProject,
    FutureGoal,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PastAction => "past_action",
            EventType::CurrentProject => "current_project",
            EventType::FutureGoal => "future_goal",
        }
    }

    /// Status implied by the event type.
    pub fn status(&self) -> EventStatus {
        match self {
            EventType::PastAction => EventStatus::Completed,
            EventType::CurrentProject => EventStatus::Ongoing,
            EventType::FutureGoal => EventStatus::Planned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Completed,
    Ongoing,
    Planned,
}

/// Something the user did, is doing or plans to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    /// First 100 characters of the message.
    pub description: String,
    pub participants: Vec<String>,
    pub location: Option<String>,
    pub time_reference: Option<String>,
    pub status: EventStatus,
    pub context: String,
    pub timestamp: String,
}

/// A `subject -relation-> object` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub subject: String,
    /// One of `family`, `friend`, `colleague`, `owns`, `works_at`.
    pub relation_type: String,
    pub object: String,
    pub context: String,
    pub confidence: f64,
    pub timestamp: String,
}

/// Everything extracted from one message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFacts {
    pub entities: Vec<Entity>,
    pub preferences: Vec<Preference>,
    pub events: Vec<Event>,
    pub relationships: Vec<Relationship>,
}

impl ExtractedFacts {
    /// Total number of facts across all categories.
    pub fn len(&self) -> usize {
        self.entities.len() + self.preferences.len() + self.events.len() + self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of facts in one category.
    pub fn count(&self, category: FactCategory) -> usize {
        match category {
            FactCategory::Entities => self.entities.len(),
            FactCategory::Preferences => self.preferences.len(),
            FactCategory::Events => self.events.len(),
            FactCategory::Relationships => self.relationships.len(),
        }
    }
}

/// A message handed to the summarizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
        }
    }
}

/// Output of the conversation summarizer.
///
/// When `error` is set the summary is empty and no segment should be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
    pub message_count: usize,
    pub timestamp: String,
    /// Timestamp of the first summarized message, if it carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keypoints: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set by batch summarization for conversations that were too short.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

impl SummaryResult {
    /// A result carrying only an error marker.
    pub fn failed(message_count: usize, timestamp: String, error: impl Into<String>) -> Self {
        Self {
            summary: String::new(),
            message_count,
            timestamp,
            start_timestamp: None,
            end_timestamp: None,
            keypoints: None,
            error: Some(error.into()),
            skipped: false,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A ranked hit from semantic search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Row id of the hit's source: the embedding for semantic hits, the
    /// segment for recency fallback hits. Use `segment_id` to resolve a hit.
    pub id: i64,
    /// Segment the hit belongs to, on both search paths.
    pub segment_id: Option<i64>,
    pub similarity: f32,
    pub text_preview: String,
    pub timestamp: String,
}

/// Snapshot of the memory core.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryStats {
    pub segment_count: i64,
    pub open_buffer_length: usize,
    pub entity_count: i64,
    pub preference_count: i64,
    pub event_count: i64,
    pub relationship_count: i64,
    pub embedding_count: i64,
    pub turn_count: i64,
    pub storage_location: String,
    pub embedding_model: String,
    pub embedding_available: bool,
}

/// Cosine similarity of two vectors, clamped to [-1, 1].
///
/// Returns 0.0 when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    let sim = dot / (norm_a * norm_b);
    if sim.is_nan() { 0.0 } else { sim.clamp(-1.0, 1.0) }
}
