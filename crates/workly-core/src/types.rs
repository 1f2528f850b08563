// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the store, the memory subsystems, and adapters.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::WorklyError;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Embedding,
    Generator,
}

/// Author of a conversation turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Parse a stored or caller-supplied role, rejecting unknown values.
    pub fn parse(s: &str) -> Result<Self, WorklyError> {
        s.parse()
            .map_err(|_| WorklyError::Validation(format!("unknown role `{s}`")))
    }
}

/// Category of an extracted fact, as stored in the `facts.category` column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FactCategory {
    Entities,
    Preferences,
    Events,
    Relationships,
}

impl FactCategory {
    pub const ALL: [FactCategory; 4] = [
        FactCategory::Entities,
        FactCategory::Preferences,
        FactCategory::Events,
        FactCategory::Relationships,
    ];

    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            FactCategory::Entities => "entities",
            FactCategory::Preferences => "preferences",
            FactCategory::Events => "events",
            FactCategory::Relationships => "relationships",
        }
    }

    /// Parse a category name, rejecting unknown values.
    pub fn parse(s: &str) -> Result<Self, WorklyError> {
        s.parse()
            .map_err(|_| WorklyError::Validation(format!("unknown fact category `{s}`")))
    }
}

/// Who expressed an emotion.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EmotionSource {
    User,
    Assistant,
}

impl EmotionSource {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionSource::User => "user",
            EmotionSource::Assistant => "assistant",
        }
    }

    /// Parse an emotion source, rejecting unknown values.
    pub fn parse(s: &str) -> Result<Self, WorklyError> {
        s.parse()
            .map_err(|_| WorklyError::Validation(format!("unknown emotion source `{s}`")))
    }
}

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

/// Current UTC time as an ISO 8601 string with millisecond precision.
///
/// All stored timestamps use this format so lexical order matches time order.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Truncate `text` to at most `max_chars` characters, appending `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
