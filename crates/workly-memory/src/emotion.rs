// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Emotional history of a user and the assistant.
//!
//! Entries live in the `emotion_history` table. Analysis only ever looks at
//! the most recent `max_entries` rows for the user, so old history fades out
//! without being deleted.

use std::collections::HashMap;

use chrono::{SecondsFormat, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, info};
use workly_config::model::EmotionConfig;
use workly_core::types::{now_timestamp, preview};
use workly_core::{EmotionSource, WorklyError};
use workly_storage::queries::emotions::{self, EmotionQuery};
use workly_storage::{Database, EmotionEntry, NewEmotion};

const MESSAGE_PREVIEW_CHARS: usize = 100;
/// Trend score difference that counts as a change of mood.
const TREND_DELTA: f64 = 0.2;
/// Entries considered by [`EmotionMemory::context_for_prompt`].
const CONTEXT_RECENT: usize = 10;
const CONTEXT_MIN_ENTRIES: usize = 3;

/// Valence of each known emotion; unknown emotions count as neutral.
const VALENCE: &[(&str, f64)] = &[
    ("joy", 1.0),
    ("fun", 0.8),
    ("surprised", 0.3),
    ("neutral", 0.0),
    ("sorrow", -0.8),
    ("angry", -1.0),
];

const FRENCH_NAMES: &[(&str, &str)] = &[
    ("joy", "joyeux"),
    ("angry", "irrité"),
    ("sorrow", "triste"),
    ("surprised", "surpris"),
    ("fun", "amusé"),
    ("neutral", "neutre"),
];

fn valence(emotion: &str) -> f64 {
    VALENCE
        .iter()
        .find(|(name, _)| *name == emotion)
        .map_or(0.0, |(_, score)| *score)
}

fn french_name(emotion: &str) -> &str {
    FRENCH_NAMES
        .iter()
        .find(|(name, _)| *name == emotion)
        .map_or(emotion, |(_, french)| french)
}

/// Direction of the recent mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    /// Not enough history to tell.
    Unknown,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
            Trend::Unknown => "unknown",
        }
    }
}

/// Shapes looked for by [`EmotionMemory::has_pattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// The last `threshold` entries share one emotion.
    Consecutive,
    /// One emotion dominates the last day.
    Dominant,
}

/// Summary figures over the analysis window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionStatistics {
    pub total_entries: usize,
    pub user_entries: usize,
    pub assistant_entries: usize,
    pub distribution_all: HashMap<String, usize>,
    pub distribution_user: HashMap<String, usize>,
    pub distribution_assistant: HashMap<String, usize>,
    pub average_intensity_user: f64,
    pub average_intensity_assistant: f64,
    pub dominant_emotion_user: Option<String>,
    pub dominant_emotion_assistant: Option<String>,
    pub emotional_trend: Trend,
    pub oldest_entry: Option<String>,
    pub newest_entry: Option<String>,
}

/// Emotion history for one user.
pub struct EmotionMemory {
    db: Database,
    user_id: String,
    config: EmotionConfig,
}

impl EmotionMemory {
    pub fn new(db: Database, user_id: impl Into<String>, config: EmotionConfig) -> Self {
        Self {
            db,
            user_id: user_id.into(),
            config,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Store a detected emotion. `intensity` and `confidence` are 0 to 100.
    pub async fn record(
        &self,
        emotion: &str,
        intensity: f64,
        confidence: f64,
        source: EmotionSource,
        message: &str,
        context: Option<&serde_json::Value>,
    ) -> Result<i64, WorklyError> {
        for (name, value) in [("intensity", intensity), ("confidence", confidence)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(WorklyError::Validation(format!(
                    "emotion {name} must be within 0..=100, got {value}"
                )));
            }
        }

        let id = emotions::insert_emotion(
            &self.db,
            &NewEmotion {
                emotion: emotion.to_string(),
                intensity,
                confidence,
                source,
                message_preview: Some(preview(message, MESSAGE_PREVIEW_CHARS)),
                context: context.map(|c| c.to_string()),
                timestamp: now_timestamp(),
                user_id: self.user_id.clone(),
            },
        )
        .await?;
        debug!(emotion, intensity, source = %source, "emotion recorded");
        Ok(id)
    }

    /// The analysis window, oldest first.
    async fn window(&self) -> Result<Vec<EmotionEntry>, WorklyError> {
        emotions::query_emotions(
            &self.db,
            &EmotionQuery {
                user_id: Some(self.user_id.clone()),
                limit: Some(self.config.max_entries as i64),
                ..EmotionQuery::default()
            },
        )
        .await
    }

    /// Window entries matching `source` and newer than `since` ago.
    async fn filtered(
        &self,
        source: Option<EmotionSource>,
        since: Option<TimeDelta>,
    ) -> Result<Vec<EmotionEntry>, WorklyError> {
        let cutoff = since.map(|age| (Utc::now() - age).to_rfc3339_opts(SecondsFormat::Millis, true));
        Ok(self
            .window()
            .await?
            .into_iter()
            .filter(|e| source.is_none_or(|s| e.source == s))
            .filter(|e| cutoff.as_ref().is_none_or(|c| e.timestamp.as_str() >= c.as_str()))
            .collect())
    }

    /// The `count` latest entries, newest first.
    pub async fn recent(
        &self,
        count: usize,
        source: Option<EmotionSource>,
    ) -> Result<Vec<EmotionEntry>, WorklyError> {
        let mut entries = self.filtered(source, None).await?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    /// Occurrences of each emotion.
    pub async fn distribution(
        &self,
        source: Option<EmotionSource>,
        since: Option<TimeDelta>,
    ) -> Result<HashMap<String, usize>, WorklyError> {
        Ok(count_emotions(&self.filtered(source, since).await?))
    }

    /// Most frequent emotion. Ties go to the one seen first.
    pub async fn dominant(
        &self,
        source: Option<EmotionSource>,
        since: Option<TimeDelta>,
    ) -> Result<Option<String>, WorklyError> {
        Ok(dominant_of(&self.filtered(source, since).await?))
    }

    /// Mean intensity, or 0.0 when nothing matches.
    pub async fn average_intensity(
        &self,
        emotion: Option<&str>,
        source: Option<EmotionSource>,
        since: Option<TimeDelta>,
    ) -> Result<f64, WorklyError> {
        let entries: Vec<EmotionEntry> = self
            .filtered(source, since)
            .await?
            .into_iter()
            .filter(|e| emotion.is_none_or(|name| e.emotion == name))
            .collect();
        Ok(mean_intensity(&entries))
    }

    /// Whether the history shows `pattern`.
    ///
    /// With `emotion` set, the pattern must involve that emotion; otherwise
    /// any emotion qualifies.
    pub async fn has_pattern(
        &self,
        pattern: Pattern,
        emotion: Option<&str>,
        threshold: usize,
    ) -> Result<bool, WorklyError> {
        match pattern {
            Pattern::Consecutive => {
                let recent = self.recent(threshold, None).await?;
                if recent.is_empty() || recent.len() < threshold {
                    return Ok(false);
                }
                let target = emotion.unwrap_or(recent[0].emotion.as_str());
                Ok(recent.iter().all(|e| e.emotion == target))
            }
            Pattern::Dominant => {
                let recent = self.recent(CONTEXT_RECENT, None).await?;
                if recent.is_empty() || recent.len() < threshold {
                    return Ok(false);
                }
                let last_day = self.filtered(None, Some(TimeDelta::hours(24))).await?;
                let Some(dominant) = dominant_of(&last_day) else {
                    return Ok(false);
                };
                if let Some(target) = emotion {
                    return Ok(dominant == target);
                }
                let occurrences = last_day.iter().filter(|e| e.emotion == dominant).count();
                Ok(occurrences as f64 / recent.len() as f64 > 0.5)
            }
        }
    }

    /// Compare the mood of the last `window` entries with the `window` before.
    pub async fn trend(&self, window: usize) -> Result<Trend, WorklyError> {
        let recent = self.recent(window.saturating_mul(2), None).await?;
        if window == 0 || recent.len() < window * 2 {
            return Ok(Trend::Unknown);
        }
        let (newer, older) = recent.split_at(window);
        let diff = mood_score(newer) - mood_score(older);
        Ok(if diff > TREND_DELTA {
            Trend::Improving
        } else if diff < -TREND_DELTA {
            Trend::Declining
        } else {
            Trend::Stable
        })
    }

    /// One French sentence describing the user's recent mood.
    ///
    /// Empty until at least three user entries exist.
    pub async fn context_for_prompt(&self) -> Result<String, WorklyError> {
        let recent_user = self.recent(CONTEXT_RECENT, Some(EmotionSource::User)).await?;
        if recent_user.len() < CONTEXT_MIN_ENTRIES {
            return Ok(String::new());
        }

        let last_day = Some(TimeDelta::hours(24));
        let mut parts: Vec<String> = Vec::new();

        if let Some(dominant) = self.dominant(Some(EmotionSource::User), last_day).await? {
            parts.push(format!("L'utilisateur semble globalement {}", french_name(&dominant)));
        }

        let intensity = self
            .average_intensity(None, Some(EmotionSource::User), last_day)
            .await?;
        if intensity > 70.0 {
            parts.push("avec une forte intensité émotionnelle".to_string());
        } else if intensity < 30.0 {
            parts.push("mais de manière subtile".to_string());
        }

        match self.trend(self.config.trend_window).await? {
            Trend::Improving => parts.push("Son humeur s'améliore".to_string()),
            Trend::Declining => parts.push("Son humeur décline".to_string()),
            Trend::Stable | Trend::Unknown => {}
        }

        if self.has_pattern(Pattern::Consecutive, Some("sorrow"), 3).await? {
            parts.push("Il semble traverser une période difficile".to_string());
        } else if self.has_pattern(Pattern::Consecutive, Some("joy"), 3).await? {
            parts.push("Il est dans une période très positive".to_string());
        }

        if parts.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("{}.", parts.join(". ")))
    }

    pub async fn statistics(&self) -> Result<EmotionStatistics, WorklyError> {
        let all = self.window().await?;
        let by_source = |source: EmotionSource| -> Vec<EmotionEntry> {
            all.iter().filter(|e| e.source == source).cloned().collect()
        };
        let user = by_source(EmotionSource::User);
        let assistant = by_source(EmotionSource::Assistant);

        Ok(EmotionStatistics {
            total_entries: all.len(),
            user_entries: user.len(),
            assistant_entries: assistant.len(),
            distribution_all: count_emotions(&all),
            distribution_user: count_emotions(&user),
            distribution_assistant: count_emotions(&assistant),
            average_intensity_user: mean_intensity(&user),
            average_intensity_assistant: mean_intensity(&assistant),
            dominant_emotion_user: dominant_of(&user),
            dominant_emotion_assistant: dominant_of(&assistant),
            emotional_trend: self.trend(self.config.trend_window).await?,
            oldest_entry: all.first().map(|e| e.timestamp.clone()),
            newest_entry: all.last().map(|e| e.timestamp.clone()),
        })
    }

    /// Delete this user's history.
    pub async fn clear(&self) -> Result<usize, WorklyError> {
        let removed = emotions::delete_all_emotions(&self.db, Some(&self.user_id)).await?;
        info!(user_id = %self.user_id, removed, "emotion history cleared");
        Ok(removed)
    }
}

fn count_emotions(entries: &[EmotionEntry]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for entry in entries {
        *counts.entry(entry.emotion.clone()).or_insert(0) += 1;
    }
    counts
}

fn dominant_of(entries: &[EmotionEntry]) -> Option<String> {
    let counts = count_emotions(entries);
    let mut best: Option<(&str, usize)> = None;
    for entry in entries {
        let count = counts.get(&entry.emotion).copied().unwrap_or(0);
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((entry.emotion.as_str(), count));
        }
    }
    best.map(|(emotion, _)| emotion.to_string())
}

fn mean_intensity(entries: &[EmotionEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    entries.iter().map(|e| e.intensity).sum::<f64>() / entries.len() as f64
}

/// Average valence weighted by intensity, in -1.0..=1.0.
fn mood_score(entries: &[EmotionEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    entries
        .iter()
        .map(|e| valence(&e.emotion) * (e.intensity / 100.0))
        .sum::<f64>()
        / entries.len() as f64
}
