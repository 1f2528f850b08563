// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory manager: the orchestrator behind every chat turn.
//!
//! Turns are persisted as they arrive and collected in an in-memory open
//! buffer. Once the buffer reaches the auto-summarize threshold it is
//! flushed: summarized, written as a segment (plus the summary embedding
//! when a semantic index is available) and cleared. The buffer lock is held
//! for the whole of `add_message`, so a turn is never both buffered and
//! segmented, and never dropped in between.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use workly_config::model::MemoryConfig;
use workly_core::types::{now_timestamp, preview};
use workly_core::{FactCategory, Role, WorklyError};
use workly_storage::queries::facts::FactQuery;
use workly_storage::queries::{conversations, embeddings, facts, segments};
use workly_storage::{Database, Fact, NewEmbedding, NewFact, NewSegment, NewTurn, Segment};

use crate::extractor::FactExtraction;
use crate::index::{SemanticIndex, TEXT_PREVIEW_CHARS, rank};
use crate::summarizer::{ConversationSummarizer, NOT_ENOUGH_MESSAGES, format_summary_for_context};
use crate::types::{ChatMessage, ExtractedFacts, MemoryStats, SearchResult};

/// Appended to a context blob cut to its character budget.
pub const TRUNCATION_MARKER: &str = "\n[...contexte tronqué...]";

/// Reason reported when a flush is forced on an empty buffer.
pub const EMPTY_BUFFER: &str = "Aucun message dans la conversation courante";

/// Characters per token used for the context budget.
const CHARS_PER_TOKEN: usize = 4;
/// Open-buffer turns shown at the end of the context blob.
const CONTEXT_TAIL_TURNS: usize = 3;
const CONTEXT_TAIL_CHARS: usize = 100;
const DIGEST_PREFERENCES: usize = 5;
const DIGEST_ENTITIES: usize = 5;
const DIGEST_EVENTS: usize = 3;
/// Confidence stored for events, which carry none of their own.
const EVENT_CONFIDENCE: f64 = 1.0;

/// A turn that has been persisted but not yet segmented.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedTurn {
    /// Id of the persisted `conversations` row.
    pub id: i64,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

impl BufferedTurn {
    fn to_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content.clone(),
            timestamp: Some(self.timestamp.clone()),
        }
    }
}

/// Result of a flush attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentOutcome {
    /// The buffer was written as a segment and cleared.
    Created {
        segment: Segment,
        /// Id of the summary embedding, when one was stored.
        embedding_id: Option<i64>,
    },
    /// Nothing was written; the buffer is unchanged.
    Skipped { reason: String },
}

impl SegmentOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, SegmentOutcome::Created { .. })
    }
}

/// What `add_message` did with a turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddedMessage {
    /// `None` when memory is disabled.
    pub turn_id: Option<i64>,
    pub facts_stored: usize,
    /// Set when the turn triggered an automatic flush.
    pub segment: Option<SegmentOutcome>,
}

#[derive(Debug, Default)]
struct OpenBuffer {
    turns: Vec<BufferedTurn>,
    /// Sequence number of the segment currently being filled.
    segment_seq: i64,
}

/// Long-term memory for one user of the companion.
pub struct MemoryManager {
    db: Database,
    summarizer: ConversationSummarizer,
    index: Arc<dyn SemanticIndex>,
    extractor: Arc<dyn FactExtraction>,
    config: MemoryConfig,
    user_id: String,
    source: String,
    buffer: Mutex<OpenBuffer>,
}

impl MemoryManager {
    /// Build a manager over an open store.
    ///
    /// The segment sequence resumes from the number of stored segments. The
    /// summarizer's auto threshold is taken from `config`.
    pub async fn new(
        db: Database,
        summarizer: ConversationSummarizer,
        index: Arc<dyn SemanticIndex>,
        extractor: Arc<dyn FactExtraction>,
        config: MemoryConfig,
    ) -> Result<Self, WorklyError> {
        let segment_seq = segments::count_segments(&db).await?;
        let summarizer = summarizer.with_auto_threshold(config.auto_summarize_threshold);

        info!(
            location = %db.location(),
            segments = segment_seq,
            embedding_model = index.model_name(),
            semantic_search = index.is_available(),
            "memory manager ready"
        );

        Ok(Self {
            db,
            summarizer,
            index,
            extractor,
            config,
            user_id: "desktop_user".to_string(),
            source: "desktop".to_string(),
            buffer: Mutex::new(OpenBuffer {
                turns: Vec::new(),
                segment_seq,
            }),
        })
    }

    /// Set the user and source recorded on every turn.
    pub fn with_identity(mut self, user_id: impl Into<String>, source: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self.source = source.into();
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Record one turn.
    ///
    /// The turn is persisted first; a storage failure there leaves the buffer
    /// untouched and is returned. User turns then go through fact extraction,
    /// whose failures are logged and swallowed. Finally the buffer is flushed
    /// if it reached the threshold.
    pub async fn add_message(&self, role: Role, content: &str) -> Result<AddedMessage, WorklyError> {
        if !self.config.enabled {
            debug!("memory disabled, turn not recorded");
            return Ok(AddedMessage::default());
        }

        let mut buffer = self.buffer.lock().await;
        let timestamp = now_timestamp();
        let turn_id = conversations::insert_turn(
            &self.db,
            &NewTurn {
                role,
                content: content.to_string(),
                timestamp: timestamp.clone(),
                user_id: self.user_id.clone(),
                source: self.source.clone(),
                metadata: Some(json!({ "segment_seq": buffer.segment_seq })),
            },
        )
        .await?;

        buffer.turns.push(BufferedTurn {
            id: turn_id,
            role,
            content: content.to_string(),
            timestamp: timestamp.clone(),
        });
        metrics::counter!("workly_memory_turns_total", "role" => role.as_str()).increment(1);

        let facts_stored = if role == Role::User {
            self.extract_and_store(content, &timestamp, turn_id).await?
        } else {
            0
        };

        let segment = if self.summarizer.should_summarize(buffer.turns.len()) {
            Some(self.flush_locked(&mut buffer).await?)
        } else {
            None
        };

        Ok(AddedMessage {
            turn_id: Some(turn_id),
            facts_stored,
            segment,
        })
    }

    /// Flush the open buffer regardless of the threshold.
    ///
    /// An empty buffer, or one below the summarizer minimum, is skipped.
    pub async fn force_segment_creation(&self) -> Result<SegmentOutcome, WorklyError> {
        let mut buffer = self.buffer.lock().await;
        if buffer.turns.is_empty() {
            return Ok(SegmentOutcome::Skipped {
                reason: EMPTY_BUFFER.to_string(),
            });
        }
        self.flush_locked(&mut buffer).await
    }

    async fn extract_and_store(
        &self,
        content: &str,
        timestamp: &str,
        turn_id: i64,
    ) -> Result<usize, WorklyError> {
        let rows = match self
            .extractor
            .extract_facts(content, timestamp)
            .and_then(|extracted| fact_rows(&extracted, timestamp, turn_id))
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, turn_id, "fact extraction failed, turn kept without facts");
                return Ok(0);
            }
        };

        let mut stored = 0;
        for row in rows {
            let result = match row.category {
                FactCategory::Entities => facts::record_entity(&self.db, &row).await.map(|_| ()),
                _ => facts::insert_fact(&self.db, &row).await.map(|_| ()),
            };
            match result {
                Ok(()) => {
                    stored += 1;
                    metrics::counter!("workly_memory_facts_total", "category" => row.category.as_str())
                        .increment(1);
                }
                Err(e) if e.is_storage() => return Err(e),
                Err(e) => warn!(error = %e, category = %row.category, "fact rejected, skipping"),
            }
        }

        if stored > 0 {
            debug!(turn_id, facts = stored, "facts stored");
        }
        Ok(stored)
    }

    async fn flush_locked(&self, buffer: &mut OpenBuffer) -> Result<SegmentOutcome, WorklyError> {
        let count = buffer.turns.len();
        let (Some(first), Some(last)) = (buffer.turns.first(), buffer.turns.last()) else {
            return Ok(SegmentOutcome::Skipped {
                reason: EMPTY_BUFFER.to_string(),
            });
        };
        if count < self.summarizer.min_messages() {
            debug!(count, min = self.summarizer.min_messages(), "buffer too short to segment");
            return Ok(SegmentOutcome::Skipped {
                reason: NOT_ENOUGH_MESSAGES.to_string(),
            });
        }

        let messages: Vec<ChatMessage> = buffer.turns.iter().map(BufferedTurn::to_message).collect();
        let result = self.summarizer.summarize(&messages, true).await;
        if let Some(reason) = result.error {
            return Ok(SegmentOutcome::Skipped { reason });
        }
        let keypoints = result.keypoints.unwrap_or_default();

        let new_segment = NewSegment {
            summary: result.summary,
            message_count: count as i64,
            start_timestamp: first.timestamp.clone(),
            end_timestamp: last.timestamp.clone(),
            topics: keypoints.clone(),
            metadata: Some(json!({
                "segment_seq": buffer.segment_seq,
                "summarized_at": result.timestamp,
                "keypoints": keypoints,
                "messages": buffer
                    .turns
                    .iter()
                    .map(|t| json!({
                        "id": t.id,
                        "role": t.role.as_str(),
                        "content": t.content,
                        "timestamp": t.timestamp,
                    }))
                    .collect::<Vec<Value>>(),
            })),
        };

        let (id, embedding_id) = self.persist_segment(&new_segment).await?;

        buffer.turns.clear();
        buffer.segment_seq += 1;
        metrics::counter!("workly_memory_segments_total").increment(1);
        info!(
            segment_id = id,
            messages = count,
            embedded = embedding_id.is_some(),
            "segment created"
        );

        Ok(SegmentOutcome::Created {
            segment: Segment {
                id,
                summary: new_segment.summary,
                message_count: new_segment.message_count,
                start_timestamp: new_segment.start_timestamp,
                end_timestamp: new_segment.end_timestamp,
                topics: new_segment.topics,
                metadata: new_segment.metadata,
            },
            embedding_id,
        })
    }

    /// Write the segment, with its summary embedding when one can be made.
    async fn persist_segment(&self, segment: &NewSegment) -> Result<(i64, Option<i64>), WorklyError> {
        if self.index.is_available() {
            match self.index.encode(&segment.summary).await {
                Ok(vector) => {
                    let embedding = NewEmbedding {
                        conversation_id: None,
                        segment_id: None,
                        vector,
                        text: segment.summary.clone(),
                        timestamp: segment.end_timestamp.clone(),
                    };
                    match segments::insert_segment_with_embedding(&self.db, segment, &embedding).await {
                        Ok((segment_id, embedding_id)) => return Ok((segment_id, Some(embedding_id))),
                        Err(e) if e.is_validation() => {
                            warn!(error = %e, "summary embedding rejected, storing segment alone");
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(e) => warn!(error = %e, "summary embedding failed, storing segment alone"),
            }
        }
        let segment_id = segments::insert_segment(&self.db, segment).await?;
        Ok((segment_id, None))
    }

    /// Rank stored summaries against `query`.
    ///
    /// Without a usable index, or with no stored embeddings, the `top_k`
    /// most recent segments are returned with similarity 1.0.
    pub async fn search_relevant_context(
        &self,
        query: &str,
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<SearchResult>, WorklyError> {
        if self.index.is_available() {
            let stored = embeddings::query_all_embeddings(&self.db, None).await?;
            if !stored.is_empty() {
                match self.index.encode(query).await {
                    Ok(vector) => return Ok(rank(&vector, &stored, top_k, min_similarity)),
                    Err(e) => warn!(error = %e, "query embedding failed, using recent segments"),
                }
            }
        }
        self.recent_segments(top_k).await
    }

    async fn recent_segments(&self, top_k: usize) -> Result<Vec<SearchResult>, WorklyError> {
        metrics::counter!("workly_memory_search_fallback_total").increment(1);
        let recent = segments::query_segments(&self.db, Some(top_k as i64)).await?;
        Ok(recent
            .into_iter()
            .map(|segment| SearchResult {
                id: segment.id,
                segment_id: Some(segment.id),
                similarity: 1.0,
                text_preview: preview(&segment.summary, TEXT_PREVIEW_CHARS),
                timestamp: segment.end_timestamp,
            })
            .collect())
    }

    /// Assemble the context blob injected into the LLM prompt.
    ///
    /// Sections, in order: relevant prior segments, a facts digest, and the
    /// tail of the open buffer. The result never exceeds
    /// `max_tokens * 4` characters plus [`TRUNCATION_MARKER`].
    pub async fn get_context_for_prompt(
        &self,
        query: &str,
        include_facts: bool,
        include_segments: bool,
        max_tokens: usize,
    ) -> Result<String, WorklyError> {
        let mut parts: Vec<String> = Vec::new();

        if include_segments {
            let hits = self
                .search_relevant_context(query, self.config.context_segments, self.config.min_similarity)
                .await?;
            let mut rendered = Vec::new();
            for hit in hits {
                let Some(segment_id) = hit.segment_id else {
                    continue;
                };
                if let Some(segment) = segments::get_segment(&self.db, segment_id).await? {
                    let text = format_summary_for_context(
                        &segment.summary,
                        segment.message_count.max(0) as usize,
                        &segment.topics,
                    );
                    if !text.is_empty() {
                        rendered.push(text);
                    }
                }
            }
            if !rendered.is_empty() {
                parts.push("=== Conversations Précédentes ===".to_string());
                parts.extend(rendered);
            }
        }

        if include_facts {
            let digest = self.facts_digest().await?;
            if !digest.is_empty() {
                parts.push("\n=== Faits Mémorisés ===".to_string());
                parts.push(digest);
            }
        }

        let tail = {
            let buffer = self.buffer.lock().await;
            let skip = buffer.turns.len().saturating_sub(CONTEXT_TAIL_TURNS);
            buffer.turns[skip..].to_vec()
        };
        if !tail.is_empty() {
            parts.push("\n=== Conversation Actuelle ===".to_string());
            for turn in &tail {
                parts.push(format!(
                    "{}: {}",
                    role_label(turn.role),
                    preview(&turn.content, CONTEXT_TAIL_CHARS)
                ));
            }
        }

        Ok(truncate_context(
            parts.join("\n\n"),
            max_tokens.saturating_mul(CHARS_PER_TOKEN),
        ))
    }

    async fn facts_digest(&self) -> Result<String, WorklyError> {
        let mut lines: Vec<String> = Vec::new();

        let preferences = self.recent_preferences(DIGEST_PREFERENCES).await?;
        if !preferences.is_empty() {
            lines.push("Préférences :".to_string());
            for fact in &preferences {
                let verb = if data_str(fact, "sentiment") == "positive" {
                    "aime"
                } else {
                    "n'aime pas"
                };
                lines.push(format!(
                    "  - {verb} {} ({})",
                    data_str(fact, "subject"),
                    data_str(fact, "category")
                ));
            }
        }

        let entities = self.top_entities(DIGEST_ENTITIES).await?;
        if !entities.is_empty() {
            lines.push("\nEntités mentionnées :".to_string());
            for fact in &entities {
                lines.push(format!(
                    "  - {} ({}, {}x)",
                    data_str(fact, "value"),
                    fact.fact_type,
                    occurrences(fact)
                ));
            }
        }

        let events = self.recent_events(DIGEST_EVENTS).await?;
        if !events.is_empty() {
            lines.push("\nÉvénements récents :".to_string());
            for fact in &events {
                lines.push(format!("  - {}", data_str(fact, "description")));
            }
        }

        Ok(lines.join("\n"))
    }

    /// Snapshot of the open buffer, oldest turn first.
    pub async fn current_buffer(&self) -> Vec<BufferedTurn> {
        self.buffer.lock().await.turns.clone()
    }

    /// The `n` most recent preferences, oldest first.
    pub async fn recent_preferences(&self, n: usize) -> Result<Vec<Fact>, WorklyError> {
        self.recent_facts(FactCategory::Preferences, n).await
    }

    /// The `n` most recent events, oldest first.
    pub async fn recent_events(&self, n: usize) -> Result<Vec<Fact>, WorklyError> {
        self.recent_facts(FactCategory::Events, n).await
    }

    async fn recent_facts(&self, category: FactCategory, n: usize) -> Result<Vec<Fact>, WorklyError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        facts::query_facts(
            &self.db,
            &FactQuery {
                category: Some(category),
                limit: Some(n as i64),
                ..FactQuery::default()
            },
        )
        .await
    }

    /// The `n` most mentioned entities. Ties keep the earliest first.
    pub async fn top_entities(&self, n: usize) -> Result<Vec<Fact>, WorklyError> {
        let mut entities = facts::query_facts(
            &self.db,
            &FactQuery {
                category: Some(FactCategory::Entities),
                ..FactQuery::default()
            },
        )
        .await?;
        entities.sort_by_key(|fact| std::cmp::Reverse(occurrences(fact)));
        entities.truncate(n);
        Ok(entities)
    }

    pub async fn get_stats(&self) -> Result<MemoryStats, WorklyError> {
        let open_buffer_length = self.buffer.lock().await.turns.len();
        let counts = facts::fact_counts(&self.db).await?;
        let count = |category: FactCategory| counts.get(&category).copied().unwrap_or(0);

        Ok(MemoryStats {
            segment_count: segments::count_segments(&self.db).await?,
            open_buffer_length,
            entity_count: count(FactCategory::Entities),
            preference_count: count(FactCategory::Preferences),
            event_count: count(FactCategory::Events),
            relationship_count: count(FactCategory::Relationships),
            embedding_count: embeddings::count_embeddings(&self.db).await?,
            turn_count: conversations::count_turns(&self.db).await?,
            storage_location: self.db.location(),
            embedding_model: self.index.model_name().to_string(),
            embedding_available: self.index.is_available(),
        })
    }

    /// Forget everything: facts, segments, embeddings, turns and the buffer.
    pub async fn clear_all(&self) -> Result<(), WorklyError> {
        let mut buffer = self.buffer.lock().await;
        let fact_rows = facts::delete_all_facts(&self.db).await?;
        let embedding_rows = embeddings::delete_all_embeddings(&self.db).await?;
        let segment_rows = segments::delete_all_segments(&self.db).await?;
        let turn_rows = conversations::delete_all_turns(&self.db).await?;
        buffer.turns.clear();
        buffer.segment_seq = 0;
        info!(
            facts = fact_rows,
            segments = segment_rows,
            embeddings = embedding_rows,
            turns = turn_rows,
            "memory cleared"
        );
        Ok(())
    }

    /// Delete persisted turns older than `timestamp`. Buffered turns are kept.
    pub async fn prune_turns_before(&self, timestamp: &str) -> Result<usize, WorklyError> {
        let removed = conversations::delete_turns_before(&self.db, timestamp).await?;
        if removed > 0 {
            info!(removed, before = timestamp, "old turns pruned");
        }
        Ok(removed)
    }
}

/// Storage rows for everything extracted from one turn.
fn fact_rows(
    extracted: &ExtractedFacts,
    timestamp: &str,
    turn_id: i64,
) -> Result<Vec<NewFact>, WorklyError> {
    let row = |category: FactCategory, fact_type: &str, data: Value, confidence: f64| NewFact {
        category,
        fact_type: fact_type.to_string(),
        data,
        confidence,
        timestamp: timestamp.to_string(),
        source_message_id: Some(turn_id),
    };

    let mut rows = Vec::with_capacity(extracted.len());
    for entity in &extracted.entities {
        rows.push(row(
            FactCategory::Entities,
            entity.entity_type.as_str(),
            to_json(entity)?,
            entity.confidence,
        ));
    }
    for preference in &extracted.preferences {
        rows.push(row(
            FactCategory::Preferences,
            &preference.category,
            to_json(preference)?,
            preference.intensity,
        ));
    }
    for event in &extracted.events {
        rows.push(row(
            FactCategory::Events,
            event.event_type.as_str(),
            to_json(event)?,
            EVENT_CONFIDENCE,
        ));
    }
    for relationship in &extracted.relationships {
        rows.push(row(
            FactCategory::Relationships,
            &relationship.relation_type,
            to_json(relationship)?,
            relationship.confidence,
        ));
    }
    Ok(rows)
}

fn to_json(value: &impl serde::Serialize) -> Result<Value, WorklyError> {
    serde_json::to_value(value).map_err(|e| WorklyError::Internal(format!("serializing fact: {e}")))
}

fn data_str<'a>(fact: &'a Fact, key: &str) -> &'a str {
    fact.data.get(key).and_then(Value::as_str).unwrap_or("")
}

fn occurrences(fact: &Fact) -> i64 {
    fact.data.get("occurrences").and_then(Value::as_i64).unwrap_or(1)
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "User",
        Role::Assistant => "Assistant",
        Role::System => "System",
    }
}

/// Cut `text` to `max_chars` characters, marking the cut.
fn truncate_context(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
        None => text,
    }
}
