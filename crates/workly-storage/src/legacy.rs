// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-time import of the legacy JSON memory files.
//!
//! Older releases kept one JSON document per table under `data/memory/`.
//! [`JsonMigrator`] copies every file it finds into a backup directory, then
//! reads them and writes the records through the regular query modules.
//! A bad record is counted and reported; it never stops the run.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};
use workly_core::types::now_timestamp;
use workly_core::{EmotionSource, FactCategory, Role, WorklyError};

use crate::database::Database;
use crate::models::{NewEmbedding, NewEmotion, NewFact, NewSegment, NewTurn, PersonalityTrait};
use crate::queries;

/// Legacy file names, in migration order.
pub const LEGACY_FILES: [&str; 6] = [
    "conversations.json",
    "embeddings.json",
    "facts.json",
    "segments.json",
    "emotion_history.json",
    "personality.json",
];

/// Default backup directory name inside the legacy directory.
pub const BACKUP_DIR_NAME: &str = "json_backup";

/// Counts of migrated records plus everything that went wrong.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationReport {
    pub conversations: usize,
    pub embeddings: usize,
    pub facts: usize,
    pub segments: usize,
    pub emotions: usize,
    pub personality_traits: usize,
    /// Files copied into the backup directory.
    pub backed_up: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl MigrationReport {
    /// Total number of migrated records.
    pub fn total(&self) -> usize {
        self.conversations
            + self.embeddings
            + self.facts
            + self.segments
            + self.emotions
            + self.personality_traits
    }
}

/// Batch importer for the legacy JSON layout.
pub struct JsonMigrator {
    json_dir: PathBuf,
    backup_dir: PathBuf,
}

impl JsonMigrator {
    /// Migrator reading from `json_dir`, backing up to `json_dir/json_backup`.
    pub fn new(json_dir: impl Into<PathBuf>) -> Self {
        let json_dir = json_dir.into();
        let backup_dir = json_dir.join(BACKUP_DIR_NAME);
        Self {
            json_dir,
            backup_dir,
        }
    }

    /// Override the backup directory.
    pub fn with_backup_dir(mut self, backup_dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = backup_dir.into();
        self
    }

    pub fn json_dir(&self) -> &Path {
        &self.json_dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Back up, migrate every table, then vacuum.
    ///
    /// Only a failed backup or a failed vacuum aborts; record-level problems
    /// end up in [`MigrationReport::errors`].
    pub async fn run(&self, db: &Database) -> Result<MigrationReport, WorklyError> {
        let mut report = MigrationReport {
            backed_up: self.backup().await?,
            ..MigrationReport::default()
        };

        if let Some(data) = self.load("conversations.json", &mut report).await {
            self.migrate_conversations(db, data, &mut report).await;
        }
        if let Some(data) = self.load("embeddings.json", &mut report).await {
            self.migrate_embeddings(db, data, &mut report).await;
        }
        if let Some(data) = self.load("facts.json", &mut report).await {
            self.migrate_facts(db, data, &mut report).await;
        }
        if let Some(data) = self.load("segments.json", &mut report).await {
            self.migrate_segments(db, data, &mut report).await;
        }
        if let Some(data) = self.load("emotion_history.json", &mut report).await {
            self.migrate_emotions(db, data, &mut report).await;
        }
        if let Some(data) = self.load("personality.json", &mut report).await {
            self.migrate_personality(db, data, &mut report).await;
        }

        db.vacuum().await?;
        info!(
            total = report.total(),
            errors = report.errors.len(),
            "legacy migration complete"
        );
        Ok(report)
    }

    /// Copy every legacy file that exists into the backup directory.
    pub async fn backup(&self) -> Result<Vec<PathBuf>, WorklyError> {
        tokio::fs::create_dir_all(&self.backup_dir)
            .await
            .map_err(io_err)?;
        let mut copied = Vec::new();
        for name in LEGACY_FILES {
            let source = self.json_dir.join(name);
            if !tokio::fs::try_exists(&source).await.map_err(io_err)? {
                continue;
            }
            let target = self.backup_dir.join(name);
            tokio::fs::copy(&source, &target).await.map_err(io_err)?;
            info!(file = name, backup = %target.display(), "legacy file backed up");
            copied.push(target);
        }
        Ok(copied)
    }

    async fn load(&self, name: &str, report: &mut MigrationReport) -> Option<Value> {
        let path = self.json_dir.join(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(file = name, "legacy file not found, skipping");
                return None;
            }
            Err(e) => {
                report.errors.push(format!("read error: {}: {e}", path.display()));
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                report
                    .errors
                    .push(format!("JSON decode error: {}: {e}", path.display()));
                None
            }
        }
    }

    async fn migrate_conversations(&self, db: &Database, data: Value, report: &mut MigrationReport) {
        for record in entries(data) {
            let result: Result<i64, WorklyError> = async {
                let turn = NewTurn {
                    role: Role::parse(str_field(&record, "role").unwrap_or("user"))?,
                    content: str_field(&record, "content").unwrap_or_default().to_string(),
                    timestamp: timestamp_field(&record, "timestamp"),
                    user_id: str_field(&record, "user_id").unwrap_or("desktop_user").to_string(),
                    source: str_field(&record, "source").unwrap_or("desktop").to_string(),
                    metadata: record.get("metadata").filter(|m| !m.is_null()).cloned(),
                };
                queries::conversations::insert_turn(db, &turn).await
            }
            .await;
            tally(result, &mut report.conversations, &mut report.errors, "conversation");
        }
    }

    async fn migrate_embeddings(&self, db: &Database, data: Value, report: &mut MigrationReport) {
        let vectors = array_field(&data, "embeddings");
        let texts = array_field(&data, "texts");
        let timestamps = array_field(&data, "timestamps");

        for (i, (vector, text)) in vectors.iter().zip(texts.iter()).enumerate() {
            let result: Result<i64, WorklyError> = async {
                let vector = vector
                    .as_array()
                    .ok_or_else(|| WorklyError::Validation(format!("embedding {i} is not a list")))?
                    .iter()
                    .map(|v| {
                        v.as_f64().map(|f| f as f32).ok_or_else(|| {
                            WorklyError::Validation(format!("embedding {i} has a non-numeric value"))
                        })
                    })
                    .collect::<Result<Vec<f32>, _>>()?;
                let embedding = NewEmbedding {
                    conversation_id: None,
                    segment_id: None,
                    vector,
                    text: text.as_str().unwrap_or_default().to_string(),
                    timestamp: timestamps
                        .get(i)
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(now_timestamp),
                };
                queries::embeddings::insert_embedding(db, &embedding).await
            }
            .await;
            tally(result, &mut report.embeddings, &mut report.errors, "embedding");
        }
    }

    async fn migrate_facts(&self, db: &Database, data: Value, report: &mut MigrationReport) {
        for category in FactCategory::ALL {
            let records = data
                .get(category.as_str())
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            for record in records {
                let fact = legacy_fact(category, &record);
                let result = queries::facts::insert_fact(db, &fact).await;
                tally(result, &mut report.facts, &mut report.errors, "fact");
            }
        }
    }

    async fn migrate_segments(&self, db: &Database, data: Value, report: &mut MigrationReport) {
        for record in entries(data) {
            let now = now_timestamp();
            let segment = NewSegment {
                summary: str_field(&record, "summary").unwrap_or_default().to_string(),
                message_count: record
                    .get("message_count")
                    .and_then(Value::as_i64)
                    .unwrap_or(0),
                start_timestamp: str_field(&record, "start_timestamp")
                    .map(str::to_string)
                    .unwrap_or_else(|| now.clone()),
                end_timestamp: str_field(&record, "end_timestamp")
                    .map(str::to_string)
                    .unwrap_or(now),
                topics: record
                    .get("topics")
                    .and_then(Value::as_array)
                    .map(|t| t.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default(),
                metadata: record.get("metadata").filter(|m| !m.is_null()).cloned(),
            };
            let result = queries::segments::insert_segment(db, &segment).await;
            tally(result, &mut report.segments, &mut report.errors, "segment");
        }
    }

    async fn migrate_emotions(&self, db: &Database, data: Value, report: &mut MigrationReport) {
        for record in entries(data) {
            let result: Result<i64, WorklyError> = async {
                let entry = NewEmotion {
                    emotion: str_field(&record, "emotion").unwrap_or("neutral").to_string(),
                    intensity: record.get("intensity").and_then(Value::as_f64).unwrap_or(0.5),
                    confidence: record.get("confidence").and_then(Value::as_f64).unwrap_or(1.0),
                    source: EmotionSource::parse(str_field(&record, "source").unwrap_or("user"))?,
                    message_preview: str_field(&record, "message_preview").map(str::to_string),
                    context: str_field(&record, "context").map(str::to_string),
                    timestamp: timestamp_field(&record, "timestamp"),
                    user_id: str_field(&record, "user_id").unwrap_or("desktop_user").to_string(),
                };
                queries::emotions::insert_emotion(db, &entry).await
            }
            .await;
            tally(result, &mut report.emotions, &mut report.errors, "emotion");
        }
    }

    async fn migrate_personality(&self, db: &Database, data: Value, report: &mut MigrationReport) {
        let traits = data
            .get("personality")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        for (name, value) in traits {
            let (score, description) = match &value {
                Value::Number(n) => (n.as_f64().unwrap_or(0.5), None),
                Value::Object(obj) => (
                    obj.get("score").and_then(Value::as_f64).unwrap_or(0.5),
                    obj.get("description")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                ),
                _ => {
                    warn!(trait_name = %name, "unknown legacy trait format, skipping");
                    continue;
                }
            };
            let personality_trait = PersonalityTrait {
                trait_name: name,
                score,
                description,
                last_updated: now_timestamp(),
            };
            let result = queries::personality::upsert_trait(db, &personality_trait).await;
            tally(
                result,
                &mut report.personality_traits,
                &mut report.errors,
                "personality",
            );
        }
    }
}

/// Build a fact from either a `{type, data, confidence, timestamp}` record
/// or a raw extractor record.
fn legacy_fact(category: FactCategory, record: &Value) -> NewFact {
    let wrapped = record.get("data").is_some_and(Value::is_object);
    let (fact_type, data) = if wrapped {
        (
            str_field(record, "type").unwrap_or("unknown").to_string(),
            record.get("data").cloned().unwrap_or_else(|| Value::Object(Map::new())),
        )
    } else {
        let type_key = match category {
            FactCategory::Entities => "entity_type",
            FactCategory::Preferences => "category",
            FactCategory::Events => "event_type",
            FactCategory::Relationships => "relation_type",
        };
        (
            str_field(record, "type")
                .or_else(|| str_field(record, type_key))
                .unwrap_or("unknown")
                .to_string(),
            record.clone(),
        )
    };
    NewFact {
        category,
        fact_type,
        data,
        confidence: record
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(1.0),
        timestamp: timestamp_field(record, "timestamp"),
        source_message_id: None,
    }
}

/// Records of a table stored as a bare list or as `{ "entries": [...] }`.
fn entries(data: Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("entries") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn array_field<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    data.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn str_field<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

fn timestamp_field(record: &Value, key: &str) -> String {
    str_field(record, key)
        .map(str::to_string)
        .unwrap_or_else(now_timestamp)
}

fn tally<T>(result: Result<T, WorklyError>, count: &mut usize, errors: &mut Vec<String>, what: &str) {
    match result {
        Ok(_) => *count += 1,
        Err(e) => {
            warn!(error = %e, "{what} record not migrated");
            errors.push(format!("{what} error: {e}"));
        }
    }
}

fn io_err(e: std::io::Error) -> WorklyError {
    WorklyError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::conversations::TurnQuery;
    use crate::queries::facts::FactQuery;
    use serde_json::json;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, value: &Value) {
        std::fs::write(dir.join(name), value.to_string()).unwrap();
    }

    fn write_fixture(dir: &Path) {
        write(
            dir,
            "conversations.json",
            &json!([
                {"role": "user", "content": "Salut", "timestamp": "2025-11-01T10:00:00"},
                {"role": "assistant", "content": "Bonjour !", "timestamp": "2025-11-01T10:00:01", "source": "discord"},
                {"content": "sans rôle"}
            ]),
        );
        write(
            dir,
            "embeddings.json",
            &json!({
                "embeddings": [[0.1, 0.2, 0.3], [0.3, 0.2, 0.1]],
                "texts": ["premier", "second"],
                "timestamps": ["2025-11-01T10:00:00"]
            }),
        );
        write(
            dir,
            "facts.json",
            &json!({
                "entities": [
                    {"entity_type": "person", "value": "Marie", "confidence": 0.7, "occurrences": 2}
                ],
                "preferences": [
                    {"type": "food", "data": {"subject": "pizza", "sentiment": "positive"}, "confidence": 0.7}
                ],
                "events": [],
                "relationships": []
            }),
        );
        write(
            dir,
            "segments.json",
            &json!([{"summary": "Discussion", "message_count": 20,
                     "start_timestamp": "2025-11-01T10:00:00", "end_timestamp": "2025-11-01T11:00:00",
                     "topics": ["Python"]}]),
        );
        write(
            dir,
            "emotion_history.json",
            &json!({"entries": [
                {"emotion": "joy", "intensity": 80, "confidence": 90, "source": "user"},
                {"emotion": "sorrow", "source": "narrator"}
            ]}),
        );
        write(
            dir,
            "personality.json",
            &json!({"personality": {
                "humor": 0.7,
                "kindness": {"score": 0.9, "description": "Chaleur"},
                "odd": "n/a"
            }}),
        );
    }

    #[tokio::test]
    async fn migrates_every_table_and_reports_bad_records() {
        let dir = tempdir().unwrap();
        let json_dir = dir.path().join("memory");
        std::fs::create_dir_all(&json_dir).unwrap();
        write_fixture(&json_dir);
        let db = Database::open(dir.path().join("workly.db")).await.unwrap();

        let report = JsonMigrator::new(&json_dir).run(&db).await.unwrap();

        assert_eq!(report.conversations, 3);
        assert_eq!(report.embeddings, 2);
        assert_eq!(report.facts, 2);
        assert_eq!(report.segments, 1);
        assert_eq!(report.emotions, 1);
        assert_eq!(report.personality_traits, 2);
        assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
        assert_eq!(report.backed_up.len(), 6);
        assert_eq!(report.total(), 11);

        let turns = queries::conversations::query_turns(&db, &TurnQuery::default())
            .await
            .unwrap();
        assert!(turns.iter().any(|t| t.content == "sans rôle" && t.role == Role::User));
        assert!(turns.iter().any(|t| t.source == "discord"));

        let entities = queries::facts::query_facts(
            &db,
            &FactQuery {
                category: Some(FactCategory::Entities),
                ..FactQuery::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(entities[0].fact_type, "person");
        assert_eq!(entities[0].data["value"], "Marie");

        let kindness = queries::personality::get_trait(&db, "kindness")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kindness.score, 0.9);
        assert_eq!(kindness.description.as_deref(), Some("Chaleur"));
    }

    #[tokio::test]
    async fn originals_are_backed_up_unchanged() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path());
        let backup = dir.path().join("elsewhere");
        let db = Database::open_in_memory().await.unwrap();

        JsonMigrator::new(dir.path())
            .with_backup_dir(&backup)
            .run(&db)
            .await
            .unwrap();

        for name in LEGACY_FILES {
            let original = std::fs::read(dir.path().join(name)).unwrap();
            let copy = std::fs::read(backup.join(name)).unwrap();
            assert_eq!(original, copy, "{name}");
        }
    }

    #[tokio::test]
    async fn missing_and_corrupt_files_do_not_abort() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("facts.json"), "{ not json").unwrap();
        write(dir.path(), "segments.json", &json!([]));
        let db = Database::open_in_memory().await.unwrap();

        let report = JsonMigrator::new(dir.path()).run(&db).await.unwrap();
        assert_eq!(report.total(), 0);
        assert_eq!(report.backed_up.len(), 2);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("JSON decode error"));
    }
}
