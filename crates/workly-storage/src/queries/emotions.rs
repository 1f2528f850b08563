// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Emotion history operations.

use rusqlite::params;
use rusqlite::types::Value as SqlValue;
use workly_core::{EmotionSource, WorklyError};

use crate::database::Database;
use crate::models::{EmotionEntry, NewEmotion, parse_enum_column};

/// Filters for [`query_emotions`].
#[derive(Debug, Clone, Default)]
pub struct EmotionQuery {
    pub user_id: Option<String>,
    pub source: Option<EmotionSource>,
    pub emotion: Option<String>,
    /// Inclusive lower bound on `timestamp`.
    pub since: Option<String>,
    /// Newest rows are kept when a limit applies.
    pub limit: Option<i64>,
}

/// Insert an emotion entry and return its id.
pub async fn insert_emotion(db: &Database, entry: &NewEmotion) -> Result<i64, WorklyError> {
    if entry.emotion.trim().is_empty() {
        return Err(WorklyError::Validation("emotion must not be empty".into()));
    }
    let entry = entry.clone();
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO emotion_history
                 (emotion, intensity, confidence, source, message_preview, context, timestamp, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.emotion,
                entry.intensity,
                entry.confidence,
                entry.source.as_str(),
                entry.message_preview,
                entry.context,
                entry.timestamp,
                entry.user_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
    .await
}

/// Query emotion entries in chronological order (oldest first).
pub async fn query_emotions(
    db: &Database,
    query: &EmotionQuery,
) -> Result<Vec<EmotionEntry>, WorklyError> {
    let mut sql = String::from(
        "SELECT id, emotion, intensity, confidence, source, message_preview, context, timestamp, user_id
         FROM emotion_history WHERE 1 = 1",
    );
    let mut args: Vec<SqlValue> = Vec::new();

    if let Some(user_id) = &query.user_id {
        args.push(SqlValue::Text(user_id.clone()));
        sql.push_str(&format!(" AND user_id = ?{}", args.len()));
    }
    if let Some(source) = query.source {
        args.push(SqlValue::Text(source.as_str().to_string()));
        sql.push_str(&format!(" AND source = ?{}", args.len()));
    }
    if let Some(emotion) = &query.emotion {
        args.push(SqlValue::Text(emotion.clone()));
        sql.push_str(&format!(" AND emotion = ?{}", args.len()));
    }
    if let Some(since) = &query.since {
        args.push(SqlValue::Text(since.clone()));
        sql.push_str(&format!(" AND timestamp >= ?{}", args.len()));
    }
    args.push(SqlValue::Integer(query.limit.unwrap_or(-1)));
    sql.push_str(&format!(
        " ORDER BY timestamp DESC, id DESC LIMIT ?{}",
        args.len()
    ));

    db.call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args), |row| {
            Ok(EmotionEntry {
                id: row.get(0)?,
                emotion: row.get(1)?,
                intensity: row.get(2)?,
                confidence: row.get(3)?,
                source: parse_enum_column(4, row.get(4)?, EmotionSource::parse)?,
                message_preview: row.get(5)?,
                context: row.get(6)?,
                timestamp: row.get(7)?,
                user_id: row.get(8)?,
            })
        })?;
        let mut entries = rows.collect::<Result<Vec<_>, _>>()?;
        entries.reverse();
        Ok(entries)
    })
    .await
}

/// Number of entries for a user, or for everyone when `user_id` is `None`.
pub async fn count_emotions(db: &Database, user_id: Option<&str>) -> Result<i64, WorklyError> {
    let user_id = user_id.map(str::to_string);
    db.call(move |conn| {
        conn.query_row(
            "SELECT COUNT(*) FROM emotion_history WHERE ?1 IS NULL OR user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
    })
    .await
}

/// Delete a user's history, or everyone's when `user_id` is `None`.
pub async fn delete_all_emotions(db: &Database, user_id: Option<&str>) -> Result<usize, WorklyError> {
    let user_id = user_id.map(str::to_string);
    db.call(move |conn| {
        conn.execute(
            "DELETE FROM emotion_history WHERE ?1 IS NULL OR user_id = ?1",
            params![user_id],
        )
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("emotions.db")).await.unwrap();
        (db, dir)
    }

    fn make_entry(emotion: &str, source: EmotionSource, timestamp: &str, user_id: &str) -> NewEmotion {
        NewEmotion {
            emotion: emotion.to_string(),
            intensity: 60.0,
            confidence: 80.0,
            source,
            message_preview: Some("Je suis content".to_string()),
            context: None,
            timestamp: timestamp.to_string(),
            user_id: user_id.to_string(),
        }
    }

    #[tokio::test]
    async fn filters_by_source_and_user() {
        let (db, _dir) = setup_db().await;
        insert_emotion(&db, &make_entry("joy", EmotionSource::User, "2026-01-01T00:00:01.000Z", "a"))
            .await
            .unwrap();
        insert_emotion(&db, &make_entry("fun", EmotionSource::Assistant, "2026-01-01T00:00:02.000Z", "a"))
            .await
            .unwrap();
        insert_emotion(&db, &make_entry("sorrow", EmotionSource::User, "2026-01-01T00:00:03.000Z", "b"))
            .await
            .unwrap();

        let user_a = query_emotions(
            &db,
            &EmotionQuery {
                user_id: Some("a".into()),
                source: Some(EmotionSource::User),
                ..EmotionQuery::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(user_a.len(), 1);
        assert_eq!(user_a[0].emotion, "joy");
        assert_eq!(user_a[0].source, EmotionSource::User);

        assert_eq!(count_emotions(&db, Some("a")).await.unwrap(), 2);
        assert_eq!(count_emotions(&db, None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn limit_keeps_most_recent_in_order() {
        let (db, _dir) = setup_db().await;
        for (i, emotion) in ["joy", "neutral", "angry"].iter().enumerate() {
            let ts = format!("2026-01-01T00:00:0{i}.000Z");
            insert_emotion(&db, &make_entry(emotion, EmotionSource::User, &ts, "u"))
                .await
                .unwrap();
        }
        let last_two = query_emotions(
            &db,
            &EmotionQuery {
                limit: Some(2),
                ..EmotionQuery::default()
            },
        )
        .await
        .unwrap();
        let names: Vec<_> = last_two.iter().map(|e| e.emotion.as_str()).collect();
        assert_eq!(names, vec!["neutral", "angry"]);
    }

    #[tokio::test]
    async fn delete_is_scoped_to_user() {
        let (db, _dir) = setup_db().await;
        insert_emotion(&db, &make_entry("joy", EmotionSource::User, "t1", "a"))
            .await
            .unwrap();
        insert_emotion(&db, &make_entry("joy", EmotionSource::User, "t2", "b"))
            .await
            .unwrap();
        assert_eq!(delete_all_emotions(&db, Some("a")).await.unwrap(), 1);
        assert_eq!(count_emotions(&db, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_emotion_is_rejected() {
        let (db, _dir) = setup_db().await;
        let err = insert_emotion(&db, &make_entry("", EmotionSource::User, "t", "a"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}
