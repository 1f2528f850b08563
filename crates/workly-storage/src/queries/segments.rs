// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Segment operations.

use rusqlite::{OptionalExtension, params};
use workly_core::WorklyError;

use crate::database::Database;
use crate::models::{NewEmbedding, NewSegment, Segment, parse_json_column};
use crate::queries::embeddings::{insert_embedding_row, validate_vector};
use crate::writer::with_transaction;

const SELECT_SEGMENT: &str = "SELECT id, summary, message_count, start_timestamp, end_timestamp, topics, metadata
     FROM segments";

/// Insert a segment and return its id.
pub async fn insert_segment(db: &Database, segment: &NewSegment) -> Result<i64, WorklyError> {
    validate_segment(segment)?;
    let segment = segment.clone();
    db.call(move |conn| insert_segment_row(conn, &segment))
        .await
}

/// Insert a segment together with the embedding of its summary.
///
/// Both rows are written in one transaction; the embedding's `segment_id` is
/// set to the new segment. Returns `(segment_id, embedding_id)`.
pub async fn insert_segment_with_embedding(
    db: &Database,
    segment: &NewSegment,
    embedding: &NewEmbedding,
) -> Result<(i64, i64), WorklyError> {
    validate_segment(segment)?;
    validate_vector(&embedding.vector)?;
    let segment = segment.clone();
    let mut embedding = embedding.clone();
    db.call(move |conn| {
        with_transaction(conn, |tx| {
            let segment_id = insert_segment_row(tx, &segment)?;
            embedding.segment_id = Some(segment_id);
            let embedding_id = insert_embedding_row(tx, &embedding)?;
            Ok((segment_id, embedding_id))
        })
    })
    .await
}

fn validate_segment(segment: &NewSegment) -> Result<(), WorklyError> {
    if segment.message_count < 0 {
        return Err(WorklyError::Validation(format!(
            "segment message_count must not be negative, got {}",
            segment.message_count
        )));
    }
    if segment.end_timestamp < segment.start_timestamp {
        return Err(WorklyError::Validation(
            "segment ends before it starts".into(),
        ));
    }
    Ok(())
}

fn insert_segment_row(
    conn: &rusqlite::Connection,
    segment: &NewSegment,
) -> Result<i64, rusqlite::Error> {
    let topics = serde_json::Value::from(segment.topics.clone()).to_string();
    conn.execute(
        "INSERT INTO segments (summary, message_count, start_timestamp, end_timestamp, topics, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            segment.summary,
            segment.message_count,
            segment.start_timestamp,
            segment.end_timestamp,
            topics,
            segment.metadata.as_ref().map(|m| m.to_string()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn read_segment(row: &rusqlite::Row<'_>) -> Result<Segment, rusqlite::Error> {
    let topics: Option<String> = row.get(5)?;
    Ok(Segment {
        id: row.get(0)?,
        summary: row.get(1)?,
        message_count: row.get(2)?,
        start_timestamp: row.get(3)?,
        end_timestamp: row.get(4)?,
        topics: topics
            .and_then(|t| serde_json::from_str(&t).ok())
            .unwrap_or_default(),
        metadata: parse_json_column(row.get(6)?),
    })
}

/// Most recent segments first.
pub async fn query_segments(db: &Database, limit: Option<i64>) -> Result<Vec<Segment>, WorklyError> {
    db.call(move |conn| {
        let mut stmt = conn.prepare(&format!(
            "{SELECT_SEGMENT} ORDER BY end_timestamp DESC, id DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit.unwrap_or(-1)], read_segment)?;
        rows.collect()
    })
    .await
}

/// Fetch one segment by id.
pub async fn get_segment(db: &Database, id: i64) -> Result<Option<Segment>, WorklyError> {
    db.call(move |conn| {
        conn.query_row(
            &format!("{SELECT_SEGMENT} WHERE id = ?1"),
            params![id],
            read_segment,
        )
        .optional()
    })
    .await
}

/// Total number of segments.
pub async fn count_segments(db: &Database) -> Result<i64, WorklyError> {
    db.call(|conn| conn.query_row("SELECT COUNT(*) FROM segments", [], |row| row.get(0)))
        .await
}

/// Delete every segment. Their embeddings cascade.
pub async fn delete_all_segments(db: &Database) -> Result<usize, WorklyError> {
    db.call(|conn| conn.execute("DELETE FROM segments", [])).await
}
