// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding vector operations.

use rusqlite::params;
use workly_core::WorklyError;

use crate::database::Database;
use crate::models::{NewEmbedding, StoredEmbedding, blob_to_vec, vec_to_blob};

/// Insert an embedding and return its id.
pub async fn insert_embedding(db: &Database, embedding: &NewEmbedding) -> Result<i64, WorklyError> {
    validate_vector(&embedding.vector)?;
    let embedding = embedding.clone();
    db.call(move |conn| insert_embedding_row(conn, &embedding))
        .await
}

pub(crate) fn insert_embedding_row(
    conn: &rusqlite::Connection,
    embedding: &NewEmbedding,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO embeddings (conversation_id, segment_id, embedding, text, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            embedding.conversation_id,
            embedding.segment_id,
            vec_to_blob(&embedding.vector),
            embedding.text,
            embedding.timestamp,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn validate_vector(vector: &[f32]) -> Result<(), WorklyError> {
    if vector.is_empty() {
        return Err(WorklyError::Validation("embedding vector is empty".into()));
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(WorklyError::Validation(
            "embedding vector contains non-finite values".into(),
        ));
    }
    Ok(())
}

/// Load embeddings with their vectors, newest first.
pub async fn query_all_embeddings(
    db: &Database,
    limit: Option<i64>,
) -> Result<Vec<StoredEmbedding>, WorklyError> {
    db.call(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, segment_id, embedding, text, timestamp
             FROM embeddings ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit.unwrap_or(-1)], |row| {
            let blob: Vec<u8> = row.get(3)?;
            Ok(StoredEmbedding {
                id: row.get(0)?,
                conversation_id: row.get(1)?,
                segment_id: row.get(2)?,
                vector: blob_to_vec(&blob),
                text: row.get(4)?,
                timestamp: row.get(5)?,
            })
        })?;
        rows.collect()
    })
    .await
}

/// Total number of stored embeddings.
pub async fn count_embeddings(db: &Database) -> Result<i64, WorklyError> {
    db.call(|conn| conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0)))
        .await
}

/// Delete every embedding.
pub async fn delete_all_embeddings(db: &Database) -> Result<usize, WorklyError> {
    db.call(|conn| conn.execute("DELETE FROM embeddings", [])).await
}
