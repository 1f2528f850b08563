// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation turn operations.

use rusqlite::params;
use rusqlite::types::Value as SqlValue;
use workly_core::{Role, WorklyError};

use crate::database::Database;
use crate::models::{NewTurn, Turn, parse_enum_column, parse_json_column};

/// Filters for [`query_turns`]. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct TurnQuery {
    pub user_id: Option<String>,
    /// Inclusive lower bound on `timestamp`.
    pub since: Option<String>,
    /// Exclusive upper bound on `timestamp`.
    pub until: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Insert a turn and return its id.
pub async fn insert_turn(db: &Database, turn: &NewTurn) -> Result<i64, WorklyError> {
    let turn = turn.clone();
    let metadata = turn.metadata.as_ref().map(|m| m.to_string());
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO conversations (role, content, timestamp, user_id, source, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                turn.role.as_str(),
                turn.content,
                turn.timestamp,
                turn.user_id,
                turn.source,
                metadata,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
    .await
}

/// Query turns, newest first.
pub async fn query_turns(db: &Database, query: &TurnQuery) -> Result<Vec<Turn>, WorklyError> {
    let mut sql = String::from(
        "SELECT id, role, content, timestamp, user_id, source, metadata
         FROM conversations WHERE 1 = 1",
    );
    let mut args: Vec<SqlValue> = Vec::new();

    if let Some(user_id) = &query.user_id {
        args.push(SqlValue::Text(user_id.clone()));
        sql.push_str(&format!(" AND user_id = ?{}", args.len()));
    }
    if let Some(since) = &query.since {
        args.push(SqlValue::Text(since.clone()));
        sql.push_str(&format!(" AND timestamp >= ?{}", args.len()));
    }
    if let Some(until) = &query.until {
        args.push(SqlValue::Text(until.clone()));
        sql.push_str(&format!(" AND timestamp < ?{}", args.len()));
    }

    // SQLite needs a LIMIT before OFFSET; -1 means unbounded.
    args.push(SqlValue::Integer(query.limit.unwrap_or(-1)));
    sql.push_str(&format!(
        " ORDER BY timestamp DESC, id DESC LIMIT ?{}",
        args.len()
    ));
    args.push(SqlValue::Integer(query.offset.unwrap_or(0)));
    sql.push_str(&format!(" OFFSET ?{}", args.len()));

    db.call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args), |row| {
            Ok(Turn {
                id: row.get(0)?,
                role: parse_enum_column(1, row.get(1)?, Role::parse)?,
                content: row.get(2)?,
                timestamp: row.get(3)?,
                user_id: row.get(4)?,
                source: row.get(5)?,
                metadata: parse_json_column(row.get(6)?),
            })
        })?;
        rows.collect()
    })
    .await
}

/// Total number of stored turns.
pub async fn count_turns(db: &Database) -> Result<i64, WorklyError> {
    db.call(|conn| conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0)))
        .await
}

/// Delete turns older than `timestamp`, returning how many were removed.
///
/// Facts and embeddings that referenced a deleted turn keep their rows; the
/// foreign key is set to NULL.
pub async fn delete_turns_before(db: &Database, timestamp: &str) -> Result<usize, WorklyError> {
    let timestamp = timestamp.to_string();
    db.call(move |conn| {
        conn.execute(
            "DELETE FROM conversations WHERE timestamp < ?1",
            params![timestamp],
        )
    })
    .await
}

/// Delete every turn.
pub async fn delete_all_turns(db: &Database) -> Result<usize, WorklyError> {
    db.call(|conn| conn.execute("DELETE FROM conversations", []))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("turns.db")).await.unwrap();
        (db, dir)
    }

    fn make_turn(role: Role, content: &str, timestamp: &str, user_id: &str) -> NewTurn {
        NewTurn {
            role,
            content: content.to_string(),
            timestamp: timestamp.to_string(),
            user_id: user_id.to_string(),
            source: "desktop".to_string(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn insert_and_query_newest_first() {
        let (db, _dir) = setup_db().await;
        let first = insert_turn(
            &db,
            &make_turn(Role::User, "Bonjour", "2026-01-01T10:00:00.000Z", "desktop_user"),
        )
        .await
        .unwrap();
        let second = insert_turn(
            &db,
            &make_turn(Role::Assistant, "Salut !", "2026-01-01T10:00:01.000Z", "desktop_user"),
        )
        .await
        .unwrap();
        assert!(second > first);

        let turns = query_turns(&db, &TurnQuery::default()).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].id, second);
        assert_eq!(turns[0].role, Role::Assistant);
        assert_eq!(turns[1].content, "Bonjour");
    }

    #[tokio::test]
    async fn metadata_roundtrips_as_json() {
        let (db, _dir) = setup_db().await;
        let mut turn = make_turn(Role::User, "hi", "2026-01-01T10:00:00.000Z", "u");
        turn.metadata = Some(serde_json::json!({"segment_seq": 3}));
        insert_turn(&db, &turn).await.unwrap();

        let turns = query_turns(&db, &TurnQuery::default()).await.unwrap();
        assert_eq!(turns[0].metadata, Some(serde_json::json!({"segment_seq": 3})));
    }

    #[tokio::test]
    async fn filters_by_user_and_time_range() {
        let (db, _dir) = setup_db().await;
        for (i, user) in ["alice", "bob", "alice", "alice"].iter().enumerate() {
            let ts = format!("2026-01-0{}T00:00:00.000Z", i + 1);
            insert_turn(&db, &make_turn(Role::User, "x", &ts, user))
                .await
                .unwrap();
        }

        let alice = query_turns(
            &db,
            &TurnQuery {
                user_id: Some("alice".into()),
                ..TurnQuery::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(alice.len(), 3);

        let ranged = query_turns(
            &db,
            &TurnQuery {
                user_id: Some("alice".into()),
                since: Some("2026-01-02T00:00:00.000Z".into()),
                until: Some("2026-01-04T00:00:00.000Z".into()),
                ..TurnQuery::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].timestamp, "2026-01-03T00:00:00.000Z");
    }

    #[tokio::test]
    async fn limit_and_offset_page_through_history() {
        let (db, _dir) = setup_db().await;
        for i in 0..5 {
            let ts = format!("2026-01-01T00:00:0{i}.000Z");
            insert_turn(&db, &make_turn(Role::User, &format!("m{i}"), &ts, "u"))
                .await
                .unwrap();
        }

        let page = query_turns(
            &db,
            &TurnQuery {
                limit: Some(2),
                offset: Some(1),
                ..TurnQuery::default()
            },
        )
        .await
        .unwrap();
        let contents: Vec<_> = page.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m2"]);

        let offset_only = query_turns(
            &db,
            &TurnQuery {
                offset: Some(3),
                ..TurnQuery::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(offset_only.len(), 2);
    }

    #[tokio::test]
    async fn retention_deletes_only_older_turns() {
        let (db, _dir) = setup_db().await;
        insert_turn(&db, &make_turn(Role::User, "old", "2025-01-01T00:00:00.000Z", "u"))
            .await
            .unwrap();
        insert_turn(&db, &make_turn(Role::User, "new", "2026-06-01T00:00:00.000Z", "u"))
            .await
            .unwrap();

        let deleted = delete_turns_before(&db, "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(count_turns(&db).await.unwrap(), 1);

        assert_eq!(delete_all_turns(&db).await.unwrap(), 1);
        assert_eq!(count_turns(&db).await.unwrap(), 0);
    }
}
