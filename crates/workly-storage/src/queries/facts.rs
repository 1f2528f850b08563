// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fact operations, including the entity dedup upsert.

use std::collections::HashMap;

use rusqlite::{OptionalExtension, params};
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use workly_core::{FactCategory, WorklyError};

use crate::database::Database;
use crate::models::{EntityRecord, Fact, NewFact, parse_enum_column};
use crate::writer::with_transaction;

/// Filters for [`query_facts`].
#[derive(Debug, Clone, Default)]
pub struct FactQuery {
    pub category: Option<FactCategory>,
    pub fact_type: Option<String>,
    pub min_confidence: Option<f64>,
    /// Newest rows are kept when a limit applies.
    pub limit: Option<i64>,
}

/// Insert a fact and return its id.
pub async fn insert_fact(db: &Database, fact: &NewFact) -> Result<i64, WorklyError> {
    validate_fact(fact)?;
    let fact = fact.clone();
    db.call(move |conn| insert_fact_row(conn, &fact)).await
}

fn insert_fact_row(conn: &rusqlite::Connection, fact: &NewFact) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO facts (category, type, data, confidence, timestamp, source_message_id, lookup_key)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            fact.category.as_str(),
            fact.fact_type,
            fact.data.to_string(),
            fact.confidence,
            fact.timestamp,
            fact.source_message_id,
            entity_key(fact),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Case-folded `value` of an entity fact. SQLite's `lower()` only folds
/// ASCII, so the key is computed here.
fn entity_key(fact: &NewFact) -> Option<String> {
    if fact.category != FactCategory::Entities {
        return None;
    }
    value_key(&fact.data)
}

fn value_key(data: &Value) -> Option<String> {
    data.get("value").and_then(Value::as_str).map(str::to_lowercase)
}

/// Find the entity row keyed `key`, keying any older rows that lack one.
fn find_entity(
    tx: &rusqlite::Transaction<'_>,
    fact_type: &str,
    key: &str,
) -> Result<Option<(i64, Value)>, rusqlite::Error> {
    let keyed = tx
        .query_row(
            "SELECT id, data FROM facts
             WHERE category = 'entities' AND type = ?1 AND lookup_key = ?2
             ORDER BY id LIMIT 1",
            params![fact_type, key],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;
    if let Some((id, raw)) = keyed {
        return Ok(serde_json::from_str(&raw).ok().map(|data| (id, data)));
    }

    let unkeyed: Vec<(i64, String)> = {
        let mut stmt = tx.prepare(
            "SELECT id, data FROM facts
             WHERE category = 'entities' AND type = ?1 AND lookup_key IS NULL ORDER BY id",
        )?;
        let rows = stmt.query_map(params![fact_type], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<_, _>>()?
    };
    let mut found = None;
    for (id, raw) in unkeyed {
        let Ok(data) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        let Some(row_key) = value_key(&data) else {
            continue;
        };
        tx.execute(
            "UPDATE facts SET lookup_key = ?1 WHERE id = ?2",
            params![row_key, id],
        )?;
        if found.is_none() && row_key == key {
            found = Some((id, data));
        }
    }
    Ok(found)
}

fn validate_fact(fact: &NewFact) -> Result<(), WorklyError> {
    if fact.fact_type.trim().is_empty() {
        return Err(WorklyError::Validation("fact type must not be empty".into()));
    }
    if !fact.confidence.is_finite() {
        return Err(WorklyError::Validation(format!(
            "fact confidence must be finite, got {}",
            fact.confidence
        )));
    }
    Ok(())
}

/// Query facts in chronological order (oldest first).
pub async fn query_facts(db: &Database, query: &FactQuery) -> Result<Vec<Fact>, WorklyError> {
    let mut sql = String::from(
        "SELECT id, category, type, data, confidence, timestamp, source_message_id
         FROM facts WHERE 1 = 1",
    );
    let mut args: Vec<SqlValue> = Vec::new();

    if let Some(category) = query.category {
        args.push(SqlValue::Text(category.as_str().to_string()));
        sql.push_str(&format!(" AND category = ?{}", args.len()));
    }
    if let Some(fact_type) = &query.fact_type {
        args.push(SqlValue::Text(fact_type.clone()));
        sql.push_str(&format!(" AND type = ?{}", args.len()));
    }
    if let Some(min) = query.min_confidence {
        args.push(SqlValue::Real(min));
        sql.push_str(&format!(" AND confidence >= ?{}", args.len()));
    }
    args.push(SqlValue::Integer(query.limit.unwrap_or(-1)));
    sql.push_str(&format!(
        " ORDER BY timestamp DESC, id DESC LIMIT ?{}",
        args.len()
    ));

    db.call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args), read_fact)?;
        let mut facts = rows.collect::<Result<Vec<_>, _>>()?;
        facts.reverse();
        Ok(facts)
    })
    .await
}

fn read_fact(row: &rusqlite::Row<'_>) -> Result<Fact, rusqlite::Error> {
    let raw: String = row.get(3)?;
    let data = serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Fact {
        id: row.get(0)?,
        category: parse_enum_column(1, row.get(1)?, FactCategory::parse)?,
        fact_type: row.get(2)?,
        data,
        confidence: row.get(4)?,
        timestamp: row.get(5)?,
        source_message_id: row.get(6)?,
    })
}

/// Record an entity mention.
///
/// `fact.data` must carry a string `value`. If an entity of the same type
/// with a case-insensitively equal value exists, its `occurrences` counter is
/// incremented and `last_seen` set to `fact.timestamp`; otherwise a new row
/// is inserted with `occurrences = 1`. The lookup goes through the indexed
/// `lookup_key` column, and the lookup and the write happen in one
/// transaction.
pub async fn record_entity(db: &Database, fact: &NewFact) -> Result<EntityRecord, WorklyError> {
    validate_fact(fact)?;
    if fact.category != FactCategory::Entities {
        return Err(WorklyError::Validation(format!(
            "record_entity expects an entity, got category `{}`",
            fact.category
        )));
    }
    let value = value_key(&fact.data)
        .ok_or_else(|| WorklyError::Validation("entity data needs a string `value`".into()))?;

    let mut fact = fact.clone();
    db.call(move |conn| {
        with_transaction(conn, |tx| {
            let existing = find_entity(tx, &fact.fact_type, &value)?;

            match existing {
                Some((id, mut data)) => {
                    let occurrences = data
                        .get("occurrences")
                        .and_then(Value::as_i64)
                        .unwrap_or(1)
                        + 1;
                    data["occurrences"] = Value::from(occurrences);
                    data["last_seen"] = Value::from(fact.timestamp.clone());
                    tx.execute(
                        "UPDATE facts SET data = ?1, confidence = MAX(confidence, ?2) WHERE id = ?3",
                        params![data.to_string(), fact.confidence, id],
                    )?;
                    Ok(EntityRecord {
                        id,
                        occurrences,
                        created: false,
                    })
                }
                None => {
                    if let Value::Object(map) = &mut fact.data {
                        map.insert("occurrences".into(), Value::from(1));
                        map.entry("first_seen")
                            .or_insert_with(|| Value::from(fact.timestamp.clone()));
                    }
                    let id = insert_fact_row(tx, &fact)?;
                    Ok(EntityRecord {
                        id,
                        occurrences: 1,
                        created: true,
                    })
                }
            }
        })
    })
    .await
}

/// Row counts per category. Categories without rows map to 0.
pub async fn fact_counts(db: &Database) -> Result<HashMap<FactCategory, i64>, WorklyError> {
    let rows: Vec<(String, i64)> = db
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT category, COUNT(*) FROM facts GROUP BY category")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
        .await?;

    let mut counts: HashMap<FactCategory, i64> =
        FactCategory::ALL.iter().map(|c| (*c, 0)).collect();
    for (category, count) in rows {
        counts.insert(FactCategory::parse(&category)?, count);
    }
    Ok(counts)
}

/// Delete every fact (explicit memory reset).
pub async fn delete_all_facts(db: &Database) -> Result<usize, WorklyError> {
    db.call(|conn| conn.execute("DELETE FROM facts", [])).await
}
