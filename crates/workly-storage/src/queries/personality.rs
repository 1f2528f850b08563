// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Personality trait and evolution log operations.

use rusqlite::{OptionalExtension, params};
use workly_core::WorklyError;

use crate::database::Database;
use crate::models::{PersonalityTrait, TraitEvolution};
use crate::writer::with_transaction;

fn validate_score(name: &str, score: f64) -> Result<(), WorklyError> {
    if !(0.0..=1.0).contains(&score) {
        return Err(WorklyError::Validation(format!(
            "trait `{name}` score {score} is outside 0..=1"
        )));
    }
    Ok(())
}

/// Insert or replace a trait's current value.
pub async fn upsert_trait(db: &Database, personality_trait: &PersonalityTrait) -> Result<(), WorklyError> {
    validate_score(&personality_trait.trait_name, personality_trait.score)?;
    let t = personality_trait.clone();
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO personality_traits (trait_name, score, description, last_updated)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(trait_name) DO UPDATE SET
                 score = excluded.score,
                 description = COALESCE(excluded.description, personality_traits.description),
                 last_updated = excluded.last_updated",
            params![t.trait_name, t.score, t.description, t.last_updated],
        )?;
        Ok(())
    })
    .await
}

fn read_trait(row: &rusqlite::Row<'_>) -> Result<PersonalityTrait, rusqlite::Error> {
    Ok(PersonalityTrait {
        trait_name: row.get(0)?,
        score: row.get(1)?,
        description: row.get(2)?,
        last_updated: row.get(3)?,
    })
}

/// Fetch one trait.
pub async fn get_trait(db: &Database, name: &str) -> Result<Option<PersonalityTrait>, WorklyError> {
    let name = name.to_string();
    db.call(move |conn| {
        conn.query_row(
            "SELECT trait_name, score, description, last_updated
             FROM personality_traits WHERE trait_name = ?1",
            params![name],
            read_trait,
        )
        .optional()
    })
    .await
}

/// All traits, ordered by name.
pub async fn list_traits(db: &Database) -> Result<Vec<PersonalityTrait>, WorklyError> {
    db.call(|conn| {
        let mut stmt = conn.prepare(
            "SELECT trait_name, score, description, last_updated
             FROM personality_traits ORDER BY trait_name",
        )?;
        let rows = stmt.query_map([], read_trait)?;
        rows.collect()
    })
    .await
}

/// Append a row to the evolution log.
pub async fn record_evolution(
    db: &Database,
    trait_name: &str,
    old_score: f64,
    new_score: f64,
    reason: Option<&str>,
    timestamp: &str,
) -> Result<i64, WorklyError> {
    let (trait_name, reason, timestamp) = (
        trait_name.to_string(),
        reason.map(str::to_string),
        timestamp.to_string(),
    );
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO personality_evolution (trait_name, old_score, new_score, reason, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![trait_name, old_score, new_score, reason, timestamp],
        )?;
        Ok(conn.last_insert_rowid())
    })
    .await
}

/// Set a trait's score and log the transition in one transaction.
///
/// The old score is read inside the transaction. Fails with a validation
/// error when the trait does not exist or the score is out of range.
pub async fn update_trait_score(
    db: &Database,
    trait_name: &str,
    new_score: f64,
    reason: Option<&str>,
    timestamp: &str,
) -> Result<f64, WorklyError> {
    validate_score(trait_name, new_score)?;
    let (name, reason, timestamp) = (
        trait_name.to_string(),
        reason.map(str::to_string),
        timestamp.to_string(),
    );
    let old = db
        .call(move |conn| {
            with_transaction(conn, |tx| {
                let old: Option<f64> = tx
                    .query_row(
                        "SELECT score FROM personality_traits WHERE trait_name = ?1",
                        params![name],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(old) = old else {
                    return Ok(None);
                };
                tx.execute(
                    "UPDATE personality_traits SET score = ?1, last_updated = ?2 WHERE trait_name = ?3",
                    params![new_score, timestamp, name],
                )?;
                tx.execute(
                    "INSERT INTO personality_evolution (trait_name, old_score, new_score, reason, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![name, old, new_score, reason, timestamp],
                )?;
                Ok(Some(old))
            })
        })
        .await?;

    old.ok_or_else(|| WorklyError::Validation(format!("unknown personality trait `{trait_name}`")))
}

/// Evolution log, newest first, optionally for one trait.
pub async fn evolution_history(
    db: &Database,
    trait_name: Option<&str>,
    limit: Option<i64>,
) -> Result<Vec<TraitEvolution>, WorklyError> {
    let trait_name = trait_name.map(str::to_string);
    db.call(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT id, trait_name, old_score, new_score, reason, timestamp
             FROM personality_evolution
             WHERE ?1 IS NULL OR trait_name = ?1
             ORDER BY timestamp DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![trait_name, limit.unwrap_or(-1)], |row| {
            Ok(TraitEvolution {
                id: row.get(0)?,
                trait_name: row.get(1)?,
                old_score: row.get(2)?,
                new_score: row.get(3)?,
                reason: row.get(4)?,
                timestamp: row.get(5)?,
            })
        })?;
        rows.collect()
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("personality.db")).await.unwrap();
        (db, dir)
    }

    fn make_trait(name: &str, score: f64) -> PersonalityTrait {
        PersonalityTrait {
            trait_name: name.to_string(),
            score,
            description: Some(format!("{name} description")),
            last_updated: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_score_and_keeps_description() {
        let (db, _dir) = setup_db().await;
        upsert_trait(&db, &make_trait("humor", 0.6)).await.unwrap();
        let mut updated = make_trait("humor", 0.7);
        updated.description = None;
        upsert_trait(&db, &updated).await.unwrap();

        let humor = get_trait(&db, "humor").await.unwrap().unwrap();
        assert_eq!(humor.score, 0.7);
        assert_eq!(humor.description.as_deref(), Some("humor description"));
        assert_eq!(list_traits(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_score_logs_transition() {
        let (db, _dir) = setup_db().await;
        upsert_trait(&db, &make_trait("empathy", 0.8)).await.unwrap();
        let old = update_trait_score(&db, "empathy", 0.83, Some("user_sad"), "2026-01-02T00:00:00.000Z")
            .await
            .unwrap();
        assert_eq!(old, 0.8);

        let history = evolution_history(&db, Some("empathy"), None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].old_score, 0.8);
        assert_eq!(history[0].new_score, 0.83);
        assert_eq!(history[0].reason.as_deref(), Some("user_sad"));
        assert_eq!(get_trait(&db, "empathy").await.unwrap().unwrap().score, 0.83);
    }

    #[tokio::test]
    async fn unknown_trait_and_bad_score_are_rejected() {
        let (db, _dir) = setup_db().await;
        let err = update_trait_score(&db, "charisma", 0.5, None, "t").await.unwrap_err();
        assert!(err.is_validation());
        assert!(evolution_history(&db, None, None).await.unwrap().is_empty());

        let err = upsert_trait(&db, &make_trait("humor", 1.2)).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let (db, _dir) = setup_db().await;
        record_evolution(&db, "humor", 0.5, 0.6, None, "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();
        record_evolution(&db, "kindness", 0.8, 0.7, Some("reset"), "2026-01-02T00:00:00.000Z")
            .await
            .unwrap();

        let all = evolution_history(&db, None, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].trait_name, "kindness");

        let one = evolution_history(&db, None, Some(1)).await.unwrap();
        assert_eq!(one.len(), 1);
    }
}
