// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `workly stats` and `workly vacuum` command implementations.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use workly_config::WorklyConfig;
use workly_core::WorklyError;
use workly_memory::{EmotionStatistics, MemoryStats, TraitSummary};

use crate::stack;

/// Structured output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub memory: MemoryStats,
    pub emotions: EmotionStatistics,
    pub personality: BTreeMap<String, TraitSummary>,
}

/// Print memory, emotion and personality statistics.
pub async fn run_stats(config: &WorklyConfig, json: bool) -> Result<(), WorklyError> {
    let db = stack::open_database(config).await?;
    let manager = stack::memory_manager(config, db.clone()).await?;
    let report = StatsReport {
        memory: manager.get_stats().await?,
        emotions: stack::emotion_memory(config, db.clone()).statistics().await?,
        personality: stack::personality(db).await?.summary().await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report).map_err(crate::render_err)?);
    } else {
        print!("{}", render_stats(&report));
    }
    Ok(())
}

fn render_stats(report: &StatsReport) -> String {
    let memory = &report.memory;
    let mut out = String::new();
    out.push_str("\n  workly memory\n");
    out.push_str(&format!("  {}\n", "-".repeat(50)));
    for (label, value) in [
        ("Storage", memory.storage_location.clone()),
        ("Turns", memory.turn_count.to_string()),
        ("Segments", memory.segment_count.to_string()),
        ("Embeddings", memory.embedding_count.to_string()),
        ("Entities", memory.entity_count.to_string()),
        ("Preferences", memory.preference_count.to_string()),
        ("Events", memory.event_count.to_string()),
        ("Relationships", memory.relationship_count.to_string()),
        (
            "Semantic search",
            if memory.embedding_available {
                format!("on ({})", memory.embedding_model)
            } else {
                "off".to_string()
            },
        ),
    ] {
        out.push_str(&format!("    {label:<20} {value}\n"));
    }

    let emotions = &report.emotions;
    out.push_str("\n  emotions\n");
    out.push_str(&format!("    {:<20} {}\n", "Entries", emotions.total_entries));
    if let Some(dominant) = &emotions.dominant_emotion_user {
        out.push_str(&format!("    {:<20} {dominant}\n", "Dominant (user)"));
    }
    out.push_str(&format!("    {:<20} {}\n", "Trend", emotions.emotional_trend.as_str()));

    out.push_str("\n  personality\n");
    for (name, summary) in &report.personality {
        out.push_str(&format!(
            "    {name:<20} {:.2} ({} change(s))\n",
            summary.current_score, summary.evolution_count
        ));
    }
    out
}

/// Compact the database file and truncate the WAL.
pub async fn run_vacuum(config: &WorklyConfig) -> Result<(), WorklyError> {
    let path = Path::new(&config.storage.database_path);
    let before = file_size(path);

    let db = stack::open_database(config).await?;
    db.vacuum().await?;
    db.checkpoint().await?;
    db.close().await?;

    let after = file_size(path);
    println!(
        "Vacuum complete: {:.1} MB -> {:.1} MB ({})",
        as_mb(before),
        as_mb(after),
        path.display()
    );
    Ok(())
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn as_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use workly_core::{EmotionSource, Role};

    #[tokio::test]
    async fn stats_cover_all_subsystems() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WorklyConfig::default();
        config.storage.database_path = dir.path().join("workly.db").to_string_lossy().into_owned();

        let db = stack::open_database(&config).await.unwrap();
        let manager = stack::memory_manager(&config, db.clone()).await.unwrap();
        manager.add_message(Role::User, "J'adore la pizza.").await.unwrap();
        stack::emotion_memory(&config, db.clone())
            .record("joy", 80.0, 90.0, EmotionSource::User, "", None)
            .await
            .unwrap();

        let report = StatsReport {
            memory: manager.get_stats().await.unwrap(),
            emotions: stack::emotion_memory(&config, db.clone()).statistics().await.unwrap(),
            personality: stack::personality(db).await.unwrap().summary().await.unwrap(),
        };
        assert_eq!(report.memory.turn_count, 1);
        assert_eq!(report.memory.preference_count, 1);
        assert_eq!(report.emotions.total_entries, 1);
        assert_eq!(report.personality.len(), 6);

        let text = render_stats(&report);
        assert!(text.contains("Turns                1"));
        assert!(text.contains("Semantic search      off"));
        assert!(text.contains("Dominant (user)      joy"));
        assert!(text.contains("kindness"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["memory"]["turn_count"], 1);
    }

    #[tokio::test]
    async fn vacuum_runs_on_fresh_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WorklyConfig::default();
        config.storage.database_path = dir.path().join("workly.db").to_string_lossy().into_owned();
        run_vacuum(&config).await.unwrap();
        assert!(file_size(&dir.path().join("workly.db")) > 0);
    }
}
