// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `workly migrate-json` command implementation.

use std::path::PathBuf;

use workly_config::WorklyConfig;
use workly_core::WorklyError;
use workly_storage::{JsonMigrator, MigrationReport};

use crate::stack;

/// Import the legacy JSON files into the configured database.
///
/// Record-level failures are listed but do not fail the command.
pub async fn run_migrate_json(
    config: &WorklyConfig,
    json_dir: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
    json: bool,
) -> Result<(), WorklyError> {
    let json_dir = json_dir.unwrap_or_else(|| PathBuf::from(&config.storage.legacy_json_dir));
    if !json_dir.is_dir() {
        return Err(WorklyError::Validation(format!(
            "legacy directory not found: {}",
            json_dir.display()
        )));
    }

    let mut migrator = JsonMigrator::new(json_dir);
    if let Some(backup_dir) = backup_dir {
        migrator = migrator.with_backup_dir(backup_dir);
    }

    let db = stack::open_database(config).await?;
    let report = migrator.run(&db).await?;
    db.close().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report).map_err(crate::render_err)?);
    } else {
        print!("{}", render_report(&report, &migrator));
    }
    Ok(())
}

fn render_report(report: &MigrationReport, migrator: &JsonMigrator) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n  Migration from {}\n", migrator.json_dir().display()));
    out.push_str(&format!("  {}\n", "-".repeat(50)));
    for (label, count) in [
        ("Conversations", report.conversations),
        ("Embeddings", report.embeddings),
        ("Facts", report.facts),
        ("Segments", report.segments),
        ("Emotions", report.emotions),
        ("Personality traits", report.personality_traits),
    ] {
        out.push_str(&format!("    {label:<20} {count}\n"));
    }
    out.push_str(&format!("    {:<20} {}\n", "Total", report.total()));
    out.push_str(&format!(
        "\n  {} file(s) backed up to {}\n",
        report.backed_up.len(),
        migrator.backup_dir().display()
    ));
    if !report.errors.is_empty() {
        out.push_str(&format!("\n  {} error(s):\n", report.errors.len()));
        for error in &report.errors {
            out.push_str(&format!("    - {error}\n"));
        }
    }
    out
}
