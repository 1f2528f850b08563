// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `workly doctor` command implementation.
//!
//! Runs diagnostic checks against the configured store to surface
//! configuration mistakes, unreadable databases and pending migrations.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use workly_config::WorklyConfig;
use workly_core::{HealthStatus, PluginAdapter, StorageAdapter, WorklyError};
use workly_storage::SqliteStorage;
use workly_storage::legacy::{BACKUP_DIR_NAME, LEGACY_FILES};

/// Status of a diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `workly doctor` command.
///
/// With `deep`, also runs `PRAGMA integrity_check`. With `plain`, or when
/// stdout is not a terminal, output is uncolored.
pub async fn run_doctor(
    config: &WorklyConfig,
    config_path: Option<&Path>,
    deep: bool,
    plain: bool,
) -> Result<(), WorklyError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let mut results = vec![
        check_config(config_path),
        check_database(config).await,
        check_legacy_files(config),
        check_embedding_model(config),
    ];
    if deep {
        results.push(check_db_integrity(&config.storage.database_path).await);
        results.push(check_memory_baseline());
    }

    println!();
    println!("  workly doctor");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", render_line(result, use_color));
    }
    println!();

    let issues = results.iter().filter(|r| r.status != CheckStatus::Pass).count();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
        if !deep {
            println!("  Run with --deep for detailed diagnostics.");
        }
    } else {
        println!("  All checks passed.");
    }
    println!();

    if results.iter().any(|r| r.status == CheckStatus::Fail) {
        return Err(WorklyError::HealthCheckFailed {
            name: "doctor".into(),
            source: "one or more checks failed".into(),
        });
    }
    Ok(())
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal().to_string()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow().to_string()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red().to_string()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!("    {tag} {:<20} {} ({duration_ms}ms)", result.name, result.message)
    }
}

/// Check configuration loads without errors.
fn check_config(path: Option<&Path>) -> CheckResult {
    let start = Instant::now();
    let loaded = match path {
        Some(path) => workly_config::load_and_validate_path(path),
        None => workly_config::load_and_validate(),
    };
    match loaded {
        Ok(_) => CheckResult::new("Configuration", CheckStatus::Pass, "valid", start),
        Err(errors) => CheckResult::new(
            "Configuration",
            CheckStatus::Fail,
            format!("{} error(s)", errors.len()),
            start,
        ),
    }
}

/// Open the store through the storage adapter and run its health check.
async fn check_database(config: &WorklyConfig) -> CheckResult {
    let start = Instant::now();
    let db_path = &config.storage.database_path;
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let storage = SqliteStorage::new(config.storage.clone());
    if let Err(e) = storage.initialize().await {
        return CheckResult::new("Database", CheckStatus::Fail, format!("open failed: {e}"), start);
    }
    let result = match storage.health_check().await {
        Ok(HealthStatus::Healthy) => {
            CheckResult::new("Database", CheckStatus::Pass, format!("connected ({})", storage.label()), start)
        }
        Ok(HealthStatus::Degraded(reason)) => {
            CheckResult::new("Database", CheckStatus::Warn, reason, start)
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            CheckResult::new("Database", CheckStatus::Fail, reason, start)
        }
        Err(e) => CheckResult::new("Database", CheckStatus::Fail, format!("query failed: {e}"), start),
    };
    let _ = storage.shutdown().await;
    result
}

/// Warn when legacy JSON files are present but have never been backed up.
fn check_legacy_files(config: &WorklyConfig) -> CheckResult {
    let start = Instant::now();
    let dir = Path::new(&config.storage.legacy_json_dir);
    let pending: Vec<&str> = LEGACY_FILES
        .iter()
        .copied()
        .filter(|name| dir.join(name).exists() && !dir.join(BACKUP_DIR_NAME).join(name).exists())
        .collect();

    if pending.is_empty() {
        CheckResult::new("Legacy JSON", CheckStatus::Pass, "nothing to migrate", start)
    } else {
        CheckResult::new(
            "Legacy JSON",
            CheckStatus::Warn,
            format!("{} file(s) not migrated, run `workly migrate-json`", pending.len()),
            start,
        )
    }
}

fn check_embedding_model(config: &WorklyConfig) -> CheckResult {
    let start = Instant::now();

    #[cfg(feature = "onnx")]
    {
        let model_root = config
            .memory
            .model_dir
            .as_ref()
            .map(std::path::PathBuf::from)
            .or_else(|| dirs::data_dir().map(|d| d.join("workly")))
            .unwrap_or_else(|| std::path::PathBuf::from("."));
        let models = workly_memory::ModelManager::new(model_root, config.memory.embedding_model.clone());
        if models.is_available() {
            CheckResult::new("Embedding model", CheckStatus::Pass, models.model_name(), start)
        } else {
            CheckResult::new(
                "Embedding model",
                CheckStatus::Warn,
                format!("{} not downloaded yet", models.model_name()),
                start,
            )
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        CheckResult::new(
            "Embedding model",
            CheckStatus::Warn,
            format!(
                "{} unavailable (built without `onnx`), search uses recent segments",
                config.memory.embedding_model
            ),
            start,
        )
    }
}

/// Deep check: SQLite integrity check.
async fn check_db_integrity(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !Path::new(db_path).exists() {
        return CheckResult::new("DB integrity", CheckStatus::Warn, "database not found (skipped)", start);
    }

    let db = match workly_storage::Database::open(db_path).await {
        Ok(db) => db,
        Err(e) => {
            return CheckResult::new("DB integrity", CheckStatus::Fail, format!("open failed: {e}"), start);
        }
    };
    let rows = db
        .call(|conn| {
            let mut stmt = conn.prepare("PRAGMA integrity_check")?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(rows)
        })
        .await;

    match rows {
        Ok(rows) if rows.len() == 1 && rows[0] == "ok" => {
            CheckResult::new("DB integrity", CheckStatus::Pass, "ok", start)
        }
        Ok(rows) => CheckResult::new(
            "DB integrity",
            CheckStatus::Fail,
            format!("{} issue(s) found", rows.len()),
            start,
        ),
        Err(e) => CheckResult::new("DB integrity", CheckStatus::Fail, format!("check failed: {e}"), start),
    }
}

/// Deep check: memory baseline via jemalloc.
fn check_memory_baseline() -> CheckResult {
    let start = Instant::now();

    #[cfg(not(target_env = "msvc"))]
    {
        let _ = tikv_jemalloc_ctl::epoch::advance();
        let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
        let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
        let allocated_mb = allocated as f64 / (1024.0 * 1024.0);
        let resident_mb = resident as f64 / (1024.0 * 1024.0);
        CheckResult::new(
            "Memory baseline",
            CheckStatus::Pass,
            format!("heap: {allocated_mb:.1} MB, resident: {resident_mb:.1} MB"),
            start,
        )
    }

    #[cfg(target_env = "msvc")]
    {
        CheckResult::new("Memory baseline", CheckStatus::Warn, "jemalloc not available on MSVC", start)
    }
}
