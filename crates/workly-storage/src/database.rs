// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};
use workly_core::WorklyError;

use crate::migrations::run_migrations;

/// Connection settings applied when a database is opened.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Use write-ahead logging so readers never block the writer.
    pub wal_mode: bool,
    /// How long SQLite retries a locked database before returning `SQLITE_BUSY`.
    pub busy_timeout: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            wal_mode: true,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

impl From<&workly_config::model::StorageConfig> for OpenOptions {
    fn from(config: &workly_config::model::StorageConfig) -> Self {
        Self {
            wal_mode: config.wal_mode,
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        }
    }
}

/// Handle to the shared SQLite database.
///
/// Cloning is cheap: every clone talks to the same background connection
/// thread, so the memory manager, emotion memory and personality engine can
/// share one store.
#[derive(Clone, Debug)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the database at `path` with default options and run migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, WorklyError> {
        Self::open_with(path, &OpenOptions::default()).await
    }

    /// Open (or create) the database at `path` and run migrations.
    pub async fn open_with(
        path: impl AsRef<Path>,
        options: &OpenOptions,
    ) -> Result<Self, WorklyError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WorklyError::Storage {
                    source: Box::new(e),
                })?;
        }

        let options = options.clone();
        let open_path = path.clone();
        let conn = tokio::task::spawn_blocking(move || {
            let mut conn = rusqlite::Connection::open(&open_path).map_err(storage_err)?;
            apply_pragmas(&conn, &options)?;
            run_migrations(&mut conn)?;
            Ok::<_, WorklyError>(conn)
        })
        .await
        .map_err(|e| WorklyError::Internal(format!("database open task failed: {e}")))??;

        info!(path = %path.display(), "database opened");
        Ok(Self {
            conn: tokio_rusqlite::Connection::from(conn),
            path: Some(path),
        })
    }

    /// Open a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, WorklyError> {
        let conn = tokio::task::spawn_blocking(|| {
            let mut conn = rusqlite::Connection::open_in_memory().map_err(storage_err)?;
            apply_pragmas(
                &conn,
                &OpenOptions {
                    wal_mode: false,
                    ..OpenOptions::default()
                },
            )?;
            run_migrations(&mut conn)?;
            Ok::<_, WorklyError>(conn)
        })
        .await
        .map_err(|e| WorklyError::Internal(format!("database open task failed: {e}")))??;

        Ok(Self {
            conn: tokio_rusqlite::Connection::from(conn),
            path: None,
        })
    }

    /// The underlying single-writer connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Location of the database file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Human-readable storage location used in stats output.
    pub fn location(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string())
    }

    /// Run `f` on the connection thread, mapping failures to [`WorklyError::Storage`].
    pub async fn call<F, R>(&self, f: F) -> Result<R, WorklyError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, rusqlite::Error> + Send + 'static,
        R: Send + 'static,
    {
        self.conn.call(f).await.map_err(map_tr_err)
    }

    /// Rebuild the database file to reclaim free pages.
    pub async fn vacuum(&self) -> Result<(), WorklyError> {
        self.call(|conn| conn.execute_batch("VACUUM;")).await?;
        debug!("vacuum complete");
        Ok(())
    }

    /// Fold the WAL back into the main database file.
    pub async fn checkpoint(&self) -> Result<(), WorklyError> {
        self.call(|conn| conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);"))
            .await
    }

    /// Checkpoint and close the connection.
    pub async fn close(self) -> Result<(), WorklyError> {
        if self.path.is_some() {
            self.checkpoint().await?;
        }
        self.conn.close().await.map_err(map_tr_err)
    }
}

fn apply_pragmas(conn: &rusqlite::Connection, options: &OpenOptions) -> Result<(), WorklyError> {
    conn.busy_timeout(options.busy_timeout)
        .map_err(storage_err)?;
    if options.wal_mode {
        // journal_mode returns the resulting mode as a row.
        let mode: String = conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
            .map_err(storage_err)?;
        debug!(journal_mode = %mode, "journal mode set");
    }
    conn.execute_batch(
        "PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;",
    )
    .map_err(storage_err)
}

fn storage_err(e: rusqlite::Error) -> WorklyError {
    WorklyError::storage(e)
}

/// Convert a tokio-rusqlite error into a [`WorklyError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error) -> WorklyError {
    match e {
        tokio_rusqlite::Error::Error(inner) => storage_err(inner),
        tokio_rusqlite::Error::Close((_, inner)) => storage_err(inner),
        tokio_rusqlite::Error::ConnectionClosed => WorklyError::storage("database connection closed"),
        other => WorklyError::storage(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_parent_directories_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("workly.db");
        let db = Database::open(&path).await.unwrap();
        assert!(path.exists());

        let tables: Vec<String> = db
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();

        for expected in [
            "conversations",
            "embeddings",
            "emotion_history",
            "facts",
            "personality_evolution",
            "personality_traits",
            "segments",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
    }

    #[tokio::test]
    async fn wal_mode_and_foreign_keys_enabled() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("wal.db")).await.unwrap();
        let (mode, fk): (String, i64) = db
            .call(|conn| {
                let mode = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0))?;
                let fk = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0))?;
                Ok((mode, fk))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        assert_eq!(fk, 1);
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("again.db");
        Database::open(&path).await.unwrap().close().await.unwrap();
        let db = Database::open(&path).await.unwrap();
        db.vacuum().await.unwrap();
        assert_eq!(db.location(), path.display().to_string());
    }

    #[tokio::test]
    async fn in_memory_database_has_no_path() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(db.path().is_none());
        assert_eq!(db.location(), ":memory:");
    }

    #[tokio::test]
    async fn closed_connection_reports_storage_error() {
        let db = Database::open_in_memory().await.unwrap();
        let clone = db.clone();
        db.close().await.unwrap();
        let err = clone.call(|conn| conn.execute_batch("SELECT 1;")).await.unwrap_err();
        assert!(err.is_storage());
    }
}
