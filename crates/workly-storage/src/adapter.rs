// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use workly_config::model::StorageConfig;
use workly_core::{AdapterType, HealthStatus, PluginAdapter, StorageAdapter, WorklyError};

use crate::database::{Database, OpenOptions};

/// SQLite-backed storage adapter.
///
/// Owns the process-wide [`Database`] handle. The file is opened on the
/// first call to [`StorageAdapter::initialize`]; afterwards [`database`]
/// hands out clones for the memory manager and its sibling subsystems.
///
/// [`database`]: SqliteStorage::database
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    ///
    /// [`initialize`]: StorageAdapter::initialize
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// The shared database handle, or an error if not initialized.
    pub fn database(&self) -> Result<Database, WorklyError> {
        self.db.get().cloned().ok_or_else(|| WorklyError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, WorklyError> {
        let db = self.database()?;
        db.call(|conn| conn.execute_batch("SELECT 1;")).await?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WorklyError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), WorklyError> {
        let options = OpenOptions::from(&self.config);
        let db = Database::open_with(&self.config.database_path, &options).await?;
        self.db.set(db).map_err(|_| WorklyError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), WorklyError> {
        self.database()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
