// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity and lifecycle shared by every pluggable collaborator.

use async_trait::async_trait;

use crate::error::WorklyError;
use crate::types::{AdapterType, HealthStatus};

/// Common surface of the store, embedding models and text generators.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    async fn health_check(&self) -> Result<HealthStatus, WorklyError>;

    /// Release held resources. Called once, at process exit.
    async fn shutdown(&self) -> Result<(), WorklyError>;

    /// `name@version`, as shown in logs and diagnostics.
    fn label(&self) -> String {
        format!("{}@{}", self.name(), self.version())
    }
}

/// Backend owning the memory database.
///
/// One instance is opened per process; the memory manager, emotion memory
/// and personality engine all share its connection.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Open the connection and bring the schema up to date.
    async fn initialize(&self) -> Result<(), WorklyError>;

    /// Flush the write-ahead log. The adapter may not be used afterwards.
    async fn close(&self) -> Result<(), WorklyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;

    #[async_trait]
    impl PluginAdapter for Probe {
        fn name(&self) -> &str {
            "probe"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(1, 2, 3)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Storage
        }
        async fn health_check(&self) -> Result<HealthStatus, WorklyError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), WorklyError> {
            Ok(())
        }
    }

    #[test]
    fn label_joins_name_and_version() {
        assert_eq!(Probe.label(), "probe@1.2.3");
    }
}
