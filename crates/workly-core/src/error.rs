// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The one error type shared by every Workly crate.

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Failure of any memory-core operation.
///
/// Callers usually care about three classes: [`Validation`] (bad input,
/// nothing written), [`Storage`] (the database refused, worth a retry) and
/// everything else, which the memory subsystems log and degrade around.
///
/// [`Validation`]: WorklyError::Validation
/// [`Storage`]: WorklyError::Storage
#[derive(Debug, Error)]
pub enum WorklyError {
    /// Unreadable or inconsistent configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Input rejected before any write: unknown role or category, out-of-range score.
    #[error("validation error: {0}")]
    Validation(String),

    /// SQLite, filesystem or connection-thread failure.
    #[error("storage error: {source}")]
    Storage { source: BoxedSource },

    /// The text generator failed or returned nothing usable.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<BoxedSource>,
    },

    /// Model missing, tokenizer or inference failure.
    #[error("embedding error: {message}")]
    Embedding { message: String },

    #[error("health check failed for {name}: {source}")]
    HealthCheckFailed { name: String, source: BoxedSource },

    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    #[error("internal error: {0}")]
    Internal(String),
}

impl WorklyError {
    /// Wrap any error as a storage failure.
    pub fn storage(source: impl Into<BoxedSource>) -> Self {
        WorklyError::Storage {
            source: source.into(),
        }
    }

    /// True for persistence failures; the turn may be retried.
    pub fn is_storage(&self) -> bool {
        matches!(self, WorklyError::Storage { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, WorklyError::Validation(_))
    }
}
