// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Workly memory core.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, typed async operations for
//! conversation turns, facts, segments, embeddings, emotion history and
//! personality traits, and the one-time legacy JSON import.

pub mod adapter;
pub mod database;
pub mod legacy;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod writer;

pub use adapter::SqliteStorage;
pub use database::{Database, OpenOptions};
pub use legacy::{JsonMigrator, MigrationReport};
pub use models::*;
