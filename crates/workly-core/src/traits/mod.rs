// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between the memory core and its pluggable collaborators.

pub mod adapter;
pub mod embedding;
pub mod generator;

pub use adapter::{PluginAdapter, StorageAdapter};
pub use embedding::EmbeddingAdapter;
pub use generator::{FnGenerator, TextGenerator};
