// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Workly integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without a language model or an
//! embedding model download.
//!
//! # Components
//!
//! - [`MockGenerator`] - Text generator with pre-configured responses
//! - [`FailingGenerator`] - Text generator that always errors
//! - [`MockEmbedder`] - Hashed bag-of-words embedder
//! - [`TestHarness`] - Memory manager over a temporary SQLite file

pub mod harness;
pub mod mock_embedder;
pub mod mock_generator;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_embedder::MockEmbedder;
pub use mock_generator::{FailingGenerator, MockGenerator};
