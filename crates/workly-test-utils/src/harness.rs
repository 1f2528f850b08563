// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end memory tests.
//!
//! `TestHarness` assembles a complete memory stack with mock adapters and a
//! SQLite file inside a temporary directory. The file survives
//! [`TestHarness::reopen`], which makes restart scenarios easy to express.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use workly_config::model::{EmotionConfig, MemoryConfig, SummarizerConfig};
use workly_core::{TextGenerator, WorklyError};
use workly_memory::{
    ConversationSummarizer, EmbedderIndex, EmotionMemory, FactExtractor, MemoryManager, NoopIndex,
    PersonalityEngine, SemanticIndex,
};
use workly_storage::Database;

use crate::mock_embedder::MockEmbedder;
use crate::mock_generator::{FailingGenerator, MockGenerator};

const TEST_USER: &str = "test_user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeneratorKind {
    None,
    Mock,
    Failing,
}

/// Builder for creating test environments with configurable options.
#[derive(Debug, Clone)]
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    generator: GeneratorKind,
    embedder: bool,
    memory: MemoryConfig,
    summarizer: SummarizerConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            generator: GeneratorKind::None,
            embedder: false,
            memory: MemoryConfig::default(),
            summarizer: SummarizerConfig::default(),
        }
    }

    /// Summarize with a [`MockGenerator`] pre-loaded with `responses`.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self.generator = GeneratorKind::Mock;
        self
    }

    /// Summarize with a generator that always fails.
    pub fn with_failing_generator(mut self) -> Self {
        self.generator = GeneratorKind::Failing;
        self
    }

    /// Enable semantic search through [`MockEmbedder`].
    pub fn with_embedder(mut self) -> Self {
        self.embedder = true;
        self
    }

    /// Open-buffer size that triggers a segment.
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.memory.auto_summarize_threshold = threshold;
        self
    }

    /// Fewest turns a segment may be built from.
    pub fn with_min_messages(mut self, min_messages: usize) -> Self {
        self.summarizer.min_messages = min_messages;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, WorklyError> {
        let temp_dir = TempDir::new().map_err(|e| WorklyError::Storage { source: e.into() })?;
        TestHarness::assemble(self, temp_dir).await
    }
}

/// Memory manager over a temporary database, plus the mocks feeding it.
pub struct TestHarness {
    pub manager: MemoryManager,
    /// Present when built with [`TestHarnessBuilder::with_mock_responses`].
    pub generator: Option<Arc<MockGenerator>>,
    settings: TestHarnessBuilder,
    temp_dir: TempDir,
}

impl TestHarness {
    /// Create a builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    async fn assemble(settings: TestHarnessBuilder, temp_dir: TempDir) -> Result<Self, WorklyError> {
        let db = Database::open(temp_dir.path().join("workly.db")).await?;

        let mut generator = None;
        let text_generator: Option<Arc<dyn TextGenerator>> = match settings.generator {
            GeneratorKind::None => None,
            GeneratorKind::Mock => {
                let mock = Arc::new(MockGenerator::with_responses(settings.responses.clone()));
                generator = Some(mock.clone());
                Some(mock)
            }
            GeneratorKind::Failing => Some(Arc::new(FailingGenerator)),
        };
        let index: Arc<dyn SemanticIndex> = if settings.embedder {
            Arc::new(EmbedderIndex::new(Arc::new(MockEmbedder::new())))
        } else {
            Arc::new(NoopIndex)
        };

        let summarizer = ConversationSummarizer::new(settings.summarizer.clone(), text_generator);
        let manager = MemoryManager::new(
            db,
            summarizer,
            index,
            Arc::new(FactExtractor::new()),
            settings.memory.clone(),
        )
        .await?
        .with_identity(TEST_USER, "test");

        Ok(Self {
            manager,
            generator,
            settings,
            temp_dir,
        })
    }

    /// Drop the manager and build a fresh one over the same database file.
    ///
    /// The open buffer is lost, exactly as on a process restart.
    pub async fn reopen(self) -> Result<Self, WorklyError> {
        let Self {
            manager,
            settings,
            temp_dir,
            ..
        } = self;
        drop(manager);
        Self::assemble(settings, temp_dir).await
    }

    pub fn database(&self) -> &Database {
        self.manager.database()
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("workly.db")
    }

    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Emotional memory for the harness user over the same store.
    pub fn emotions(&self) -> EmotionMemory {
        EmotionMemory::new(self.database().clone(), TEST_USER, EmotionConfig::default())
    }

    /// Personality engine over the same store, seeded with defaults.
    pub async fn personality(&self) -> Result<PersonalityEngine, WorklyError> {
        PersonalityEngine::load(self.database().clone()).await
    }
}
