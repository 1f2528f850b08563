// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of the memory subsystems from configuration.

use std::sync::Arc;

use workly_config::WorklyConfig;
use workly_core::WorklyError;
use workly_memory::{
    ConversationSummarizer, EmotionMemory, FactExtractor, MemoryManager, NoopIndex,
    PersonalityEngine, SemanticIndex,
};
use workly_storage::{Database, OpenOptions};

/// Open the configured database, running migrations.
pub async fn open_database(config: &WorklyConfig) -> Result<Database, WorklyError> {
    let options = OpenOptions::from(&config.storage);
    Database::open_with(&config.storage.database_path, &options).await
}

/// Memory manager over `db` for the configured user.
///
/// The CLI has no language model attached, so summaries use the
/// deterministic fallback.
pub async fn memory_manager(config: &WorklyConfig, db: Database) -> Result<MemoryManager, WorklyError> {
    let summarizer = ConversationSummarizer::new(config.summarizer.clone(), None);
    let manager = MemoryManager::new(
        db,
        summarizer,
        semantic_index(config).await,
        Arc::new(FactExtractor::new()),
        config.memory.clone(),
    )
    .await?;
    Ok(manager.with_identity(config.app.user_id.clone(), config.app.source.clone()))
}

pub fn emotion_memory(config: &WorklyConfig, db: Database) -> EmotionMemory {
    EmotionMemory::new(db, config.app.user_id.clone(), config.emotion.clone())
}

pub async fn personality(db: Database) -> Result<PersonalityEngine, WorklyError> {
    PersonalityEngine::load(db).await
}

#[cfg(feature = "onnx")]
async fn semantic_index(config: &WorklyConfig) -> Arc<dyn SemanticIndex> {
    use std::path::PathBuf;
    use workly_memory::{EmbedderIndex, ModelManager, OnnxEmbedder};

    let model_root = config
        .memory
        .model_dir
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| dirs::data_dir().map(|d| d.join("workly")))
        .unwrap_or_else(|| PathBuf::from("."));
    let models = ModelManager::new(model_root, config.memory.embedding_model.clone());

    let loaded = match models.ensure_model().await {
        Ok(files) => OnnxEmbedder::load(config.memory.embedding_model.clone(), &files),
        Err(e) => Err(e),
    };
    match loaded {
        Ok(embedder) => Arc::new(EmbedderIndex::new(Arc::new(embedder))),
        Err(e) => {
            tracing::warn!(error = %e, "embedding model unavailable, semantic search disabled");
            Arc::new(NoopIndex)
        }
    }
}

#[cfg(not(feature = "onnx"))]
async fn semantic_index(_config: &WorklyConfig) -> Arc<dyn SemanticIndex> {
    Arc::new(NoopIndex)
}
