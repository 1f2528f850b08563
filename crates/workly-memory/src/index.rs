// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic index abstraction over an optional embedding model.
//!
//! The memory manager picks an implementation once at construction time and
//! branches on [`SemanticIndex::is_available`] instead of probing for the
//! model on every call.

use std::sync::Arc;

use async_trait::async_trait;
use workly_core::types::preview;
use workly_core::{EmbeddingAdapter, WorklyError};
use workly_storage::StoredEmbedding;

use crate::types::{SearchResult, cosine_similarity};

/// Characters of source text carried in a search hit.
pub const TEXT_PREVIEW_CHARS: usize = 200;

/// Text-to-vector capability used for segment search.
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    /// Whether [`encode`](Self::encode) can produce vectors.
    fn is_available(&self) -> bool;

    /// Encode one text into a fixed-length vector.
    async fn encode(&self, text: &str) -> Result<Vec<f32>, WorklyError>;

    /// Vector length, or 0 when unavailable.
    fn dimensions(&self) -> usize;

    /// Name reported in stats.
    fn model_name(&self) -> &str;
}

/// Index backed by any [`EmbeddingAdapter`].
pub struct EmbedderIndex {
    adapter: Arc<dyn EmbeddingAdapter>,
}

impl EmbedderIndex {
    pub fn new(adapter: Arc<dyn EmbeddingAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl SemanticIndex for EmbedderIndex {
    fn is_available(&self) -> bool {
        true
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>, WorklyError> {
        self.adapter.embed_one(text).await
    }

    fn dimensions(&self) -> usize {
        self.adapter.dimensions()
    }

    fn model_name(&self) -> &str {
        self.adapter.name()
    }
}

/// Index used when no embedding model is installed. Never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIndex;

#[async_trait]
impl SemanticIndex for NoopIndex {
    fn is_available(&self) -> bool {
        false
    }

    async fn encode(&self, _text: &str) -> Result<Vec<f32>, WorklyError> {
        Err(WorklyError::Embedding {
            message: "no embedding model configured".into(),
        })
    }

    fn dimensions(&self) -> usize {
        0
    }

    fn model_name(&self) -> &str {
        "none"
    }
}

/// Score stored embeddings against a query vector.
///
/// Hits below `min_similarity` are dropped; the rest are sorted by
/// descending similarity and truncated to `top_k`. Ties keep store order.
pub fn rank(
    query: &[f32],
    embeddings: &[StoredEmbedding],
    top_k: usize,
    min_similarity: f32,
) -> Vec<SearchResult> {
    let mut hits: Vec<SearchResult> = embeddings
        .iter()
        .map(|e| (e, cosine_similarity(query, &e.vector)))
        .filter(|(_, similarity)| *similarity >= min_similarity)
        .map(|(e, similarity)| SearchResult {
            id: e.id,
            segment_id: e.segment_id,
            similarity,
            text_preview: preview(&e.text, TEXT_PREVIEW_CHARS),
            timestamp: e.timestamp.clone(),
        })
        .collect();

    hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    hits.truncate(top_k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use workly_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
    use workly_core::PluginAdapter;

    fn stored(id: i64, vector: Vec<f32>, text: &str) -> StoredEmbedding {
        StoredEmbedding {
            id,
            conversation_id: None,
            segment_id: Some(id * 10),
            vector,
            text: text.to_string(),
            timestamp: format!("2026-01-0{id}T00:00:00.000Z"),
        }
    }

    struct AxisEmbedder;

    #[async_trait]
    impl PluginAdapter for AxisEmbedder {
        fn name(&self) -> &str {
            "axis"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Embedding
        }
        async fn health_check(&self) -> Result<HealthStatus, WorklyError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), WorklyError> {
            Ok(())
        }
    }

    #[async_trait]
    impl EmbeddingAdapter for AxisEmbedder {
        async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, WorklyError> {
            Ok(EmbeddingOutput {
                embeddings: input
                    .texts
                    .iter()
                    .map(|t| vec![t.len() as f32, 1.0])
                    .collect(),
                dimensions: 2,
            })
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn embedder_index_encodes_one_text() {
        let index = EmbedderIndex::new(Arc::new(AxisEmbedder));
        assert!(index.is_available());
        assert_eq!(index.dimensions(), 2);
        assert_eq!(index.model_name(), "axis");
        assert_eq!(index.encode("abc").await.unwrap(), vec![3.0, 1.0]);
    }

    #[tokio::test]
    async fn noop_index_is_unavailable() {
        let index = NoopIndex;
        assert!(!index.is_available());
        assert_eq!(index.dimensions(), 0);
        let err = index.encode("x").await.unwrap_err();
        assert!(matches!(err, WorklyError::Embedding { .. }));
    }

    #[test]
    fn rank_filters_sorts_and_truncates() {
        let embeddings = vec![
            stored(1, vec![0.0, 1.0], "orthogonal"),
            stored(2, vec![1.0, 0.1], "close"),
            stored(3, vec![1.0, 0.0], "exact"),
            stored(4, vec![-1.0, 0.0], "opposite"),
        ];
        let hits = rank(&[1.0, 0.0], &embeddings, 2, 0.3);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text_preview, "exact");
        assert_eq!(hits[0].id, 3);
        assert_eq!(hits[0].segment_id, Some(30));
        assert_eq!(hits[1].text_preview, "close");
        assert!(hits[0].similarity >= hits[1].similarity);
    }

    #[test]
    fn rank_applies_min_similarity() {
        let embeddings = vec![stored(1, vec![0.0, 1.0], "orthogonal")];
        assert!(rank(&[1.0, 0.0], &embeddings, 5, 0.3).is_empty());
        assert_eq!(rank(&[1.0, 0.0], &embeddings, 5, -1.0).len(), 1);
    }

    #[test]
    fn rank_previews_long_text() {
        let long = "x".repeat(500);
        let hits = rank(&[1.0], &[stored(1, vec![1.0], &long)], 1, 0.0);
        assert_eq!(hits[0].text_preview.chars().count(), TEXT_PREVIEW_CHARS + 3);
    }
}
