// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedder for semantic-search tests.
//!
//! Each lowercase word is hashed with SHA-256 into one signed bucket, and
//! the bucket counts are L2-normalised. Texts sharing words score a high
//! cosine similarity; unrelated texts land near zero.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use workly_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use workly_core::{EmbeddingAdapter, PluginAdapter, WorklyError};

pub const DEFAULT_DIMENSIONS: usize = 64;

/// Hashed bag-of-words embedder.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Encode one text.
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2)
        {
            let digest = Sha256::digest(word.as_bytes());
            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(head) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
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
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, WorklyError> {
        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| self.vector(t)).collect(),
            dimensions: self.dimensions,
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn same_text_same_vector() {
        let embedder = MockEmbedder::new();
        let a = embedder.vector("Python est génial");
        assert_eq!(a, embedder.vector("python EST génial"));
        assert!((dot(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let embedder = MockEmbedder::with_dimensions(8);
        assert_eq!(embedder.vector("a b"), vec![0.0; 8]);
    }

    #[tokio::test]
    async fn embed_reports_dimensions() {
        let embedder = MockEmbedder::with_dimensions(16);
        let out = embedder
            .embed(EmbeddingInput {
                texts: vec!["un".into(), "deux".into()],
            })
            .await
            .unwrap();
        assert_eq!(out.dimensions, 16);
        assert_eq!(out.embeddings.len(), 2);
        assert!(out.embeddings.iter().all(|v| v.len() == 16));
    }
}
