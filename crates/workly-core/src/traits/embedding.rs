// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text-to-vector models.

use async_trait::async_trait;

use crate::error::WorklyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EmbeddingInput, EmbeddingOutput};

/// A sentence encoder. Vectors from one instance all share [`dimensions`].
///
/// [`dimensions`]: EmbeddingAdapter::dimensions
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Encode a batch, one vector per input text, in order.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, WorklyError>;

    fn dimensions(&self) -> usize;

    /// Encode a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, WorklyError> {
        let output = self
            .embed(EmbeddingInput {
                texts: vec![text.to_string()],
            })
            .await?;
        output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| WorklyError::Embedding {
                message: format!("{} returned no embedding", self.name()),
            })
    }
}
