// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local sentence-embedding model running on ONNX Runtime.
//!
//! Mean-pools the last hidden state over the attention mask and
//! L2-normalises the result, matching sentence-transformers output.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ndarray::Array2;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;
use workly_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use workly_core::{EmbeddingAdapter, PluginAdapter, WorklyError};

use crate::model_manager::ModelFiles;

fn embedding_err(context: &str, e: impl std::fmt::Display) -> WorklyError {
    WorklyError::Embedding {
        message: format!("{context}: {e}"),
    }
}

/// Sentence encoder backed by an ONNX session and a HuggingFace tokenizer.
pub struct OnnxEmbedder {
    name: String,
    /// `Session::run` needs `&mut`, so calls are serialised.
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    dimensions: usize,
}

// SAFETY: the session is only reached through the mutex and the tokenizer
// is only used for `&self` encoding.
unsafe impl Send for OnnxEmbedder {}
unsafe impl Sync for OnnxEmbedder {}

impl OnnxEmbedder {
    /// Load the model and tokenizer, then probe the output width once.
    pub fn load(name: impl Into<String>, files: &ModelFiles) -> Result<Self, WorklyError> {
        let tokenizer = tokenizers::Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| embedding_err(&format!("loading {}", files.tokenizer.display()), e))?;
        let session = build_session(&files.model)?;

        let mut embedder = Self {
            name: name.into(),
            session: Mutex::new(session),
            tokenizer,
            dimensions: 0,
        };
        embedder.dimensions = embedder.embed_text("workly")?.len();
        Ok(embedder)
    }

    /// Encode one text into a normalised vector.
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, WorklyError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| embedding_err("tokenization failed", e))?;

        let widen = |values: &[u32]| values.iter().map(|&v| i64::from(v)).collect::<Vec<i64>>();
        let input_ids = widen(encoding.get_ids());
        let attention_mask = widen(encoding.get_attention_mask());
        let type_ids = widen(encoding.get_type_ids());
        let seq_len = input_ids.len();

        let as_batch = |values: Vec<i64>, what: &str| {
            Array2::from_shape_vec((1, seq_len), values).map_err(|e| embedding_err(what, e))
        };
        let input_ids = as_batch(input_ids, "input_ids shape")?;
        let mask = as_batch(attention_mask.clone(), "attention_mask shape")?;
        let type_ids = as_batch(type_ids, "token_type_ids shape")?;

        let input_ids = TensorRef::from_array_view(&input_ids)
            .map_err(|e| embedding_err("input_ids tensor", e))?;
        let mask = TensorRef::from_array_view(&mask)
            .map_err(|e| embedding_err("attention_mask tensor", e))?;
        let type_ids = TensorRef::from_array_view(&type_ids)
            .map_err(|e| embedding_err("token_type_ids tensor", e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| embedding_err("onnx session poisoned", e))?;
        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => mask,
                "token_type_ids" => type_ids
            ])
            .map_err(|e| embedding_err("onnx inference failed", e))?;

        // Last hidden state: [1, seq_len, hidden].
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| embedding_err("reading output tensor", e))?;
        let hidden = shape.last().copied().unwrap_or(0) as usize;

        Ok(l2_normalize(mean_pool(data, &attention_mask, hidden)))
    }
}

fn build_session(model: &Path) -> Result<Session, WorklyError> {
    Session::builder()
        .map_err(|e| embedding_err("onnx session builder", e))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| embedding_err("onnx optimization level", e))?
        .with_intra_threads(1)
        .map_err(|e| embedding_err("onnx thread count", e))?
        .commit_from_file(model)
        .map_err(|e| embedding_err(&format!("loading {}", model.display()), e))
}

/// Average the token vectors whose mask is set.
fn mean_pool(hidden_states: &[f32], mask: &[i64], hidden: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden];
    if hidden == 0 {
        return pooled;
    }
    let mut kept = 0usize;
    for (token, row) in hidden_states.chunks_exact(hidden).enumerate() {
        if mask.get(token).copied().unwrap_or(0) == 0 {
            continue;
        }
        for (acc, value) in pooled.iter_mut().zip(row) {
            *acc += value;
        }
        kept += 1;
    }
    if kept > 0 {
        pooled.iter_mut().for_each(|v| *v /= kept as f32);
    }
    pooled
}

fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

#[async_trait]
impl PluginAdapter for OnnxEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, WorklyError> {
        match self.session.lock() {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("onnx session poisoned: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), WorklyError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for OnnxEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, WorklyError> {
        let embeddings = input
            .texts
            .iter()
            .map(|text| self.embed_text(text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EmbeddingOutput {
            embeddings,
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

    #[test]
    fn normalize_scales_to_unit_length() {
        let n = l2_normalize(vec![3.0, 4.0]);
        assert!((n[0] - 0.6).abs() < 1e-6);
        assert!((n[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_zero_vector() {
        assert_eq!(l2_normalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn mean_pool_skips_padding() {
        let states = [9.0, 9.0, 1.0, 3.0, 3.0, 5.0];
        let pooled = mean_pool(&states, &[0, 1, 1], 2);
        assert_eq!(pooled, vec![2.0, 4.0]);
    }

    #[test]
    fn mean_pool_all_masked_is_zero() {
        assert_eq!(mean_pool(&[1.0, 2.0], &[0], 2), vec![0.0, 0.0]);
        assert!(mean_pool(&[], &[], 0).is_empty());
    }
}
