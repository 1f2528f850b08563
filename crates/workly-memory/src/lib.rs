// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory for the Workly avatar companion.
//!
//! Every chat turn flows through the [`MemoryManager`], which persists it,
//! mines user turns for facts, and periodically folds the open buffer into a
//! summarized segment. Retrieval assembles a token-bounded context blob from
//! relevant segments, a facts digest and the latest turns.
//!
//! ## Architecture
//!
//! - **FactExtractor**: keyword and regex heuristics for entities, preferences, events, relationships
//! - **ConversationSummarizer**: LLM summaries with a deterministic fallback
//! - **SemanticIndex**: optional embedding capability (`EmbedderIndex` or `NoopIndex`)
//! - **MemoryManager**: open buffer, segmentation, search and context assembly
//! - **EmotionMemory**: emotional history and mood trend
//! - **PersonalityEngine**: evolving trait scores and prompt fragment
//! - **OnnxEmbedder** / **ModelManager** (feature `onnx`): local sentence encoder

#[cfg(feature = "onnx")]
pub mod embedder;
pub mod emotion;
pub mod extractor;
pub mod index;
pub mod manager;
#[cfg(feature = "onnx")]
pub mod model_manager;
pub mod personality;
pub mod summarizer;
pub mod types;

#[cfg(feature = "onnx")]
pub use embedder::OnnxEmbedder;
pub use emotion::{EmotionMemory, EmotionStatistics, Pattern, Trend};
pub use extractor::{FactExtraction, FactExtractor};
pub use index::{EmbedderIndex, NoopIndex, SemanticIndex};
pub use manager::{AddedMessage, BufferedTurn, MemoryManager, SegmentOutcome};
#[cfg(feature = "onnx")]
pub use model_manager::{ModelFiles, ModelManager};
pub use personality::{PersonalityEngine, TimeOfDay, TraitSummary};
pub use summarizer::{ConversationSummarizer, KeyPoint};
pub use types::*;
