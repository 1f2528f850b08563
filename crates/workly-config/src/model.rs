// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Workly memory core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Workly configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorklyConfig {
    /// Application identity and logging.
    #[serde(default)]
    pub app: AppConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Long-term memory settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Conversation summarizer settings.
    #[serde(default)]
    pub summarizer: SummarizerConfig,

    /// Emotional memory settings.
    #[serde(default)]
    pub emotion: EmotionConfig,
}

/// Application identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Identifier recorded on every stored turn and emotion.
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Channel tag recorded on every stored turn (`desktop`, `discord`, ...).
    #[serde(default = "default_source")]
    pub source: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            user_id: default_user_id(),
            source: default_source(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_user_id() -> String {
    "desktop_user".to_string()
}

fn default_source() -> String {
    "desktop".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a writer waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Directory holding the legacy JSON memory files.
    #[serde(default = "default_legacy_json_dir")]
    pub legacy_json_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
            legacy_json_dir: default_legacy_json_dir(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("workly").join("workly.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("workly.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_legacy_json_dir() -> String {
    "data/memory".to_string()
}

/// Long-term memory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Enable the memory system. When false, turns are not recorded.
    #[serde(default = "default_memory_enabled")]
    pub enabled: bool,

    /// Open-buffer size that triggers segment creation.
    #[serde(default = "default_auto_summarize_threshold")]
    pub auto_summarize_threshold: usize,

    /// Default number of results for semantic search.
    #[serde(default = "default_search_top_k")]
    pub search_top_k: usize,

    /// Minimum cosine similarity for a search hit (-1.0 to 1.0).
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Number of prior segments injected into the prompt context.
    #[serde(default = "default_context_segments")]
    pub context_segments: usize,

    /// Default token budget for the assembled context blob.
    #[serde(default = "default_context_max_tokens")]
    pub context_max_tokens: usize,

    /// Name of the embedding model to use.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Directory for downloaded model files. Defaults to the data directory.
    #[serde(default)]
    pub model_dir: Option<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_memory_enabled(),
            auto_summarize_threshold: default_auto_summarize_threshold(),
            search_top_k: default_search_top_k(),
            min_similarity: default_min_similarity(),
            context_segments: default_context_segments(),
            context_max_tokens: default_context_max_tokens(),
            embedding_model: default_embedding_model(),
            model_dir: None,
        }
    }
}

fn default_memory_enabled() -> bool {
    true
}

fn default_auto_summarize_threshold() -> usize {
    20
}

fn default_search_top_k() -> usize {
    3
}

fn default_min_similarity() -> f32 {
    0.3
}

fn default_context_segments() -> usize {
    2
}

fn default_context_max_tokens() -> usize {
    1000
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

/// Conversation summarizer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SummarizerConfig {
    /// Fewest messages a segment may be summarized from.
    #[serde(default = "default_min_messages")]
    pub min_messages: usize,

    /// Hard cap on summary length, in characters.
    #[serde(default = "default_max_summary_chars")]
    pub max_summary_chars: usize,

    /// Maximum number of key points kept per summary.
    #[serde(default = "default_max_keypoints")]
    pub max_keypoints: usize,

    /// Seconds to wait for the text generator before falling back.
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            min_messages: default_min_messages(),
            max_summary_chars: default_max_summary_chars(),
            max_keypoints: default_max_keypoints(),
            generation_timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_min_messages() -> usize {
    5
}

fn default_max_summary_chars() -> usize {
    500
}

fn default_max_keypoints() -> usize {
    5
}

fn default_generation_timeout_secs() -> u64 {
    30
}

/// Emotional memory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmotionConfig {
    /// Number of most recent entries considered by the analyses.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Window size used by trend detection.
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            trend_window: default_trend_window(),
        }
    }
}

fn default_max_entries() -> usize {
    100
}

fn default_trend_window() -> usize {
    5
}
