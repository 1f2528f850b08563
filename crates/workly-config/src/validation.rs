// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the semantic constraints serde cannot express, such as the
//! segmentation threshold never being smaller than the summarizer minimum.

use crate::diagnostic::ConfigError;
use crate::model::WorklyConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &WorklyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.app.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "app.log_level `{}` must be one of {}",
                config.app.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    for (key, value) in [
        ("app.user_id", &config.app.user_id),
        ("app.source", &config.app.source),
        ("storage.database_path", &config.storage.database_path),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{key} must not be empty"),
            });
        }
    }

    let summarizer = &config.summarizer;
    if summarizer.min_messages == 0 {
        errors.push(out_of_range(
            "summarizer.min_messages",
            summarizer.min_messages,
            ">= 1",
        ));
    }

    if summarizer.max_summary_chars == 0 {
        errors.push(out_of_range(
            "summarizer.max_summary_chars",
            summarizer.max_summary_chars,
            ">= 1",
        ));
    }

    if summarizer.generation_timeout_secs == 0 {
        errors.push(out_of_range(
            "summarizer.generation_timeout_secs",
            summarizer.generation_timeout_secs,
            ">= 1",
        ));
    }

    let memory = &config.memory;
    // A threshold below the minimum would trigger flushes that can never succeed.
    if memory.auto_summarize_threshold < summarizer.min_messages {
        errors.push(ConfigError::Validation {
            message: format!(
                "memory.auto_summarize_threshold ({}) must be at least summarizer.min_messages ({})",
                memory.auto_summarize_threshold, summarizer.min_messages
            ),
        });
    }

    if !(-1.0..=1.0).contains(&memory.min_similarity) {
        errors.push(out_of_range(
            "memory.min_similarity",
            memory.min_similarity,
            "-1.0 ..= 1.0",
        ));
    }

    if memory.search_top_k == 0 {
        errors.push(out_of_range("memory.search_top_k", memory.search_top_k, ">= 1"));
    }

    if memory.context_max_tokens == 0 {
        errors.push(out_of_range(
            "memory.context_max_tokens",
            memory.context_max_tokens,
            ">= 1",
        ));
    }

    if config.emotion.trend_window == 0 {
        errors.push(out_of_range(
            "emotion.trend_window",
            config.emotion.trend_window,
            ">= 1",
        ));
    }

    if config.emotion.max_entries < config.emotion.trend_window * 2 {
        errors.push(ConfigError::Validation {
            message: format!(
                "emotion.max_entries ({}) must hold two trend windows ({})",
                config.emotion.max_entries,
                config.emotion.trend_window * 2
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn out_of_range(key: &str, value: impl ToString, range: &str) -> ConfigError {
    ConfigError::OutOfRange {
        key: key.to_string(),
        value: value.to_string(),
        range: range.to_string(),
    }
}
