// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Workly configuration system.

use figment::Jail;
use workly_config::diagnostic::ConfigError;
use workly_config::{load_and_validate, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_workly_config() {
    let toml = r#"
[app]
log_level = "debug"
user_id = "kira_owner"
source = "discord"

[storage]
database_path = "/tmp/workly-test.db"
wal_mode = false
busy_timeout_ms = 250
legacy_json_dir = "/tmp/legacy"

[memory]
enabled = true
auto_summarize_threshold = 30
search_top_k = 4
min_similarity = 0.5
context_segments = 1
context_max_tokens = 800
embedding_model = "all-MiniLM-L6-v2"
model_dir = "/opt/models"

[summarizer]
min_messages = 6
max_summary_chars = 300
max_keypoints = 3
generation_timeout_secs = 10

[emotion]
max_entries = 50
trend_window = 4
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.app.log_level, "debug");
    assert_eq!(config.app.user_id, "kira_owner");
    assert_eq!(config.app.source, "discord");
    assert_eq!(config.storage.database_path, "/tmp/workly-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.storage.busy_timeout_ms, 250);
    assert_eq!(config.memory.auto_summarize_threshold, 30);
    assert_eq!(config.memory.search_top_k, 4);
    assert_eq!(config.memory.model_dir.as_deref(), Some("/opt/models"));
    assert_eq!(config.summarizer.min_messages, 6);
    assert_eq!(config.summarizer.max_keypoints, 3);
    assert_eq!(config.emotion.trend_window, 4);
}

/// Unknown key in [memory] produces an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_key_produces_suggestion() {
    let toml = r#"
[memory]
auto_sumarize_threshold = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { key, suggestion: Some(s), .. }
            if key == "auto_sumarize_threshold" && s == "auto_summarize_threshold"
    )));
}

/// Wrong value type is reported as InvalidType.
#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[memory]
search_top_k = "three"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject wrong type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("search_top_k")))
    );
}

/// Semantic validation runs after successful deserialization.
#[test]
fn semantic_validation_runs_after_parse() {
    let toml = r#"
[memory]
auto_summarize_threshold = 2
"#;

    let errors = load_and_validate_str(toml).expect_err("threshold below minimum");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { .. }))
    );
}

/// Empty input yields the defaults.
#[test]
fn empty_toml_yields_defaults() {
    let config = load_and_validate_str("").expect("defaults are valid");
    assert_eq!(config.memory.auto_summarize_threshold, 20);
    assert_eq!(config.app.user_id, "desktop_user");
}

/// Environment variables override file values using the section mapping.
#[test]
fn env_overrides_local_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "workly.toml",
            r#"
[memory]
auto_summarize_threshold = 25
search_top_k = 2
"#,
        )?;
        jail.set_env("WORKLY_MEMORY_AUTO_SUMMARIZE_THRESHOLD", "40");
        jail.set_env("WORKLY_APP_USER_ID", "bot_user");

        let config = load_and_validate().map_err(|errors| {
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        })?;
        assert_eq!(config.memory.auto_summarize_threshold, 40);
        assert_eq!(config.memory.search_top_k, 2);
        assert_eq!(config.app.user_id, "bot_user");
        Ok(())
    });
}
