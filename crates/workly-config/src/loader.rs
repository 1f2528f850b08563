// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./workly.toml` > `~/.config/workly/workly.toml` > `/etc/workly/workly.toml`
//! with environment variable overrides via `WORKLY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WorklyConfig;

/// Config sections recognised in `WORKLY_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &["app", "storage", "memory", "summarizer", "emotion"];

const SYSTEM_CONFIG: &str = "/etc/workly/workly.toml";
const LOCAL_CONFIG: &str = "workly.toml";

/// Path of the per-user config file, if the platform has a config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("workly").join("workly.toml"))
}

/// Config files consulted by [`load_config`], lowest precedence first.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG)];
    paths.extend(user_config_path());
    paths.push(PathBuf::from(LOCAL_CONFIG));
    paths
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/workly/workly.toml` (system-wide)
/// 3. `~/.config/workly/workly.toml` (user XDG config)
/// 4. `./workly.toml` (local directory)
/// 5. `WORKLY_*` environment variables
pub fn load_config() -> Result<WorklyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<WorklyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WorklyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WorklyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WorklyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    config_search_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(WorklyConfig::default())),
            |figment, path| figment.merge(Toml::file(path)),
        )
        .merge(env_provider())
}

/// Create the environment variable provider.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `WORKLY_MEMORY_AUTO_SUMMARIZE_THRESHOLD` maps to
/// `memory.auto_summarize_threshold`.
fn env_provider() -> Env {
    // Figment lowercases keys after mapping, so the mapper sees the raw case.
    Env::prefixed("WORKLY_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
