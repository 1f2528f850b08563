// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text generation trait used by the conversation summarizer.
//!
//! The memory core treats the LLM as an opaque `prompt -> text` collaborator.
//! It is supplied once at construction time and used only for summaries and
//! key points.

use async_trait::async_trait;

use crate::error::WorklyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{AdapterType, HealthStatus};

/// Opaque text-generation collaborator.
#[async_trait]
pub trait TextGenerator: PluginAdapter {
    /// Generate a completion for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String, WorklyError>;
}

/// Adapts a plain synchronous callback into a [`TextGenerator`].
///
/// Useful when the caller already owns a local inference binding exposing
/// a `prompt -> text` function.
pub struct FnGenerator<F> {
    name: String,
    callback: F,
}

impl<F> FnGenerator<F>
where
    F: Fn(&str) -> Result<String, WorklyError> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

#[async_trait]
impl<F> PluginAdapter for FnGenerator<F>
where
    F: Fn(&str) -> Result<String, WorklyError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generator
    }

    async fn health_check(&self) -> Result<HealthStatus, WorklyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WorklyError> {
        Ok(())
    }
}

#[async_trait]
impl<F> TextGenerator for FnGenerator<F>
where
    F: Fn(&str) -> Result<String, WorklyError> + Send + Sync + 'static,
{
    async fn generate(&self, prompt: &str) -> Result<String, WorklyError> {
        (self.callback)(prompt)
    }
}
