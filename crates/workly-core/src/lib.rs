// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Workly memory core.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Workly workspace. Storage backends,
//! embedding models and text generators implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::WorklyError;
pub use types::{AdapterType, EmotionSource, FactCategory, HealthStatus, Role};

pub use traits::{EmbeddingAdapter, FnGenerator, PluginAdapter, StorageAdapter, TextGenerator};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workly_error_has_all_variants() {
        let _config = WorklyError::Config("test".into());
        let _validation = WorklyError::Validation("test".into());
        let storage = WorklyError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _provider = WorklyError::Provider {
            message: "test".into(),
            source: None,
        };
        let _embedding = WorklyError::Embedding {
            message: "test".into(),
        };
        let _health = WorklyError::HealthCheckFailed {
            name: "test".into(),
            source: Box::new(std::io::Error::other("test")),
        };
        let timeout = WorklyError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = WorklyError::Internal("test".into());

        assert!(storage.is_storage());
        assert!(!timeout.is_storage());
    }

    #[test]
    fn adapter_type_display_roundtrip() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Storage,
            AdapterType::Embedding,
            AdapterType::Generator,
        ] {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).expect("should serialize");
        assert_eq!(json, "\"assistant\"");
        let parsed: Role = serde_json::from_str("\"user\"").expect("should deserialize");
        assert_eq!(parsed, Role::User);
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        let degraded = HealthStatus::Degraded("slow".into());
        let unhealthy = HealthStatus::Unhealthy("down".into());

        assert_eq!(healthy, HealthStatus::Healthy);
        assert_ne!(degraded, healthy);
        assert_ne!(unhealthy, healthy);
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_embedding_adapter<T: EmbeddingAdapter>() {}
        fn _assert_text_generator<T: TextGenerator>() {}
    }
}
