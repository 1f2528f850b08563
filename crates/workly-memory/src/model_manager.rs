// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! First-run download of the sentence-embedding model.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::info;
use workly_core::WorklyError;

const HF_BASE: &str = "https://huggingface.co";

/// Paths of a downloaded model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub model: PathBuf,
    pub tokenizer: PathBuf,
}

/// Resolves and fetches model files under `<data_dir>/models/<model>`.
pub struct ModelManager {
    data_dir: PathBuf,
    model_name: String,
    /// Serialises concurrent first-run downloads.
    download_lock: Mutex<()>,
}

impl ModelManager {
    pub fn new(data_dir: impl Into<PathBuf>, model_name: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            model_name: model_name.into(),
            download_lock: Mutex::new(()),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model_dir(&self) -> PathBuf {
        self.data_dir.join("models").join(&self.model_name)
    }

    pub fn files(&self) -> ModelFiles {
        let dir = self.model_dir();
        ModelFiles {
            model: dir.join("model.onnx"),
            tokenizer: dir.join("tokenizer.json"),
        }
    }

    pub fn is_available(&self) -> bool {
        let files = self.files();
        files.model.exists() && files.tokenizer.exists()
    }

    fn sources(&self) -> [(PathBuf, String); 2] {
        let files = self.files();
        [
            (
                files.model,
                format!(
                    "{HF_BASE}/onnx-community/{}-ONNX/resolve/main/onnx/model_quantized.onnx",
                    self.model_name
                ),
            ),
            (
                files.tokenizer,
                format!(
                    "{HF_BASE}/sentence-transformers/{}/resolve/main/tokenizer.json",
                    self.model_name
                ),
            ),
        ]
    }

    /// Download any missing file and return the model paths.
    pub async fn ensure_model(&self) -> Result<ModelFiles, WorklyError> {
        let _guard = self.download_lock.lock().await;
        if self.is_available() {
            return Ok(self.files());
        }

        let dir = self.model_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| WorklyError::Embedding {
                message: format!("creating {}: {e}", dir.display()),
            })?;

        for (dest, url) in self.sources() {
            if dest.exists() {
                continue;
            }
            info!(model = %self.model_name, url = %url, "downloading embedding model file");
            if let Err(e) = download(&url, &dest).await {
                let _ = tokio::fs::remove_file(&dest).await;
                return Err(e);
            }
        }

        info!(dir = %dir.display(), "embedding model ready");
        Ok(self.files())
    }
}

async fn download(url: &str, dest: &Path) -> Result<u64, WorklyError> {
    let fail = |what: String| WorklyError::Embedding { message: what };

    let response = reqwest::get(url)
        .await
        .map_err(|e| fail(format!("downloading {url}: {e}")))?;
    if !response.status().is_success() {
        return Err(fail(format!("downloading {url}: HTTP {}", response.status())));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| fail(format!("reading body of {url}: {e}")))?;
    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|e| fail(format!("writing {}: {e}", dest.display())))?;
    Ok(bytes.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_under_model_dir() {
        let manager = ModelManager::new("/data/workly", "all-MiniLM-L6-v2");
        assert_eq!(manager.model_dir(), PathBuf::from("/data/workly/models/all-MiniLM-L6-v2"));
        let files = manager.files();
        assert_eq!(files.model, PathBuf::from("/data/workly/models/all-MiniLM-L6-v2/model.onnx"));
        assert_eq!(
            files.tokenizer,
            PathBuf::from("/data/workly/models/all-MiniLM-L6-v2/tokenizer.json")
        );
    }

    #[test]
    fn sources_follow_model_name() {
        let manager = ModelManager::new("/d", "paraphrase-MiniLM-L3-v2");
        let [(_, model_url), (_, tokenizer_url)] = manager.sources();
        assert!(model_url.contains("paraphrase-MiniLM-L3-v2-ONNX"));
        assert!(tokenizer_url.ends_with("paraphrase-MiniLM-L3-v2/resolve/main/tokenizer.json"));
    }

    #[test]
    fn missing_files_are_not_available() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path(), "all-MiniLM-L6-v2");
        assert!(!manager.is_available());

        std::fs::create_dir_all(manager.model_dir()).unwrap();
        std::fs::write(manager.files().model, b"onnx").unwrap();
        assert!(!manager.is_available());
        std::fs::write(manager.files().tokenizer, b"{}").unwrap();
        assert!(manager.is_available());
    }
}
