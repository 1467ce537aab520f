use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A downloadable model file. Downloading itself is the host app's concern;
/// the session only asks whether the file is present and where it lives.
///
/// Fields missing from a deserialized entry take the [`Default`] artifact's
/// values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelArtifact {
    pub id: String,
    pub name: String,
    pub url: String,
    pub size_bytes: u64,
    #[serde(rename = "path")]
    pub local_path: PathBuf,
}

impl ModelArtifact {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        size_bytes: u64,
        local_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            size_bytes,
            local_path: local_path.into(),
        }
    }

    /// Whether a regular file exists at [`ModelArtifact::local_path`].
    pub async fn is_present(&self) -> bool {
        tokio::fs::metadata(&self.local_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }
}

impl Default for ModelArtifact {
    fn default() -> Self {
        Self::new(
            "tinyllama-1.1b",
            "TinyLlama 1.1B",
            "https://huggingface.co/TheBloke/TinyLlama-1.1B-Chat-v1.0-GGUF/resolve/main/tinyllama-1.1b-chat-v1.0.Q4_K_M.gguf",
            550_000_000,
            "models/tinyllama-1.1b-chat-v1.0.Q4_K_M.gguf",
        )
    }
}
