use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::artifact::ModelArtifact;
use crate::capability::Contact;
use crate::extract::{Extractor, DEFAULT_COUNTRY_CODE};
use crate::handlers::AppCatalog;
use crate::mock::MockEngine;
use crate::ollama::OllamaEngine;
use crate::session::{ContextParams, InferenceEngine};

/// Inference backend selection.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// `"ollama"` or `"mock"`.
    pub provider: String,
    pub base_url: String,
    /// Ollama model tag. Defaults to the artifact's file stem.
    pub model: Option<String>,
    /// Fixed reply for the mock provider.
    pub reply: Option<String>,
    pub context_size: u32,
    pub threads: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let params = ContextParams::default();
        Self {
            provider: "ollama".into(),
            base_url: "http://localhost:11434".into(),
            model: None,
            reply: None,
            context_size: params.context_size,
            threads: params.threads,
        }
    }
}

impl EngineConfig {
    pub fn context_params(&self) -> ContextParams {
        ContextParams {
            context_size: self.context_size,
            threads: self.threads,
        }
    }

    pub fn build(&self) -> anyhow::Result<Arc<dyn InferenceEngine>> {
        let engine: Arc<dyn InferenceEngine> = match self.provider.as_str() {
            "ollama" => Arc::new(OllamaEngine::new(self.base_url.clone(), self.model.clone())),
            "mock" => match &self.reply {
                Some(reply) => Arc::new(MockEngine::new(reply.clone())),
                None => Arc::new(MockEngine::default()),
            },
            other => anyhow::bail!("unsupported provider: {}", other),
        };
        debug!(provider = %self.provider, "inference engine built");
        Ok(engine)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DialingConfig {
    pub country_code: String,
}

impl Default for DialingConfig {
    fn default() -> Self {
        Self {
            country_code: DEFAULT_COUNTRY_CODE.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tasks.json"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppsConfig {
    /// Identifiers the console launcher reports as installed.
    pub installed: BTreeSet<String>,
    /// Extra labels, or replacements for built-in ones.
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl AppsConfig {
    pub fn catalog(&self) -> AppCatalog {
        self.aliases
            .iter()
            .fold(AppCatalog::default(), |catalog, (label, ids)| {
                catalog.with_alias(label, ids.clone())
            })
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub model: ModelArtifact,
    pub dialing: DialingConfig,
    pub history: HistoryConfig,
    pub contacts: Vec<Contact>,
    pub apps: AppsConfig,
}

impl Config {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        let cfg = Self::parse(&text)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(cfg)
    }

    /// [`Config::load`], or defaults when `path` does not exist.
    pub async fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if tokio::fs::try_exists(path).await? {
            Self::load(path).await
        } else {
            info!(path = %path.display(), "no configuration file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn extractor(&self) -> Extractor {
        Extractor::new(self.dialing.country_code.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.engine.context_params(), ContextParams::default());
        assert_eq!(cfg.extractor().country_code(), "+91");
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = Config::parse(
            r#"
[engine]
provider = "mock"
reply = "{\"Day\":\"Monday\",\"Time\":\"07:00\"}"
threads = 2

[model]
id = "phi"
name = "Phi"
path = "models/phi.gguf"

[dialing]
country_code = "+1"

[[contacts]]
name = "John"
number = "+15550100"

[apps]
installed = ["com.google.android.youtube"]
aliases = { notes = ["org.example.notes"] }
"#,
        )
        .unwrap();
        assert_eq!(cfg.engine.provider, "mock");
        assert_eq!(cfg.engine.threads, 2);
        assert_eq!(cfg.engine.context_size, 512);
        assert_eq!(cfg.model.local_path, PathBuf::from("models/phi.gguf"));
        assert_eq!(cfg.contacts.len(), 1);
        assert!(cfg.apps.installed.contains("com.google.android.youtube"));
        assert_eq!(cfg.apps.catalog().candidates("notes").unwrap(), ["org.example.notes"]);
        assert!(cfg.engine.build().is_ok());
    }

    #[test]
    fn partial_model_table_keeps_default_fields() {
        let cfg = Config::parse("[model]\npath = \"models/custom.gguf\"\n").unwrap();
        let defaults = ModelArtifact::default();
        assert_eq!(cfg.model.local_path, PathBuf::from("models/custom.gguf"));
        assert_eq!(cfg.model.id, defaults.id);
        assert_eq!(cfg.model.name, defaults.name);
        assert_eq!(cfg.model.url, defaults.url);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let cfg = Config::parse("[engine]\nprovider = \"openai\"\n").unwrap();
        assert!(cfg.engine.build().is_err());
    }

    #[tokio::test]
    async fn missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let cfg = Config::load_or_default(&dir.path().join("errand.toml"))
            .await
            .unwrap();
        assert_eq!(cfg.history.path, PathBuf::from("tasks.json"));
    }

    #[tokio::test]
    async fn load_reads_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("errand.toml");
        tokio::fs::write(&path, "[history]\npath = \"log/tasks.json\"\n")
            .await
            .unwrap();
        let cfg = Config::load(&path).await.unwrap();
        assert_eq!(cfg.history.path, PathBuf::from("log/tasks.json"));
    }
}
