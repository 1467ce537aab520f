use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, trace, warn};

use crate::session::{ChatMessage, CompletionParams, ContextParams, InferenceContext, InferenceEngine};

/// Inference engine backed by an Ollama server.
#[derive(Clone, Debug)]
pub struct OllamaEngine {
    /// Base URL for the Ollama server, e.g. `http://localhost:11434`.
    pub base_url: String,
    /// Model tag. When unset, the artifact's file stem is used.
    pub model: Option<String>,
    client: reqwest::Client,
}

impl OllamaEngine {
    pub fn new(base_url: impl Into<String>, model: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.base_url.trim_end_matches('/'), endpoint)
    }

    fn model_for(&self, path: &Path) -> anyhow::Result<String> {
        if let Some(model) = &self.model {
            return Ok(model.clone());
        }
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("cannot derive a model name from {}", path.display()))
    }
}

#[async_trait]
impl InferenceEngine for OllamaEngine {
    async fn initialize(
        &self,
        path: &Path,
        params: &ContextParams,
    ) -> anyhow::Result<Box<dyn InferenceContext>> {
        let model = self.model_for(path)?;
        let url = self.url("show");
        trace!(target: "llm", %url, %model, "checking model");
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "model": model }))
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("model {model} is not available ({})", resp.status());
        }
        debug!(target: "llm", %model, "ollama model available");
        Ok(Box::new(OllamaContext {
            engine: self.clone(),
            model,
            params: *params,
        }))
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<Message>,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

struct OllamaContext {
    engine: OllamaEngine,
    model: String,
    params: ContextParams,
}

#[async_trait]
impl InferenceContext for OllamaContext {
    async fn complete(
        &mut self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> anyhow::Result<String> {
        let url = self.engine.url("chat");
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": {
                "num_predict": params.max_tokens,
                "temperature": params.temperature,
                "num_ctx": self.params.context_size,
                "num_thread": self.params.threads,
            }
        });
        trace!(target: "llm", %url, body = %body, "Ollama prompt");
        let resp = self.engine.client.post(url).json(&body).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("ollama returned {}", resp.status());
        }
        let chat: ChatResponse = resp.json().await?;
        let text = chat.message.map(|m| m.content).unwrap_or_default();
        debug!(target: "llm", response = %text, "Ollama full response");
        Ok(text)
    }

    async fn release(&mut self) -> anyhow::Result<()> {
        let url = self.engine.url("generate");
        let body = serde_json::json!({ "model": self.model, "keep_alive": 0 });
        if let Err(e) = self.engine.client.post(url).json(&body).send().await {
            warn!(target: "llm", error = %e, "failed to unload model");
        }
        Ok(())
    }
}
