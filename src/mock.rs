use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, trace};

use crate::session::{ChatMessage, CompletionParams, ContextParams, InferenceContext, InferenceEngine};

/// Engine whose contexts answer every prompt with the same text.
#[derive(Clone, Debug)]
pub struct MockEngine {
    reply: String,
}

impl MockEngine {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new("mock response")
    }
}

#[async_trait]
impl InferenceEngine for MockEngine {
    async fn initialize(
        &self,
        path: &Path,
        _params: &ContextParams,
    ) -> anyhow::Result<Box<dyn InferenceContext>> {
        trace!(target: "llm", path = %path.display(), "MockEngine initialize");
        Ok(Box::new(MockContext {
            reply: self.reply.clone(),
        }))
    }
}

struct MockContext {
    reply: String,
}

#[async_trait]
impl InferenceContext for MockContext {
    async fn complete(
        &mut self,
        messages: &[ChatMessage],
        _params: &CompletionParams,
    ) -> anyhow::Result<String> {
        trace!(target: "llm", ?messages, "MockEngine prompt");
        debug!(target: "llm", response = %self.reply, "MockEngine full response");
        Ok(self.reply.clone())
    }

    async fn release(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
