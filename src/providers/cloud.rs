//! Cloud providers backed by the llm crate.
//!
//! [`LlmProvider`] stores configuration and builds an llm crate provider per
//! request, the same way for every hosted backend (Anthropic, OpenAI,
//! Google, OpenRouter). Availability is purely a credential check: a
//! provider with a non-empty API key is considered ready. Network failures
//! surface later, from generation, as provider errors.

use async_trait::async_trait;
use futures_util::StreamExt;
use llm::LLMProvider;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage as LlmMessage;
use tracing::instrument;

use super::traits::{Provider, TextStream};
use crate::engine::Prompt;
use crate::{HuginnError, Result};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GOOGLE_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_OPENROUTER_MODEL: &str = "anthropic/claude-sonnet-4";

/// Hosted LLM API reached through the llm crate.
///
/// # Example
///
/// ```ignore
/// use huginn::providers::LlmProvider;
///
/// let provider = LlmProvider::anthropic(std::env::var("ANTHROPIC_API_KEY").ok());
/// ```
pub struct LlmProvider {
    backend: LLMBackend,
    name: String,
    api_key: Option<String>,
    model: String,
    timeout_secs: u64,
}

impl LlmProvider {
    /// Create a provider for `backend`.
    ///
    /// * `name` - provider identifier (e.g. "anthropic")
    /// * `api_key` - `None` or empty means the probe reports unavailable
    /// * `model` - model identifier passed to the backend
    pub fn new(
        backend: LLMBackend,
        name: impl Into<String>,
        api_key: Option<impl Into<String>>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            name: name.into(),
            api_key: api_key.map(|k| k.into()),
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    #[cfg(feature = "anthropic")]
    pub fn anthropic(api_key: Option<String>) -> Self {
        Self::new(LLMBackend::Anthropic, "anthropic", api_key, DEFAULT_ANTHROPIC_MODEL)
    }

    #[cfg(feature = "openai")]
    pub fn openai(api_key: Option<String>) -> Self {
        Self::new(LLMBackend::OpenAI, "openai", api_key, DEFAULT_OPENAI_MODEL)
    }

    #[cfg(feature = "google")]
    pub fn google(api_key: Option<String>) -> Self {
        Self::new(LLMBackend::Google, "google", api_key, DEFAULT_GOOGLE_MODEL)
    }

    #[cfg(feature = "openrouter")]
    pub fn openrouter(api_key: Option<String>) -> Self {
        Self::new(LLMBackend::OpenRouter, "openrouter", api_key, DEFAULT_OPENROUTER_MODEL)
    }

    /// Override the model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn has_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Build an llm crate provider with the prompt's system text.
    fn build_provider(&self, system: Option<&str>) -> Result<Box<dyn LLMProvider>> {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| HuginnError::ProviderUnavailable(self.name.clone()))?;

        let mut builder = LLMBuilder::new()
            .backend(self.backend.clone())
            .api_key(api_key)
            .model(&self.model)
            .timeout_seconds(self.timeout_secs);

        if let Some(sys) = system {
            builder = builder.system(sys);
        }

        builder.build().map_err(|e| HuginnError::Llm(e.to_string()))
    }

    fn messages(prompt: &Prompt) -> Vec<LlmMessage> {
        vec![LlmMessage::user().content(prompt.user.clone()).build()]
    }
}

#[async_trait]
impl Provider for LlmProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn probe(&self) -> Result<bool> {
        Ok(self.has_key())
    }

    #[instrument(
        name = "llm.generate",
        skip(self, prompt),
        fields(model = %self.model, provider = %self.name)
    )]
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let provider = self.build_provider(prompt.system.as_deref())?;
        let response = provider
            .chat(&Self::messages(prompt))
            .await
            .map_err(HuginnError::from)?;
        Ok(response.text().unwrap_or_default())
    }

    #[instrument(
        name = "llm.generate_stream",
        skip(self, prompt),
        fields(model = %self.model, provider = %self.name)
    )]
    async fn generate_stream(&self, prompt: &Prompt) -> Result<TextStream> {
        let provider = self.build_provider(prompt.system.as_deref())?;
        let stream = provider
            .chat_stream_with_tools(&Self::messages(prompt), provider.tools())
            .await
            .map_err(HuginnError::from)?;

        // Keep text only; tool-use and completion markers carry nothing to show.
        let text = stream.filter_map(|result| async move {
            match result {
                Ok(llm::chat::StreamChunk::Text(text)) => Some(Ok(text)),
                Ok(_) => None,
                Err(e) => Some(Err(HuginnError::from(e))),
            }
        });

        Ok(Box::pin(text))
    }
}
