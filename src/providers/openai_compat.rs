//! Client for local OpenAI-compatible servers (LM Studio, llama.cpp server,
//! vLLM, ...).
//!
//! - `GET  /v1/models` — availability probe
//! - `POST /v1/chat/completions` — completion, optionally streamed as SSE

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, pin_mut};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::lines::{response_lines, sse_data};
use super::traits::{Provider, TextStream};
use crate::engine::Prompt;
use crate::{HuginnError, Result};

/// Default base URL of a local LM Studio server.
pub const DEFAULT_LMSTUDIO_URL: &str = "http://localhost:1234";

/// LM Studio answers to whichever model is loaded; the name is informational.
pub const DEFAULT_LMSTUDIO_MODEL: &str = "local-model";

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Terminator of an OpenAI-style SSE stream.
const SSE_DONE: &str = "[DONE]";

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    name: String,
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatProvider {
    /// Create a provider called `name` for `model` served at `base_url`.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            name: name.into(),
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
        }
    }

    /// An LM Studio provider with default settings.
    pub fn lmstudio() -> Self {
        Self::new("lmstudio", DEFAULT_LMSTUDIO_URL, DEFAULT_LMSTUDIO_MODEL)
    }

    /// Send `Authorization: Bearer {key}` with every request.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Share an HTTP client (connection pool) with other providers.
    pub fn http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => builder.header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }

    fn request<'a>(&'a self, prompt: &'a Prompt, stream: bool) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = prompt.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &prompt.user,
        });
        ChatRequest {
            model: &self.model,
            messages,
            stream,
        }
    }

    async fn send(&self, prompt: &Prompt, stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .authorized(self.http.post(&url))
            .json(&self.request(prompt, stream))
            .send()
            .await
            .map_err(|e| HuginnError::Http(e.to_string()))?;

        match response.status().as_u16() {
            200..=299 => Ok(response),
            401 | 403 => Err(HuginnError::AuthenticationFailed),
            status => Err(HuginnError::Api {
                status,
                message: response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown error".into()),
            }),
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    #[instrument(name = "openai_compat.probe", skip(self), fields(provider = %self.name))]
    async fn probe(&self) -> Result<bool> {
        let url = format!("{}/v1/models", self.base_url);
        match self
            .authorized(self.http.get(&url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(r) => Ok(r.status().is_success()),
            Err(e) => {
                debug!(error = %e, "server not reachable");
                Ok(false)
            }
        }
    }

    #[instrument(
        name = "openai_compat.generate",
        skip(self, prompt),
        fields(provider = %self.name)
    )]
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let response = self.send(prompt, false).await?;
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| HuginnError::Http(e.to_string()))?;
        // A missing message is left for the engine to reject as empty.
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default())
    }

    #[instrument(
        name = "openai_compat.generate_stream",
        skip(self, prompt),
        fields(provider = %self.name)
    )]
    async fn generate_stream(&self, prompt: &Prompt) -> Result<TextStream> {
        let response = self.send(prompt, true).await?;
        let lines = response_lines(response);

        let stream = async_stream::try_stream! {
            pin_mut!(lines);
            while let Some(line) = lines.next().await {
                let line = line?;
                let Some(data) = sse_data(&line) else {
                    continue; // comments, event names, keep-alives
                };
                if data == SSE_DONE {
                    break;
                }
                let chunk: ChatResponse = match serde_json::from_str(data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(error = %e, line = %line, "skipping malformed SSE chunk");
                        continue;
                    }
                };
                let delta = chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.delta)
                    .and_then(|d| d.content)
                    .unwrap_or_default();
                if !delta.is_empty() {
                    yield delta;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Batch response body, or one SSE chunk of a streamed response.
#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<Content>,
    #[serde(default)]
    delta: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lmstudio_defaults() {
        let provider = OpenAiCompatProvider::lmstudio();
        assert_eq!(provider.name(), "lmstudio");
        assert_eq!(provider.base_url(), DEFAULT_LMSTUDIO_URL);
        assert!(provider.supports_streaming());
    }

    #[test]
    fn request_puts_system_first() {
        let provider = OpenAiCompatProvider::lmstudio();
        let prompt = Prompt {
            system: Some("be brief".into()),
            user: "ls -la".into(),
        };
        let json = serde_json::to_value(provider.request(&prompt, false)).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "ls -la");
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn delta_chunk_parses() {
        let chunk: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"index":0,"delta":{"content":"hi"}}]}"#)
                .unwrap();
        let content = chunk.choices[0]
            .delta
            .as_ref()
            .and_then(|d| d.content.clone());
        assert_eq!(content.as_deref(), Some("hi"));
    }
}
