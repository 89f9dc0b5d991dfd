//! Ollama client (local inference server).
//!
//! Uses Ollama's native API:
//! - `GET  /api/tags` — availability probe (server up and model pulled)
//! - `POST /api/generate` — completion, optionally streamed as NDJSON
//!
//! See: <https://github.com/ollama/ollama/blob/main/docs/api.md>

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, pin_mut};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::lines::response_lines;
use super::traits::{Provider, TextStream};
use crate::engine::Prompt;
use crate::{HuginnError, Result};

/// Default base URL of a local Ollama server.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default model.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// The probe must be quick: it runs before every uncached request.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Client for a local Ollama server.
#[derive(Clone)]
pub struct OllamaProvider {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    /// Create a provider for `model` served at `base_url`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_http_client(base_url, model, Client::new())
    }

    /// Create a provider sharing an existing HTTP client.
    pub fn with_http_client(
        base_url: impl Into<String>,
        model: impl Into<String>,
        http: Client,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request<'a>(&'a self, prompt: &'a Prompt, stream: bool) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt: &prompt.user,
            system: prompt.system.as_deref(),
            stream,
        }
    }

    async fn send(&self, prompt: &Prompt, stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&self.request(prompt, stream))
            .send()
            .await
            .map_err(|e| HuginnError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(HuginnError::Api {
                status: response.status().as_u16(),
                message: response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown error".into()),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    #[instrument(name = "ollama.probe", skip(self), fields(model = %self.model))]
    async fn probe(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        let response = match self.http.get(&url).timeout(PROBE_TIMEOUT).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(status = r.status().as_u16(), "ollama server answered with an error");
                return Ok(false);
            }
            Err(e) => {
                debug!(error = %e, "ollama server not reachable");
                return Ok(false);
            }
        };

        let tags: TagsResponse = match response.json().await {
            Ok(tags) => tags,
            Err(e) => {
                debug!(error = %e, "unexpected /api/tags payload");
                return Ok(false);
            }
        };

        let pulled = tags.models.iter().any(|m| model_matches(&m.name, &self.model));
        if !pulled {
            debug!("model not pulled");
        }
        Ok(pulled)
    }

    #[instrument(name = "ollama.generate", skip(self, prompt), fields(model = %self.model))]
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let response = self.send(prompt, false).await?;
        let body: GenerateChunk = response
            .json()
            .await
            .map_err(|e| HuginnError::Http(e.to_string()))?;
        if let Some(error) = body.error {
            return Err(HuginnError::Api {
                status: 500,
                message: error,
            });
        }
        Ok(body.response)
    }

    #[instrument(name = "ollama.generate_stream", skip(self, prompt), fields(model = %self.model))]
    async fn generate_stream(&self, prompt: &Prompt) -> Result<TextStream> {
        let response = self.send(prompt, true).await?;
        let lines = response_lines(response);

        let stream = async_stream::try_stream! {
            pin_mut!(lines);
            while let Some(line) = lines.next().await {
                let line = line?;
                let chunk: GenerateChunk = match serde_json::from_str(&line) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(error = %e, line = %line, "skipping malformed ollama chunk");
                        continue;
                    }
                };
                if let Some(error) = chunk.error {
                    Err::<(), _>(HuginnError::Stream(error))?;
                }
                if !chunk.response.is_empty() {
                    yield chunk.response;
                }
                if chunk.done {
                    break;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// `llama3.2` matches a pulled `llama3.2:latest`; an explicit tag must match exactly.
fn model_matches(pulled: &str, wanted: &str) -> bool {
    if pulled == wanted {
        return true;
    }
    !wanted.contains(':') && pulled.strip_suffix(":latest") == Some(wanted)
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
}

/// One NDJSON line of a streamed response, or the whole batch response.
#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}
