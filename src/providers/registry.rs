//! Provider registry with fallback chain semantics.
//!
//! The `ProviderRegistry` stores providers in priority order (index 0 = highest).
//! Resolution probes providers and hands back exactly one ready provider, or
//! a definitive failure.
//!
//! # Resolution modes
//!
//! - **Forced** (`--provider NAME`): only NAME is probed. Unavailable means
//!   [`HuginnError::ProviderUnavailable`]; no other provider is tried.
//! - **Chain** (no selector, or `"auto"`): probe in priority order and stop
//!   at the first available provider. If none is,
//!   [`HuginnError::NoProviderAvailable`].
//!
//! A probe returning `Err` is an infrastructure failure and propagates
//! unchanged in both modes.
//!
//! # Fallback Chain Flow
//!
//! ```text
//! huginn explain "tar -xzf a.tgz"
//!                     │
//!                     ▼
//!         ┌─────────────────────┐
//!         │   OllamaProvider    │ ──► GET /api/tags: server up? model pulled?
//!         │   (priority 0)      │ ──► no: Ok(false)
//!         └─────────┬───────────┘
//!                   │ unavailable
//!                   ▼
//!         ┌─────────────────────┐
//!         │  LlmProvider        │ ──► ANTHROPIC_API_KEY set?
//!         │  "anthropic" (1)    │ ──► yes: resolved, later providers not probed
//!         └─────────────────────┘
//! ```

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info, instrument, warn};

use super::AUTO;
use super::traits::Provider;
use crate::config::ProvidersConfig;
use crate::telemetry;
use crate::{HuginnError, Result};

/// Result of probing one provider, for `huginn providers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub name: String,
    pub supports_streaming: bool,
    pub available: bool,
    /// Set when the probe itself failed.
    pub error: Option<String>,
}

/// Ordered set of providers.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry described by `config`, in `config.order`.
    ///
    /// A `forced` provider missing from the order is appended, so forcing
    /// any known provider works regardless of the chain. Names whose backend
    /// was not compiled in (disabled cargo feature) are skipped. API keys
    /// are read from the environment.
    pub fn from_config(config: &ProvidersConfig, forced: Option<&str>) -> Self {
        let http = reqwest::Client::new();
        let mut registry = Self::new();

        let extra = forced
            .filter(|name| *name != AUTO && !config.order.iter().any(|o| o == name))
            .map(str::to_string);

        for name in config.order.iter().chain(extra.iter()) {
            match build_provider(name, config, &http) {
                Some(provider) => registry.add(provider),
                None => debug!(provider = %name, "provider not compiled in; skipping"),
            }
        }

        registry
    }

    /// Append a provider (lowest priority so far).
    pub fn add(&mut self, provider: Arc<dyn Provider>) {
        self.providers.push(provider);
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names in priority order.
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    /// Resolve a ready-to-use provider.
    ///
    /// `forced` of `None` or `Some("auto")` selects chain mode.
    #[instrument(skip(self))]
    pub async fn resolve(&self, forced: Option<&str>) -> Result<Arc<dyn Provider>> {
        match forced.filter(|name| *name != AUTO) {
            Some(name) => {
                let provider = self
                    .get(name)
                    .ok_or_else(|| HuginnError::UnknownProvider(name.to_string()))?;
                if Self::probe(provider.as_ref()).await? {
                    info!(provider = name, "using forced provider");
                    Ok(provider)
                } else {
                    Err(HuginnError::ProviderUnavailable(name.to_string()))
                }
            }
            None => {
                for provider in &self.providers {
                    if Self::probe(provider.as_ref()).await? {
                        info!(provider = provider.name(), "resolved provider");
                        return Ok(Arc::clone(provider));
                    }
                }
                Err(HuginnError::NoProviderAvailable)
            }
        }
    }

    /// Probe every provider concurrently and report the results in priority order.
    pub async fn availability(&self) -> Vec<ProviderStatus> {
        let probes = self.providers.iter().map(|p| async move {
            let result = Self::probe(p.as_ref()).await;
            if let Err(ref e) = result {
                warn!(provider = p.name(), error = %e, "probe failed");
            }
            ProviderStatus {
                name: p.name().to_string(),
                supports_streaming: p.supports_streaming(),
                available: matches!(result, Ok(true)),
                error: result.err().map(|e| e.to_string()),
            }
        });
        join_all(probes).await
    }

    /// Run one probe and record its outcome.
    async fn probe(provider: &dyn Provider) -> Result<bool> {
        let result = provider.probe().await;
        let status = match result {
            Ok(true) => "available",
            Ok(false) => "unavailable",
            Err(_) => "error",
        };
        metrics::counter!(telemetry::PROBES_TOTAL,
            "provider" => provider.name().to_owned(),
            "status" => status,
        )
        .increment(1);
        debug!(provider = provider.name(), status, "probed provider");
        result
    }
}

/// Construct the named provider from its config section.
fn build_provider(
    name: &str,
    config: &ProvidersConfig,
    http: &reqwest::Client,
) -> Option<Arc<dyn Provider>> {
    let provider: Arc<dyn Provider> = match name {
        "ollama" => Arc::new(super::OllamaProvider::with_http_client(
            config.ollama.resolved_base_url(),
            config.ollama.resolved_model(),
            http.clone(),
        )),
        "lmstudio" => Arc::new(
            super::OpenAiCompatProvider::new(
                "lmstudio",
                config.lmstudio.resolved_base_url(),
                config.lmstudio.resolved_model(),
            )
            .http_client(http.clone()),
        ),
        #[cfg(feature = "anthropic")]
        "anthropic" => {
            let provider = super::LlmProvider::anthropic(crate::config::api_key_from_env(name));
            Arc::new(config.anthropic.apply(provider).timeout_secs(config.timeout_secs))
        }
        #[cfg(feature = "openai")]
        "openai" => {
            let provider = super::LlmProvider::openai(crate::config::api_key_from_env(name));
            Arc::new(config.openai.apply(provider).timeout_secs(config.timeout_secs))
        }
        #[cfg(feature = "google")]
        "google" => {
            let provider = super::LlmProvider::google(crate::config::api_key_from_env(name));
            Arc::new(config.google.apply(provider).timeout_secs(config.timeout_secs))
        }
        #[cfg(feature = "openrouter")]
        "openrouter" => {
            let provider = super::LlmProvider::openrouter(crate::config::api_key_from_env(name));
            Arc::new(config.openrouter.apply(provider).timeout_secs(config.timeout_secs))
        }
        _ => return None,
    };
    Some(provider)
}
