//! Request orchestration.
//!
//! [`Engine::run`] takes one request from text to output:
//!
//! ```text
//! Request ──► cache_key ──► CacheStore::get ──hit──► sink.complete
//!                                 │ miss
//!                                 ▼
//!                      ProviderRegistry::resolve
//!                                 │
//!               ┌─────────────────┴─────────────────┐
//!               │ stream && plain && supports_stream │ otherwise
//!               ▼                                    ▼
//!   bounded_stream ─► ThinkFilterStream      generate ─► strip_think_tags
//!   ─► sink.chunk (in order)                 ─► sink.complete
//!               └─────────────────┬─────────────────┘
//!                                 ▼
//!                     trim, reject empty, CacheStore::set
//! ```
//!
//! Cache failures never fail a request: a read error is a miss, a write
//! error is skipped. Resolution and generation errors propagate unchanged.

pub mod prompt;
pub mod sink;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use futures_util::{StreamExt, pin_mut};
use tracing::{debug, info, instrument, warn};

pub use prompt::{Prompt, build_prompt};
pub use sink::{BufferSink, OutputFormat, OutputSink, WriterSink};

use crate::cache::{CacheConfig, CacheStore, cache_key};
use crate::config::Config;
use crate::filter::{ThinkFilterStream, strip_think_tags};
use crate::providers::backpressure::{DEFAULT_STREAM_BUFFER, bounded_stream};
use crate::providers::{AUTO, Provider, ProviderRegistry};
use crate::telemetry;
use crate::{HuginnError, Result};

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Explain a shell command.
    Explain,
    /// Suggest commands for a task.
    Suggest,
    /// Usage examples for a command.
    Examples,
    /// Summarize documentation.
    Summarize,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Explain, Mode::Suggest, Mode::Examples, Mode::Summarize];

    /// Stable name; part of the cache key.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Explain => "explain",
            Mode::Suggest => "suggest",
            Mode::Examples => "examples",
            Mode::Summarize => "summarize",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = HuginnError;

    fn from_str(s: &str) -> Result<Self> {
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| HuginnError::InvalidInput(format!("unknown mode: {s}")))
    }
}

/// A single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub mode: Mode,
    pub text: String,
}

impl Request {
    pub fn new(mode: Mode, text: impl Into<String>) -> Self {
        Self {
            mode,
            text: text.into(),
        }
    }
}

/// Per-invocation engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Use the response cache when a store is present.
    pub cache_enabled: bool,
    /// Stream output when the provider can. Ignored for JSON output.
    pub stream: bool,
    /// Forced provider; `None` or `"auto"` walks the fallback chain.
    pub provider: Option<String>,
    pub format: OutputFormat,
    /// Chunks buffered between provider and sink.
    pub stream_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            stream: true,
            provider: None,
            format: OutputFormat::Plain,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }
}

impl EngineConfig {
    /// Settings taken from a loaded configuration file.
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_enabled: config.cache.enabled,
            stream: config.output.stream,
            provider: Some(config.providers.default.clone()).filter(|p| p != AUTO),
            format: config.output.format,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }

    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.provider = Some(name.into());
        self
    }

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Selector used in cache keys.
    fn selector(&self) -> &str {
        self.provider.as_deref().unwrap_or(AUTO)
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cached,
    Streamed,
    Generated,
}

impl ResponseSource {
    fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Cached => "cached",
            ResponseSource::Streamed => "streamed",
            ResponseSource::Generated => "generated",
        }
    }
}

/// Result of a successful request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Final, filtered, trimmed text.
    pub text: String,
    /// Provider that produced the text (recorded provider for cache hits).
    pub provider: String,
    pub source: ResponseSource,
}

/// Open the response cache described by `config`.
///
/// Returns `None` when caching is disabled or the store cannot be opened;
/// the latter is logged and huginn carries on uncached.
pub fn open_cache(config: &CacheConfig) -> Option<Arc<CacheStore>> {
    if !config.enabled {
        return None;
    }
    match CacheStore::open(config) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            warn!(error = %e, "response cache unavailable; continuing without it");
            None
        }
    }
}

/// Ties together cache, provider resolution, generation and filtering.
pub struct Engine {
    registry: Arc<ProviderRegistry>,
    cache: Option<Arc<CacheStore>>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        cache: Option<Arc<CacheStore>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// The cache store, if caching is active for this engine.
    pub fn cache(&self) -> Option<&CacheStore> {
        if self.config.cache_enabled {
            self.cache.as_deref()
        } else {
            None
        }
    }

    /// Process one request, sending output to `sink`.
    #[instrument(skip(self, request, sink), fields(mode = %request.mode))]
    pub async fn run(&self, request: &Request, sink: &mut dyn OutputSink) -> Result<Outcome> {
        let start = Instant::now();
        let result = self.execute(request, sink).await;
        let mode = request.mode.as_str();

        match &result {
            Ok(outcome) => {
                metrics::counter!(telemetry::REQUESTS_TOTAL,
                    "mode" => mode,
                    "source" => outcome.source.as_str(),
                    "status" => "ok",
                )
                .increment(1);
            }
            Err(e) => {
                debug!(error = %e, "request failed");
                metrics::counter!(telemetry::REQUESTS_TOTAL,
                    "mode" => mode,
                    "source" => "none",
                    "status" => "error",
                )
                .increment(1);
            }
        }
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "mode" => mode)
            .record(start.elapsed().as_secs_f64());

        result
    }

    async fn execute(&self, request: &Request, sink: &mut dyn OutputSink) -> Result<Outcome> {
        if request.text.trim().is_empty() {
            return Err(HuginnError::InvalidInput("no input text".into()));
        }

        let mode = request.mode.as_str();
        let key = cache_key(&request.text, mode, self.config.selector());

        if let Some(cache) = self.cache() {
            match cache.get(&key) {
                Ok(Some(entry)) => {
                    debug!(provider = %entry.provider, "cache hit");
                    metrics::counter!(telemetry::CACHE_HITS_TOTAL, "mode" => mode).increment(1);
                    sink.complete(&entry.response, self.config.format)?;
                    return Ok(Outcome {
                        text: entry.response,
                        provider: entry.provider,
                        source: ResponseSource::Cached,
                    });
                }
                Ok(None) => {
                    debug!("cache miss");
                    metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "mode" => mode).increment(1);
                }
                Err(e) => {
                    warn!(error = %e, "cache read failed; treating as miss");
                    metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "mode" => mode).increment(1);
                }
            }
        }

        let provider = self.registry.resolve(self.config.provider.as_deref()).await?;
        let prompt = build_prompt(request.mode, &request.text);

        // JSON output needs the complete text, so it is never streamed.
        let stream = self.config.stream && self.config.format == OutputFormat::Plain;
        let (text, source) = if stream && provider.supports_streaming() {
            let text = self.stream_response(provider.as_ref(), &prompt, sink).await?;
            (text, ResponseSource::Streamed)
        } else {
            let raw = provider.generate(&prompt).await?;
            let text = strip_think_tags(&raw).trim().to_string();
            if !text.is_empty() {
                sink.complete(&text, self.config.format)?;
            }
            (text, ResponseSource::Generated)
        };

        if text.is_empty() {
            metrics::counter!(telemetry::EMPTY_RESPONSES_TOTAL,
                "provider" => provider.name().to_owned(),
            )
            .increment(1);
            return Err(HuginnError::EmptyResponse(provider.name().to_string()));
        }

        if let Some(cache) = self.cache()
            && let Err(e) = cache.set(&key, &text, provider.name())
        {
            warn!(error = %e, "cache write failed; response not cached");
        }

        info!(provider = provider.name(), source = source.as_str(), "request complete");
        Ok(Outcome {
            text,
            provider: provider.name().to_string(),
            source,
        })
    }

    /// Pull the provider stream through the bounded channel and the think
    /// filter, forwarding chunks as they arrive. Returns the trimmed text.
    async fn stream_response(
        &self,
        provider: &dyn Provider,
        prompt: &Prompt,
        sink: &mut dyn OutputSink,
    ) -> Result<String> {
        let raw = provider.generate_stream(prompt).await?;
        let filtered = ThinkFilterStream::new(bounded_stream(raw, self.config.stream_buffer));
        pin_mut!(filtered);

        let mut text = String::new();
        let mut started = false;
        while let Some(chunk) = filtered.next().await {
            let chunk = chunk?;
            // Leading whitespace is not forwarded.
            let chunk = if started { chunk.as_str() } else { chunk.trim_start() };
            if chunk.is_empty() {
                continue;
            }
            started = true;
            sink.chunk(chunk)?;
            text.push_str(chunk);
        }

        if started {
            sink.end_stream()?;
        }
        Ok(text.trim().to_string())
    }
}
