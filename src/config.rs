//! Configuration loading for huginn.
//!
//! Configuration is loaded from a TOML file with the following resolution order:
//! 1. `--config <path>` (CLI flag, must exist)
//! 2. `$HUGINN_CONFIG`
//! 3. `{config_dir}/huginn/config.toml` (e.g. `~/.config/huginn/config.toml`)
//! 4. built-in defaults when no file exists
//!
//! API keys never live in the file. They are read from the environment
//! (`ANTHROPIC_API_KEY`, `OPENAI_API_KEY`, ...) when the registry is built.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::CacheConfig;
use crate::engine::OutputFormat;
use crate::providers::cloud::DEFAULT_TIMEOUT_SECS;
use crate::providers::ollama::{DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};
use crate::providers::openai_compat::{DEFAULT_LMSTUDIO_MODEL, DEFAULT_LMSTUDIO_URL};
use crate::providers::{AUTO, KNOWN_PROVIDERS, LlmProvider};
use crate::{HuginnError, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "HUGINN_CONFIG";

/// Environment variable overriding the Ollama server address.
pub const OLLAMA_HOST_ENV_VAR: &str = "OLLAMA_HOST";

/// Provider name → environment variable name mapping.
pub const PROVIDER_ENV_VARS: &[(&str, &str)] = &[
    ("anthropic", "ANTHROPIC_API_KEY"),
    ("openai", "OPENAI_API_KEY"),
    ("google", "GOOGLE_API_KEY"),
    ("openrouter", "OPENROUTER_API_KEY"),
];

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Output settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Stream responses when the provider supports it (default: true).
    #[serde(default = "default_true")]
    pub stream: bool,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            stream: true,
            format: OutputFormat::Plain,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Provider selection and per-provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// Fallback chain, highest priority first.
    #[serde(default = "default_order")]
    pub order: Vec<String>,
    /// Provider to force, or `"auto"` for the fallback chain.
    #[serde(default = "default_provider")]
    pub default: String,
    /// Request timeout for hosted APIs in seconds (default: 60).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub lmstudio: LmStudioConfig,
    #[serde(default)]
    pub anthropic: CloudConfig,
    #[serde(default)]
    pub openai: CloudConfig,
    #[serde(default)]
    pub google: CloudConfig,
    #[serde(default)]
    pub openrouter: CloudConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: default_order(),
            default: default_provider(),
            timeout_secs: default_timeout(),
            ollama: OllamaConfig::default(),
            lmstudio: LmStudioConfig::default(),
            anthropic: CloudConfig::default(),
            openai: CloudConfig::default(),
            google: CloudConfig::default(),
            openrouter: CloudConfig::default(),
        }
    }
}

fn default_order() -> Vec<String> {
    KNOWN_PROVIDERS.iter().map(|p| p.to_string()).collect()
}

fn default_provider() -> String {
    AUTO.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Ollama settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl OllamaConfig {
    /// `$OLLAMA_HOST`, then the configured URL, then the default.
    pub fn resolved_base_url(&self) -> String {
        std::env::var(OLLAMA_HOST_ENV_VAR)
            .ok()
            .filter(|h| !h.trim().is_empty())
            .map(|h| normalize_host(&h))
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
    }

    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string())
    }
}

/// LM Studio settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LmStudioConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl LmStudioConfig {
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_LMSTUDIO_URL.to_string())
    }

    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| DEFAULT_LMSTUDIO_MODEL.to_string())
    }
}

/// Hosted API settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudConfig {
    /// Model override; the provider's default when unset.
    #[serde(default)]
    pub model: Option<String>,
}

impl CloudConfig {
    /// Apply these settings to a provider.
    pub fn apply(&self, provider: LlmProvider) -> LlmProvider {
        match &self.model {
            Some(model) => provider.model(model),
            None => provider,
        }
    }
}

/// Turn an `OLLAMA_HOST` value into a base URL.
///
/// Ollama accepts bare `host:port`; a scheme is added when missing.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

/// API key for a hosted provider from its environment variable.
///
/// An empty variable counts as absent.
pub fn api_key_from_env(provider: &str) -> Option<String> {
    PROVIDER_ENV_VARS
        .iter()
        .find(|(name, _)| *name == provider)
        .and_then(|(_, env_var)| std::env::var(env_var).ok())
        .filter(|key| !key.trim().is_empty())
}

impl Config {
    /// Load configuration from the standard locations and validate it.
    ///
    /// A missing file at the default location is not an error; defaults apply.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path)?,
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse (but do not validate) a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| HuginnError::Configuration(format!("Failed to parse config: {e}")))
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        Ok(default_config_path().filter(|p| p.exists()))
    }

    /// Reject settings the rest of huginn cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.cache.ttl_days == 0 {
            return Err(HuginnError::Configuration(
                "cache.ttl_days must be greater than 0".to_string(),
            ));
        }

        if let Some(unknown) = self
            .providers
            .order
            .iter()
            .find(|name| !KNOWN_PROVIDERS.contains(&name.as_str()))
        {
            return Err(HuginnError::Configuration(format!(
                "unknown provider in providers.order: {unknown}"
            )));
        }

        let default = self.providers.default.as_str();
        if default != AUTO && !KNOWN_PROVIDERS.contains(&default) {
            return Err(HuginnError::Configuration(format!(
                "unknown providers.default: {default}"
            )));
        }

        Ok(())
    }
}

/// `{config_dir}/huginn/config.toml`, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("huginn").join("config.toml"))
}
