//! Huginn error types

/// Huginn error types
#[derive(Debug, thiserror::Error)]
pub enum HuginnError {
    // Resolution errors
    /// A forced provider failed its availability probe. No fallback is tried.
    #[error("provider '{0}' is not available")]
    ProviderUnavailable(String),

    /// Every provider in the fallback chain failed its availability probe.
    #[error("no provider available (tried the whole fallback chain)")]
    NoProviderAvailable,

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// Generation succeeded but produced no usable text after filtering.
    #[error("empty response from provider '{0}'")]
    EmptyResponse(String),

    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("stream error: {0}")]
    Stream(String),

    #[error("provider does not support this operation")]
    Unsupported,

    // Wrapped llm crate error
    #[error("LLM error: {0}")]
    Llm(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Writing output or reading stdin failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Cache errors never leave the engine; see `Engine::run`.
    #[error("cache error: {0}")]
    Cache(String),
}

impl HuginnError {
    /// Whether this error came out of a provider's generation call.
    ///
    /// These are surfaced to the caller unchanged and never retried.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            HuginnError::Http(_)
                | HuginnError::Api { .. }
                | HuginnError::AuthenticationFailed
                | HuginnError::Stream(_)
                | HuginnError::Llm(_)
        )
    }
}

impl From<llm::error::LLMError> for HuginnError {
    fn from(err: llm::error::LLMError) -> Self {
        let msg = err.to_string();
        if msg.contains("authentication")
            || msg.contains("401")
            || msg.contains("invalid api key")
        {
            HuginnError::AuthenticationFailed
        } else {
            HuginnError::Llm(msg)
        }
    }
}

impl From<rusqlite::Error> for HuginnError {
    fn from(err: rusqlite::Error) -> Self {
        HuginnError::Cache(err.to_string())
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
