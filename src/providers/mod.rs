//! Inference providers and provider resolution.
//!
//! - [`traits::Provider`]: the capability interface every backend implements
//! - [`registry::ProviderRegistry`]: ordered fallback chain and resolution
//! - [`OllamaProvider`], [`OpenAiCompatProvider`]: local servers over HTTP
//! - [`LlmProvider`]: hosted APIs through the llm crate
//! - [`backpressure`]: bounded channel between stream producer and consumer

pub mod backpressure;
pub mod cloud;
mod lines;
pub mod ollama;
pub mod openai_compat;
pub mod registry;
pub mod traits;

pub use cloud::LlmProvider;
pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use registry::{ProviderRegistry, ProviderStatus};
pub use traits::{Provider, TextStream};

/// Selector meaning "no forced provider; walk the fallback chain".
pub const AUTO: &str = "auto";

/// Every provider name huginn knows, in default priority order.
///
/// Local servers first (free, private), then hosted APIs.
pub const KNOWN_PROVIDERS: &[&str] = &[
    "ollama",
    "lmstudio",
    "anthropic",
    "openai",
    "google",
    "openrouter",
];
