//! Huginn - a command-line assistant backed by local or hosted LLMs
//!
//! Huginn explains shell commands, suggests commands for a task, shows usage
//! examples and summarizes documentation. Requests go through an [`Engine`]
//! that checks a persistent response cache, resolves a provider from an
//! ordered fallback chain (Ollama, LM Studio, then hosted APIs), streams or
//! generates the answer, strips `<think>` reasoning spans and caches the
//! result.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use huginn::{BufferSink, Config, Engine, EngineConfig, Mode, ProviderRegistry, Request};
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let config = Config::load(None)?;
//!     let engine_config = EngineConfig::from_config(&config);
//!     let registry = Arc::new(ProviderRegistry::from_config(
//!         &config.providers,
//!         engine_config.provider.as_deref(),
//!     ));
//!     let cache = huginn::engine::open_cache(&config.cache);
//!     let engine = Engine::new(registry, cache, engine_config);
//!
//!     let mut sink = BufferSink::new();
//!     let outcome = engine
//!         .run(&Request::new(Mode::Explain, "tar -xzvf archive.tar.gz"), &mut sink)
//!         .await?;
//!
//!     println!("{} (via {})", outcome.text, outcome.provider);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod providers;
pub mod telemetry;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheStats, CacheStore, cache_key};
pub use config::Config;
pub use engine::{
    BufferSink, Engine, EngineConfig, Mode, Outcome, OutputFormat, OutputSink, Prompt, Request,
    ResponseSource, WriterSink,
};
pub use error::{HuginnError, Result};
pub use filter::{ThinkFilter, ThinkFilterStream, strip_think_tags};
pub use providers::{Provider, ProviderRegistry, ProviderStatus, TextStream};
pub use version::{PKG_VERSION, version_string};
