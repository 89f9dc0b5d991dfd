//! The inference capability interface.
//!
//! Every backend, local or cloud, implements [`Provider`]. The registry only
//! ever talks to this trait, so platform, credential, and network checks
//! live inside each provider's [`probe`](Provider::probe) and never in the
//! resolver.
//!
//! # Availability
//!
//! `probe()` answers "can this provider serve a request right now?":
//! - `Ok(true)` — ready
//! - `Ok(false)` — unavailable for an ordinary reason (server not running,
//!   API key missing, model not pulled). The registry moves on silently.
//! - `Err(_)` — the probe itself broke. Propagated to the caller.
//!
//! # Example
//!
//! ```ignore
//! async fn probe(&self) -> Result<bool> {
//!     Ok(self.api_key.as_deref().is_some_and(|k| !k.is_empty()))
//! }
//! ```

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::engine::Prompt;
use crate::{HuginnError, Result};

/// Ordered stream of generated text chunks.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// An inference backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier (e.g. "ollama", "anthropic"). Used for `--provider`,
    /// cache keys, and logging.
    fn name(&self) -> &str;

    /// Whether [`generate_stream`](Self::generate_stream) may be called.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Check whether this provider can serve requests right now.
    async fn probe(&self) -> Result<bool>;

    /// Generate a complete response.
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// Generate a response as an ordered stream of text chunks.
    ///
    /// Only called when [`supports_streaming`](Self::supports_streaming)
    /// returns true.
    async fn generate_stream(&self, _prompt: &Prompt) -> Result<TextStream> {
        Err(HuginnError::Unsupported)
    }
}

impl std::fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider").field("name", &self.name()).finish_non_exhaustive()
    }
}
