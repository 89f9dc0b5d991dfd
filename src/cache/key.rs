//! Cache key derivation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request.
///
/// `hex(SHA-256("{text}:{mode}:{provider}"))`, lowercase. Stable across
/// processes and platforms, so the on-disk store can be shared between
/// invocations.
pub fn cache_key(text: &str, mode: &str, provider: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b":");
    hasher.update(mode.as_bytes());
    hasher.update(b":");
    hasher.update(provider.as_bytes());
    format!("{:x}", hasher.finalize())
}
