//! Streaming backpressure via bounded channels.
//!
//! The engine pulls provider chunks through a bounded
//! `tokio::sync::mpsc` channel. A producer that outruns the terminal blocks
//! once the channel is full, so chunks are never buffered without limit.
//!
//! # Usage
//!
//! Applied by [`Engine`](crate::engine::Engine) to every provider stream
//! before the think-tag filter. Capacity comes from
//! [`EngineConfig::stream_buffer`](crate::engine::EngineConfig::stream_buffer).

use futures_util::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use super::traits::TextStream;

/// Default number of chunks buffered between producer and consumer.
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// Wrap a chunk stream in a bounded channel.
///
/// A spawned task forwards items from `inner` in order. It waits whenever
/// `capacity` items are queued, and stops early if the consumer drops the
/// returned stream. A capacity of 0 is treated as 1.
///
/// # Panics
///
/// Requires a tokio runtime context (called within an async fn).
pub fn bounded_stream(inner: TextStream, capacity: usize) -> TextStream {
    let (tx, rx) = tokio::sync::mpsc::channel(capacity.max(1));

    tokio::spawn(async move {
        let mut inner = inner;
        while let Some(item) = inner.next().await {
            if tx.send(item).await.is_err() {
                break; // consumer gone
            }
        }
    });

    Box::pin(ReceiverStream::new(rx))
}
