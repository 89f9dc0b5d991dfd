//! Telemetry metric name constants.
//!
//! Centralised metric names for huginn operations. Embedders install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider` — provider name (e.g. "ollama", "anthropic")
//! - `mode` — request mode (e.g. "explain", "summarize")
//! - `status` — outcome

/// Total requests handled by the engine.
///
/// Labels: `mode`, `source` ("cached" | "streamed" | "generated" | "none"),
/// `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "huginn_requests_total";

/// Request duration in seconds, cache hits included.
///
/// Labels: `mode`.
pub const REQUEST_DURATION_SECONDS: &str = "huginn_request_duration_seconds";

/// Total provider availability probes.
///
/// Labels: `provider`, `status` ("available" | "unavailable" | "error").
pub const PROBES_TOTAL: &str = "huginn_probes_total";

/// Total response cache hits.
///
/// Labels: `mode`.
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Total response cache misses (read errors count as misses).
///
/// Labels: `mode`.
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Total responses rejected as empty after filtering.
///
/// Labels: `provider`.
pub const EMPTY_RESPONSES_TOTAL: &str = "huginn_empty_responses_total";
