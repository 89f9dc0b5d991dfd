//! Tests for metrics emission.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use huginn::cache::CacheStore;
use huginn::engine::{BufferSink, Engine, EngineConfig, Mode, Prompt, Request};
use huginn::providers::{Provider, ProviderRegistry};
use huginn::{Result, telemetry};

// ============================================================================
// Mock providers
// ============================================================================

struct MockProvider {
    name: &'static str,
    available: bool,
    response: &'static str,
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn probe(&self) -> Result<bool> {
        Ok(self.available)
    }

    async fn generate(&self, _prompt: &Prompt) -> Result<String> {
        Ok(self.response.to_string())
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

fn engine(providers: Vec<MockProvider>, cache: Option<Arc<CacheStore>>) -> Engine {
    let mut registry = ProviderRegistry::new();
    for p in providers {
        registry.add(Arc::new(p));
    }
    Engine::new(
        Arc::new(registry),
        cache,
        EngineConfig::default().stream(false),
    )
}

/// Run `f` to completion with `recorder` installed for the current thread.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
fn recorded<F: std::future::Future>(recorder: &DebuggingRecorder, f: F) -> F::Output {
    metrics::with_local_recorder(recorder, || {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(f))
    })
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn successful_request_records_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let engine = engine(
        vec![
            MockProvider { name: "down", available: false, response: "" },
            MockProvider { name: "up", available: true, response: "answer" },
        ],
        None,
    );
    let result = recorded(&recorder, async {
        engine
            .run(&Request::new(Mode::Explain, "ls"), &mut BufferSink::new())
            .await
    });
    assert!(result.is_ok());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::PROBES_TOTAL), 2);
    assert!(
        has_histogram(&snapshot, telemetry::REQUEST_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn cache_hits_and_misses_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let cache = Arc::new(CacheStore::in_memory(7).unwrap());
    let engine = engine(
        vec![MockProvider { name: "up", available: true, response: "answer" }],
        Some(cache),
    );
    recorded(&recorder, async {
        let request = Request::new(Mode::Explain, "ls");
        engine.run(&request, &mut BufferSink::new()).await.unwrap();
        engine.run(&request, &mut BufferSink::new()).await.unwrap();
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::PROBES_TOTAL), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn empty_response_is_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let engine = engine(
        vec![MockProvider { name: "blank", available: true, response: "  " }],
        None,
    );
    let result = recorded(&recorder, async {
        engine
            .run(&Request::new(Mode::Explain, "ls"), &mut BufferSink::new())
            .await
    });
    assert!(result.is_err());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::EMPTY_RESPONSES_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn no_provider_records_error_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let engine = engine(vec![], None);
    let _result = recorded(&recorder, async {
        engine
            .run(&Request::new(Mode::Explain, "ls"), &mut BufferSink::new())
            .await
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL), 1);
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let engine = engine(
        vec![MockProvider { name: "up", available: true, response: "answer" }],
        None,
    );
    engine
        .run(&Request::new(Mode::Explain, "ls"), &mut BufferSink::new())
        .await
        .unwrap();
}
