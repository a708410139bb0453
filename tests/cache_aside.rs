//! End-to-end cache-aside behavior against a counting in-process transport.

use async_trait::async_trait;
use outbound_cache::{
    CacheBackend, CacheDirectives, CacheLayer, HttpResponse, ManualClock, MemorySink, ObjectCache,
    Origin, Outcome, Request, StorageAdapter, Timing, Transport, TransportFailure,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const URL: &str = "https://example.test/a";

/// Route the layer's internal `debug!` fault traces to stderr when
/// RUST_LOG is set; repeated init attempts are harmless.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Transport double that counts dispatches and replays a canned outcome.
struct CountingTransport {
    dispatches: AtomicUsize,
    outcome: Outcome,
}

impl CountingTransport {
    fn returning(outcome: Outcome) -> Self {
        Self {
            dispatches: AtomicUsize::new(0),
            outcome,
        }
    }

    fn dispatch_count(&self) -> usize {
        self.dispatches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for CountingTransport {
    async fn dispatch(&self, _request: &Request, _url: &str) -> Outcome {
        self.dispatches.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

fn live_ok() -> Outcome {
    Outcome::Response(HttpResponse {
        status: 200,
        headers: BTreeMap::from([("content-type".to_string(), "application/json".to_string())]),
        body: "[{\"post_title\":\"hello\"}]".into(),
        protocol: Some("1.1".into()),
        origin: Origin::Network,
    })
}

fn layer_with_sink() -> (CacheLayer, Arc<MemorySink>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let backend = Arc::new(ObjectCache::new(clock.clone()));
    let storage = StorageAdapter::new(backend, "http_cache");
    let sink = Arc::new(MemorySink::default());
    let layer = CacheLayer::new(storage)
        .with_sink(sink.clone())
        .with_clock(clock.clone());
    (layer, sink, clock)
}

#[tokio::test]
async fn test_miss_store_hit_scenario() {
    init_tracing();
    let (layer, _, _) = layer_with_sink();
    let transport = CountingTransport::returning(live_ok());

    let first = layer
        .execute(
            &transport,
            Request::get().with_directives(CacheDirectives::new().active().expiration(60)),
            URL,
        )
        .await;
    assert_eq!(transport.dispatch_count(), 1);
    assert_eq!(first.as_response().unwrap().origin, Origin::Network);

    // Identical request minus directives: served from storage, transport
    // untouched, same body.
    let second = layer.execute(&transport, Request::get(), URL).await;
    assert_eq!(transport.dispatch_count(), 1);
    let replay = second.as_response().unwrap();
    assert_eq!(replay.origin, Origin::Cache);
    assert_eq!(replay.body, first.as_response().unwrap().body);
    assert_eq!(replay.status, 200);
}

#[tokio::test]
async fn test_expired_entry_dispatches_again() {
    let (layer, _, clock) = layer_with_sink();
    let transport = CountingTransport::returning(live_ok());
    let request = || Request::get().with_directives(CacheDirectives::new().active().expiration(1));

    layer.execute(&transport, request(), URL).await;
    clock.advance(Duration::from_secs(2));
    layer.execute(&transport, request(), URL).await;

    assert_eq!(transport.dispatch_count(), 2);
}

#[tokio::test]
async fn test_cache_hits_bypass_observation() {
    let (layer, sink, _) = layer_with_sink();
    let transport = CountingTransport::returning(live_ok());
    let request = || {
        Request::get().with_directives(
            CacheDirectives::new()
                .active()
                .log_errors()
                .log_request_times(),
        )
    };

    // Live call: timed, so exactly one line.
    layer.execute(&transport, request(), URL).await;
    assert_eq!(sink.len(), 1);

    // Hit: terminal before the post-receive hooks, no further lines.
    layer.execute(&transport, request(), URL).await;
    assert_eq!(transport.dispatch_count(), 1);
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn test_failures_propagate_unchanged_and_are_not_cached() {
    let (layer, sink, _) = layer_with_sink();
    let failure = Outcome::Failure(TransportFailure::new("connection refused"));
    let transport = CountingTransport::returning(failure.clone());
    let request =
        || Request::get().with_directives(CacheDirectives::new().active().log_errors());

    let first = layer.execute(&transport, request(), URL).await;
    assert_eq!(first, failure);
    assert_eq!(sink.len(), 1);
    assert!(sink.lines()[0].message.contains("Transport Error:"));

    // Nothing was stored, so the next call dispatches (and logs) again.
    let second = layer.execute(&transport, request(), URL).await;
    assert_eq!(second, failure);
    assert_eq!(transport.dispatch_count(), 2);
    assert_eq!(sink.len(), 2);
}

#[tokio::test]
async fn test_execute_stamps_requested_timing() {
    let (layer, sink, _) = layer_with_sink();
    let transport = CountingTransport::returning(live_ok());

    let request =
        Request::get().with_directives(CacheDirectives::new().log_request_times());
    assert_eq!(request.cache.log_request_times, Timing::Requested);

    layer.execute(&transport, request, URL).await;

    assert_eq!(sink.len(), 1);
    let line = &sink.lines()[0].message;
    assert!(line.contains("HTTP/1.1"));
    line.rsplit("Request Latency: ")
        .next()
        .and_then(|suffix| suffix.strip_suffix("ms"))
        .and_then(|ms| ms.parse::<u64>().ok())
        .expect("line should end with a parseable latency suffix");
}

#[tokio::test]
async fn test_untimed_unlogged_requests_stay_silent() {
    let (layer, sink, _) = layer_with_sink();
    let transport = CountingTransport::returning(live_ok());

    layer.execute(&transport, Request::get(), URL).await;
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_storage_fault_never_fails_the_request() {
    struct OfflineBackend;

    #[async_trait]
    impl CacheBackend for OfflineBackend {
        async fn get(&self, _: &str, _: &str) -> outbound_cache::Result<Option<String>> {
            Err(outbound_cache::Error::Storage("backend offline".into()))
        }
        async fn set(
            &self,
            _: &str,
            _: &str,
            _: String,
            _: Duration,
        ) -> outbound_cache::Result<bool> {
            Err(outbound_cache::Error::Storage("backend offline".into()))
        }
        fn name(&self) -> &'static str {
            "offline"
        }
    }

    init_tracing();
    let storage = StorageAdapter::new(Arc::new(OfflineBackend), "http_cache");
    let layer = CacheLayer::new(storage);
    let transport = CountingTransport::returning(live_ok());

    let outcome = layer
        .execute(
            &transport,
            Request::get().with_directives(CacheDirectives::new().active()),
            URL,
        )
        .await;

    assert_eq!(outcome.as_response().unwrap().status, 200);
    assert_eq!(transport.dispatch_count(), 1);
}
