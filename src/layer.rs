//! Cache decision engine.
//!
//! [`CacheLayer`] intercepts the request lifecycle at two points: before
//! dispatch it tries to serve the response from storage, and after a live
//! response arrives it stores eligible responses for future reuse. The
//! observation hooks ride the same lifecycle. Caching is strictly an
//! optimization: nothing in this module can change whether a request
//! succeeds or fails, only its latency and the log lines it produces.

use crate::cache::{Clock, Fingerprint, StorageAdapter, SystemClock};
use crate::hooks::Hooks;
use crate::observe::{self, LogSink, TracingSink};
use crate::transport::Transport;
use crate::types::{CachedPayload, Outcome, Request};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Entry lifetime applied when the caller supplies no `expiration`
/// directive, before the `expiration` hook runs.
pub const DEFAULT_EXPIRATION_SECS: u64 = 300;

/// The caching layer: storage, policy hooks, log sink, and clock bound at
/// construction.
pub struct CacheLayer {
    storage: StorageAdapter,
    hooks: Hooks,
    sink: Arc<dyn LogSink>,
    clock: Arc<dyn Clock>,
}

impl CacheLayer {
    pub fn new(storage: StorageAdapter) -> Self {
        Self {
            storage,
            hooks: Hooks::new(),
            sink: Arc::new(TracingSink),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Pre-send hook. Returns `Some` with the stored response on a hit;
    /// the transport must then skip the network call and use it as the
    /// final response. `None` means proceed to transport.
    pub async fn check_cache(&self, request: &Request, url: &str) -> Option<Outcome> {
        let key = Fingerprint::compute(request, url);
        let payload = self.storage.lookup(&key).await?;
        trace!(key = %key, url, "cache hit");
        Some(Outcome::Response(payload.into_response()))
    }

    /// Post-receive hook. Stores the response when the request opted in
    /// and the outcome is a completed response; transport failures are
    /// never cached. Always returns the outcome unchanged: storage is a
    /// side effect, and a rejected write is silently skipped.
    pub async fn set_cache(&self, outcome: Outcome, request: &Request, url: &str) -> Outcome {
        if !request.cache.active {
            return outcome;
        }
        let Outcome::Response(ref response) = outcome else {
            return outcome;
        };

        let key = Fingerprint::compute(request, url);
        let secs = self.hooks.expiration(
            request.cache.expiration.unwrap_or(DEFAULT_EXPIRATION_SECS),
            &outcome,
            request,
            url,
        );
        let payload = CachedPayload::from_response(response);
        if !self
            .storage
            .store(&key, &payload, Duration::from_secs(secs))
            .await
        {
            debug!(key = %key, url, "cache store rejected");
        }
        outcome
    }

    /// Pre-send timestamp hook; see [`crate::types::Timing`].
    pub fn track_request_start(&self, request: &mut Request) {
        observe::track_request_start(request);
    }

    /// Post-receive observation hook; emits at most one log line.
    pub async fn observe(&self, outcome: &Outcome, request: &Request, url: &str) {
        observe::observe(
            outcome,
            request,
            url,
            &self.hooks,
            self.sink.as_ref(),
            self.clock.as_ref(),
        )
        .await;
    }

    /// Drives the full request lifecycle against a transport: stamp, serve
    /// from cache or dispatch, store, observe. A cache hit is terminal and
    /// bypasses the post-receive hooks entirely; hits are never logged or
    /// timed.
    pub async fn execute<T: Transport + ?Sized>(
        &self,
        transport: &T,
        mut request: Request,
        url: &str,
    ) -> Outcome {
        self.track_request_start(&mut request);

        if let Some(hit) = self.check_cache(&request, url).await {
            return hit;
        }

        let outcome = transport.dispatch(&request, url).await;
        let outcome = self.set_cache(outcome, &request, url).await;
        self.observe(&outcome, &request, url).await;
        outcome
    }

    pub fn backend_name(&self) -> &'static str {
        self.storage.backend_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheBackend, ManualClock, ObjectCache};
    use crate::types::{CacheDirectives, HttpResponse, Origin, TransportFailure};
    use std::collections::BTreeMap;

    const URL: &str = "https://example.test/a";

    fn layer_with_clock() -> (CacheLayer, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let backend = Arc::new(ObjectCache::new(clock.clone()));
        let storage = StorageAdapter::new(backend, "http_cache");
        let layer = CacheLayer::new(storage).with_clock(clock.clone());
        (layer, clock)
    }

    fn live_response(status: u16) -> Outcome {
        Outcome::Response(HttpResponse {
            status,
            headers: BTreeMap::from([("content-type".to_string(), "text/plain".to_string())]),
            body: "hello".into(),
            protocol: Some("1.1".into()),
            origin: Origin::Network,
        })
    }

    fn active_request() -> Request {
        Request::get().with_directives(CacheDirectives::new().active())
    }

    #[tokio::test]
    async fn test_set_then_check_roundtrip() {
        let (layer, _) = layer_with_clock();
        let request = active_request();

        let stored = layer.set_cache(live_response(200), &request, URL).await;
        assert_eq!(stored, live_response(200), "set_cache must not alter the outcome");

        let hit = layer.check_cache(&request, URL).await.expect("expected a hit");
        let response = hit.as_response().unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "hello");
        assert_eq!(response.headers.get("content-type").map(String::as_str), Some("text/plain"));
        assert_eq!(response.origin, Origin::Cache);
        assert_eq!(response.protocol, None);
    }

    #[tokio::test]
    async fn test_directives_do_not_fragment_lookups() {
        let (layer, _) = layer_with_clock();

        layer
            .set_cache(live_response(200), &active_request(), URL)
            .await;

        // Identical request minus directives still hits.
        assert!(layer.check_cache(&Request::get(), URL).await.is_some());
    }

    #[tokio::test]
    async fn test_inactive_requests_are_never_stored() {
        let (layer, _) = layer_with_clock();

        layer.set_cache(live_response(200), &Request::get(), URL).await;
        assert!(layer.check_cache(&Request::get(), URL).await.is_none());
    }

    #[tokio::test]
    async fn test_failures_are_never_stored() {
        let (layer, _) = layer_with_clock();
        let request = active_request();

        layer
            .set_cache(
                Outcome::Failure(TransportFailure::new("connection reset")),
                &request,
                URL,
            )
            .await;
        assert!(layer.check_cache(&request, URL).await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let (layer, clock) = layer_with_clock();
        let request =
            Request::get().with_directives(CacheDirectives::new().active().expiration(1));

        layer.set_cache(live_response(200), &request, URL).await;
        assert!(layer.check_cache(&request, URL).await.is_some());

        clock.advance(Duration::from_secs(2));
        assert!(layer.check_cache(&request, URL).await.is_none());
    }

    #[tokio::test]
    async fn test_expiration_hook_overrides_directive() {
        let clock = Arc::new(ManualClock::default());
        let backend = Arc::new(ObjectCache::new(clock.clone()));
        let storage = StorageAdapter::new(backend, "http_cache");

        let mut hooks = Hooks::new();
        hooks.on_expiration("pin-to-one-second", 10, |_, _, _, _| 1);
        let layer = CacheLayer::new(storage).with_hooks(hooks).with_clock(clock.clone());

        let request =
            Request::get().with_directives(CacheDirectives::new().active().expiration(3600));
        layer.set_cache(live_response(200), &request, URL).await;

        clock.advance(Duration::from_secs(2));
        assert!(layer.check_cache(&request, URL).await.is_none());
    }

    #[tokio::test]
    async fn test_overwrite_fully_replaces_entry() {
        let (layer, _) = layer_with_clock();
        let request = active_request();

        layer.set_cache(live_response(200), &request, URL).await;
        layer.set_cache(live_response(204), &request, URL).await;

        let hit = layer.check_cache(&request, URL).await.unwrap();
        assert_eq!(hit.as_response().unwrap().status, 204);
    }

    #[tokio::test]
    async fn test_rejected_store_leaves_outcome_untouched() {
        struct RejectingBackend;

        #[async_trait::async_trait]
        impl CacheBackend for RejectingBackend {
            async fn get(&self, _: &str, _: &str) -> crate::Result<Option<String>> {
                Ok(None)
            }
            async fn set(&self, _: &str, _: &str, _: String, _: Duration) -> crate::Result<bool> {
                Ok(false)
            }
            fn name(&self) -> &'static str {
                "rejecting"
            }
        }

        let storage = StorageAdapter::new(Arc::new(RejectingBackend), "http_cache");
        let layer = CacheLayer::new(storage);

        let outcome = layer
            .set_cache(live_response(200), &active_request(), URL)
            .await;
        assert_eq!(outcome, live_response(200));
    }
}
