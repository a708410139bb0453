//! # outbound-cache
//!
//! A transparent cache-aside layer for outgoing HTTP requests: serve a
//! stored response when a valid one exists, otherwise let the request
//! proceed and store the result for future reuse, with optional latency
//! tracking and error logging riding the same lifecycle.
//!
//! ## Overview
//!
//! The layer interposes on the request lifecycle at two points. Before
//! dispatch it derives a deterministic fingerprint from the request and
//! asks storage for a valid entry; a hit short-circuits the transport
//! entirely. After a live response arrives, eligible responses are stored
//! under the same fingerprint with a TTL, and the observation path decides
//! whether the request earned a log line.
//!
//! Caching is purely an optimization: no fault in this crate is ever fatal
//! to a request. Storage faults degrade to misses or skipped stores, and a
//! log sink error can never abort the pipeline.
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`layer`] | Cache decision engine and lifecycle driver |
//! | [`cache`] | Request fingerprinting and TTL storage backends |
//! | [`observe`] | Latency tracking, error classification, log sink |
//! | [`hooks`] | Policy override extension points |
//! | [`transport`] | Transport collaborator trait and reqwest implementation |
//! | [`types`] | Request/response data model |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use outbound_cache::{
//!     CacheDirectives, CacheLayer, HttpTransport, Request, StorageAdapter, StorageConfig,
//!     SystemClock,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> outbound_cache::Result<()> {
//!     let storage = StorageAdapter::from_config(&StorageConfig::new(), Arc::new(SystemClock));
//!     let layer = CacheLayer::new(storage);
//!     let transport = HttpTransport::new()?;
//!
//!     let request = Request::get()
//!         .with_directives(CacheDirectives::new().active().expiration(60));
//!
//!     // First call dispatches and stores; an identical second call is
//!     // served from storage without touching the network.
//!     let outcome = layer
//!         .execute(&transport, request, "https://example.test/a")
//!         .await;
//!     println!("{:?}", outcome.as_response().map(|r| r.status));
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod hooks;
pub mod layer;
pub mod observe;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use cache::{
    CacheBackend, Clock, FileStore, Fingerprint, ManualClock, ObjectCache, StorageAdapter,
    StorageConfig, SystemClock,
};
pub use error::Error;
pub use hooks::Hooks;
pub use layer::{CacheLayer, DEFAULT_EXPIRATION_SECS};
pub use observe::{LogContext, LogLevel, LogSink, MemorySink, TracingSink};
pub use transport::{HttpTransport, Transport};
pub use types::{
    CacheDirectives, CachedPayload, HttpResponse, Origin, Outcome, Request, Timing,
    TransportFailure,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
