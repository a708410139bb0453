//! Outgoing request description.

use std::collections::BTreeMap;
use std::time::Instant;

/// Latency-tracking state for a single request.
///
/// Callers set [`Timing::Requested`]; the layer's pre-send hook replaces it
/// with [`Timing::Started`] carrying the dispatch timestamp, which then
/// travels with the request through the transport call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timing {
    /// No latency tracking.
    #[default]
    Off,
    /// Caller asked for latency tracking; not yet stamped.
    Requested,
    /// Stamped by the pre-send hook.
    Started(Instant),
}

impl Timing {
    pub fn is_started(&self) -> bool {
        matches!(self, Timing::Started(_))
    }

    /// Milliseconds elapsed since the stamp, if one was taken.
    pub fn elapsed_ms(&self) -> Option<u128> {
        match self {
            Timing::Started(at) => Some(at.elapsed().as_millis()),
            _ => None,
        }
    }
}

/// Per-request caching and observation directives.
///
/// Directives steer the layer only and are excluded from the request
/// fingerprint, so toggling them never fragments the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheDirectives {
    /// Store the response for future reuse.
    pub active: bool,
    /// Emit a log line when the response classifies as an error.
    pub log_errors: bool,
    /// Latency tracking state; mutated only by the pre-send hook.
    pub log_request_times: Timing,
    /// Entry lifetime in seconds. `None` means the 300s default.
    pub expiration: Option<u64>,
}

impl CacheDirectives {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(mut self) -> Self {
        self.active = true;
        self
    }

    pub fn log_errors(mut self) -> Self {
        self.log_errors = true;
        self
    }

    pub fn log_request_times(mut self) -> Self {
        self.log_request_times = Timing::Requested;
        self
    }

    pub fn expiration(mut self, seconds: u64) -> Self {
        self.expiration = Some(seconds);
        self
    }
}

/// An outgoing HTTP request as seen by the caching layer.
///
/// Headers live in a sorted map so the canonical serialization used for
/// fingerprinting is independent of insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub cache: CacheDirectives,
}

impl Request {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            headers: BTreeMap::new(),
            body: None,
            cache: CacheDirectives::default(),
        }
    }

    pub fn get() -> Self {
        Self::new("GET")
    }

    pub fn post() -> Self {
        Self::new("POST")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_directives(mut self, directives: CacheDirectives) -> Self {
        self.cache = directives;
        self
    }

    /// The request's user agent, if one was set.
    pub fn user_agent(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
            .map(|(_, value)| value.as_str())
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::get()
    }
}
