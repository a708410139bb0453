//! Response union and the serialized cache-entry form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a completed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Produced by a live transport dispatch.
    Network,
    /// Replayed from the cache; no live connection was made.
    Cache,
}

/// A completed HTTP response.
///
/// Cache replays carry `origin: Cache` and no protocol version, since the
/// underlying connection object does not survive serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    /// Negotiated HTTP version as reported by the transport ("1.1", "2").
    pub protocol: Option<String>,
    pub origin: Origin,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A transport-level failure carrying one or more messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub messages: Vec<String>,
}

impl TransportFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// All messages joined for display, oldest first.
    pub fn joined(&self) -> String {
        self.messages.join(", ")
    }
}

/// The result of a request: either a completed response or a transport
/// failure. Both shapes flow through the same post-receive hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Response(HttpResponse),
    Failure(TransportFailure),
}

impl Outcome {
    pub fn as_response(&self) -> Option<&HttpResponse> {
        match self {
            Outcome::Response(response) => Some(response),
            Outcome::Failure(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }
}

/// The subset of a response that survives a cache round trip.
///
/// Stored as a single JSON object; `body` is a plain string field, never a
/// nested JSON-encoded blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPayload {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl CachedPayload {
    pub fn from_response(response: &HttpResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
        }
    }

    /// Rehydrate into a response marked as a cache replay.
    pub fn into_response(self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
            protocol: None,
            origin: Origin::Cache,
        }
    }
}
