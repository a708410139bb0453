//! Request fingerprinting.

use crate::types::Request;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// The shape that actually enters the hash. Field order is fixed by the
/// struct definition and headers are already sorted, so serialization is
/// canonical without a normalization pass. Directives are excluded here by
/// construction rather than stripped.
#[derive(Serialize)]
struct CanonicalRequest<'a> {
    method: &'a str,
    headers: &'a BTreeMap<String, String>,
    body: Option<&'a str>,
}

/// Deterministic cache key for a request and its target URL.
///
/// Two requests identical in method, headers, body, and URL produce the
/// same fingerprint regardless of their caching directives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(request: &Request, url: &str) -> Self {
        let canonical = serde_json::to_string(&CanonicalRequest {
            method: &request.method,
            headers: &request.headers,
            body: request.body.as_deref(),
        })
        .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hasher.update(url.as_bytes());
        let hash: String = hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect();
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
