use super::Transport;
use crate::types::{HttpResponse, Origin, Outcome, Request, TransportFailure};
use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::env;
use std::error::Error as StdError;
use std::time::Duration;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transport error: {0}")]
    Other(String),
}

/// Production transport backed by a pooled reqwest client.
///
/// Timeouts and pool sizing are env-overridable so hosts can tune without a
/// rebuild. Timeout enforcement lives here, not in the caching layer.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let timeout_secs = env::var("OUTBOUND_CACHE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(
                env::var("OUTBOUND_CACHE_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(
                env::var("OUTBOUND_CACHE_POOL_IDLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(90),
            )))
            .build()
            .map_err(TransportError::Http)?;

        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn dispatch(&self, request: &Request, url: &str) -> Outcome {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Outcome::Failure(TransportFailure::new(format!("invalid url: {e}")))
            }
        };

        let mut builder = match request.method.to_uppercase().as_str() {
            "POST" => self.client.post(parsed),
            "PUT" => self.client.put(parsed),
            "DELETE" => self.client.delete(parsed),
            "HEAD" => self.client.head(parsed),
            _ => self.client.get(parsed),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Outcome::Failure(failure_from(&e)),
        };

        let status = response.status().as_u16();
        let protocol = Some(version_label(response.version()).to_string());
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect::<BTreeMap<_, _>>();

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Outcome::Failure(failure_from(&e)),
        };

        Outcome::Response(HttpResponse {
            status,
            headers,
            body,
            protocol,
            origin: Origin::Network,
        })
    }
}

/// Collect the reqwest error and its source chain into failure messages,
/// outermost first.
fn failure_from(err: &reqwest::Error) -> TransportFailure {
    let mut failure = TransportFailure::new(err.to_string());
    let mut source = err.source();
    while let Some(cause) = source {
        failure.push(cause.to_string());
        source = cause.source();
    }
    failure
}

fn version_label(version: reqwest::Version) -> &'static str {
    if version == reqwest::Version::HTTP_09 {
        "0.9"
    } else if version == reqwest::Version::HTTP_10 {
        "1.0"
    } else if version == reqwest::Version::HTTP_2 {
        "2"
    } else if version == reqwest::Version::HTTP_3 {
        "3"
    } else {
        "1.1"
    }
}
