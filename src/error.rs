use thiserror::Error;

/// Unified error type for the caching layer.
///
/// The layer degrades to a cache miss or a skipped store rather than
/// failing the request, so these errors surface through backend
/// implementations and construction, never through the per-request hooks.
#[derive(Debug, Error)]
pub enum Error {
    #[error("storage backend error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),
}
