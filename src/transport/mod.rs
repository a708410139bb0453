//! Transport collaborator interface.
//!
//! The layer never sends bytes itself. A [`Transport`] dispatches the
//! request when the cache misses; transport failures are carried as values
//! in [`Outcome`] so the post-receive hooks can classify them without an
//! error channel. [`HttpTransport`] is the production implementation.

mod http;

pub use http::{HttpTransport, TransportError};

use crate::types::{Outcome, Request};
use async_trait::async_trait;

/// Capability contract for dispatching a request over the wire.
///
/// Implementations must report failures as [`Outcome::Failure`] values
/// rather than panicking or short-circuiting; the layer relies on every
/// dispatch producing an outcome it can observe.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, request: &Request, url: &str) -> Outcome;
}
