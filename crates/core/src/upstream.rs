//! The outbound HTTP capability the dispatcher forwards through.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::UpstreamError;

/// Sends one request to the upstream core.
///
/// Requests carry an absolute URI. Every HTTP status, including 4xx and 5xx,
/// is a successful exchange; only transport failures are errors. A request
/// is attempted exactly once.
#[async_trait]
pub trait UpstreamClient: Send + Sync + 'static {
    async fn send(&self, request: http::Request<Bytes>)
        -> Result<http::Response<Bytes>, UpstreamError>;
}
