//! `ureq`-backed upstream client.
//!
//! `ureq` is synchronous, so every exchange runs inside
//! `tokio::task::spawn_blocking` to keep the async runtime free.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use wirepact_core::{UpstreamClient, UpstreamError};

/// Forwards requests to the Pact mock service.
///
/// HTTP error statuses are ordinary responses here: the mock service
/// reports mismatches with 500s the caller has to see.
pub(crate) struct UreqUpstream {
    agent: ureq::Agent,
}

impl UreqUpstream {
    pub(crate) fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        UreqUpstream {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

#[async_trait]
impl UpstreamClient for UreqUpstream {
    async fn send(
        &self,
        request: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, UpstreamError> {
        let url = request.uri().to_string();
        let agent = self.agent.clone();
        let task_url = url.clone();

        let result = tokio::task::spawn_blocking(move || -> Result<_, UpstreamError> {
            let (parts, body) = request.into_parts();
            let transport = |e: ureq::Error| UpstreamError::Transport {
                url: task_url.clone(),
                message: e.to_string(),
            };

            let response = if body.is_empty() {
                agent.run(http::Request::from_parts(parts, ()))
            } else {
                agent.run(http::Request::from_parts(parts, body.to_vec()))
            }
            .map_err(transport)?;

            let (parts, mut body) = response.into_parts();
            let bytes = body.read_to_vec().map_err(transport)?;
            Ok(http::Response::from_parts(parts, Bytes::from(bytes)))
        })
        .await
        .map_err(|e| UpstreamError::Transport {
            url: url.clone(),
            message: format!("task join error: {}", e),
        })?;

        if let Ok(response) = &result {
            debug!(%url, status = response.status().as_u16(), "upstream responded");
        }
        result
    }
}
