//! HTTP route handlers. Each one hands the buffered request to the core
//! dispatcher and turns its result into an axum response.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, Request, Uri};
use axum::response::{IntoResponse, Response};
use tracing::error;
use wirepact_core::dispatch::DispatchResult;

use super::json_error;
use super::state::AppState;

/// Rebuild the request the core works on from its extracted parts.
fn core_request(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Request<Bytes> {
    let mut request = Request::new(body);
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.headers_mut() = headers;
    request
}

/// Emit the dispatcher's response, or a JSON error and nothing else.
fn respond(result: DispatchResult) -> Response {
    match result {
        Ok(response) => response.map(Body::from).into_response(),
        Err(e) => {
            let status = e.status();
            error!(status = status.as_u16(), error = %e, "request failed");
            json_error(status, &e.to_string()).into_response()
        }
    }
}

/// POST /interactions
pub(crate) async fn handle_register(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = core_request(method, uri, headers, body);
    respond(state.dispatcher.register_interaction(request).await)
}

/// DELETE /interactions
pub(crate) async fn handle_reset(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = core_request(method, uri, headers, body);
    respond(state.dispatcher.reset_interactions(request).await)
}

/// GET /interactions/verification
pub(crate) async fn handle_verification(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = core_request(method, uri, headers, body);
    respond(state.dispatcher.verification_status(request).await)
}

/// POST /pact
pub(crate) async fn handle_write_contract(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = core_request(method, uri, headers, body);
    respond(state.dispatcher.write_contract(request).await)
}

/// Every other route: proxy a registered interaction.
pub(crate) async fn handle_dispatch(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = core_request(method, uri, headers, body);
    respond(state.dispatcher.dispatch(request).await)
}
