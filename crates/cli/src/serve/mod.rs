//! `wirepact serve` -- HTTP front of the serialization proxy.
//!
//! Sits between a Pact client (or provider verifier) and the Pact mock
//! service, forwarding every request through the core [`Dispatcher`].
//!
//! Endpoints:
//! - DELETE /interactions              - Clear registered interactions
//! - GET    /interactions/verification - Mock service verification probe
//! - POST   /interactions              - Register one interaction
//! - POST   /pact                      - Write the contract with encodings merged in
//! - *      anything else              - Proxy a registered interaction
//!
//! Core errors are answered with a JSON `{"error": ...}` body.

mod handlers;
mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use wirepact_contract::ContractDocument;
use wirepact_core::{Dispatcher, InteractionRegistry, ProxyConfig, ProxyMode};

use self::handlers::{
    handle_dispatch, handle_register, handle_reset, handle_verification, handle_write_contract,
};
use self::state::AppState;
use crate::persist::FsContractWriter;
use crate::upstream::UreqUpstream;

/// Maximum request body size: 10 MB.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Values collected from the `serve` subcommand.
pub(crate) struct ServeOptions {
    pub(crate) upstream_url: String,
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) verification: bool,
    pub(crate) pact_dir: PathBuf,
    pub(crate) contract: Option<PathBuf>,
    pub(crate) cache_schemas: bool,
}

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Build the proxy and serve until Ctrl+C.
///
/// Fails before binding when the upstream URL is unusable or the contract
/// to preload cannot be read.
pub(crate) async fn start_server(options: ServeOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mode = if options.verification {
        ProxyMode::Verification
    } else {
        ProxyMode::Recording
    };
    let config = ProxyConfig::new(&options.upstream_url)?
        .with_mode(mode)
        .with_pact_dir(&options.pact_dir)
        .with_schema_cache(options.cache_schemas);

    let registry = match &options.contract {
        Some(path) => {
            if mode != ProxyMode::Verification {
                warn!(
                    contract = %path.display(),
                    "--contract given without --verification; preloading anyway"
                );
            }
            preload_registry(path)?
        }
        None => InteractionRegistry::new(),
    };

    let dispatcher = Dispatcher::new(
        config,
        Arc::new(registry),
        Arc::new(UreqUpstream::new()),
        Arc::new(FsContractWriter),
    );
    let state = Arc::new(AppState { dispatcher });

    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        %addr,
        %mode,
        upstream = %options.upstream_url,
        pact_dir = %options.pact_dir.display(),
        "wirepact listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/interactions",
            post(handle_register)
                .delete(handle_reset)
                .fallback(handle_dispatch),
        )
        .route(
            "/interactions/verification",
            get(handle_verification).fallback(handle_dispatch),
        )
        .route("/pact", post(handle_write_contract).fallback(handle_dispatch))
        .fallback(handle_dispatch)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Replay a persisted contract into a fresh registry.
fn preload_registry(path: &Path) -> Result<InteractionRegistry, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("failed to read contract {}: {}", path.display(), e))?;
    let document = ContractDocument::from_slice(&bytes)
        .map_err(|e| format!("failed to load contract {}: {}", path.display(), e))?;
    let registry = InteractionRegistry::from_contract(&document);
    info!(
        contract = %path.display(),
        interactions = registry.len(),
        "preloaded interactions"
    );
    Ok(registry)
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
}
