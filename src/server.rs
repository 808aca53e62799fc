//! HTTP surface: the streamable MCP endpoint plus a health probe
//!
//! ```text
//! POST/GET/DELETE /mcp   MCP streamable HTTP (session via Mcp-Session-Id)
//! GET /health            liveness and session count
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::mcp_bridge::TfcMcpBridge;
use crate::mcp_session::CredentialSessionManager;
use crate::session::SessionStore;

/// Shared state for the non-MCP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
}

/// Build the axum router serving `bridge` at `/mcp`
pub fn router(bridge: TfcMcpBridge, store: Arc<SessionStore>) -> Router {
    let session_manager = Arc::new(CredentialSessionManager::new(store.clone()));
    let mcp_service = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        session_manager,
        StreamableHttpServerConfig::default(),
    );

    Router::new()
        .nest_service("/mcp", mcp_service)
        .route("/health", get(health_handler))
        .fallback(fallback_handler)
        .layer(middleware::from_fn(log_request_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { store })
}

/// Middleware to log HTTP requests. Headers are not logged since they may
/// carry session ids.
async fn log_request_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    tracing::debug!("tfc-mcp: {} {}", method, uri);

    next.run(request).await
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "sessions": state.store.len(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn fallback_handler(request: Request) -> impl IntoResponse {
    let uri = request.uri().clone();
    tracing::warn!("tfc-mcp: Unmatched route: {}", uri);

    (
        StatusCode::NOT_FOUND,
        [("content-type", "application/json")],
        r#"{"error": "Not found", "hint": "MCP endpoint is at /mcp"}"#,
    )
}
