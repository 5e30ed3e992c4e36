//! `docket serve` -- HTTP JSON API for the document workflow engine.
//!
//! Exposes the lifecycle graph, the document store, and the transition
//! executor as an async HTTP service using `axum` + `tokio`. Documents
//! live in the in-memory backend for the lifetime of the process, and
//! every response body is JSON.
//!
//! Requests pass through permissive CORS, a per-IP rate limiter
//! (`DOCKET_RATE_LIMIT` requests per minute, default 60), and an API key
//! check that activates when `DOCKET_API_KEY` is set.
//!
//! Endpoints:
//! - GET  /health                              - Server status (exempt from auth)
//! - GET  /graph                               - Lifecycle graph with ETag
//! - GET  /documents                           - List documents (kind/status filters)
//! - POST /documents                           - Register a document at draft
//! - GET  /documents/{kind}/{id}               - Current standing of a document
//! - GET  /documents/{kind}/{id}/transitions   - Destinations open to a role
//! - GET  /documents/{kind}/{id}/history       - Transition history, newest first
//! - POST /transitions                         - Execute one transition
//! - POST /transitions/bulk                    - Move several documents at once

mod handlers;
mod middleware;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{
    handle_available_transitions, handle_bulk_transition, handle_create_document,
    handle_get_document, handle_graph, handle_health, handle_history, handle_list_documents,
    handle_not_found, handle_transition,
};
use self::middleware::{auth_middleware, rate_limit_middleware};
use self::state::AppState;

/// Request bodies above this size are rejected before any handler runs.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Error body shape shared by every endpoint.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// The full route table with middleware applied.
///
/// Layer order, outermost first: body limit, CORS, rate limiting, auth.
/// Rate limiting runs before auth so unauthenticated floods are counted
/// too; `/health` answers rate-limited but never asks for a key.
fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/graph", get(handle_graph))
        .route(
            "/documents",
            get(handle_list_documents).post(handle_create_document),
        )
        .route("/documents/{kind}/{id}", get(handle_get_document))
        .route(
            "/documents/{kind}/{id}/transitions",
            get(handle_available_transitions),
        )
        .route("/documents/{kind}/{id}/history", get(handle_history))
        .route("/transitions", post(handle_transition))
        .route("/transitions/bulk", post(handle_bulk_transition))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Bind and serve until shutdown.
///
/// With both TLS paths set the server speaks HTTPS via `axum-server` and
/// rustls (the `tls` feature); otherwise plain HTTP with graceful
/// shutdown on Ctrl+C.
pub async fn start_server(
    port: u16,
    _tls_cert: Option<PathBuf>,
    _tls_key: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::from_env());
    eprintln!(
        "rate limit: {} requests per minute per IP",
        state.rate_limiter.limit
    );
    if state.api_key.is_some() {
        eprintln!("API key required (DOCKET_API_KEY is set)");
    }

    let app = build_router(state);
    let addr = format!("0.0.0.0:{}", port);

    #[cfg(feature = "tls")]
    if let (Some(cert), Some(key)) = (&_tls_cert, &_tls_key) {
        let config = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key).await?;
        let socket_addr: std::net::SocketAddr = addr.parse()?;
        eprintln!("docket API listening on https://0.0.0.0:{}", port);
        axum_server::bind_rustls(socket_addr, config)
            .serve(app.into_make_service_with_connect_info::<std::net::SocketAddr>())
            .await?;
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("docket API listening on http://0.0.0.0:{}", port);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    eprintln!("server stopped");
    Ok(())
}

/// Resolves when Ctrl+C arrives.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    eprintln!("\nshutting down");
}
