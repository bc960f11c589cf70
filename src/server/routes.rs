//! Axum HTTP routes for the metrics endpoint.

use crate::error::Result;
use crate::metrics::PrometheusSink;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub sink: Arc<PrometheusSink>,
}

// ─── Route builder ───────────────────────────────────────────────

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Handlers ────────────────────────────────────────────────────

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.sink.encode() {
        Ok(body) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "dirsize-exporter",
    }))
}

// ─── Server ──────────────────────────────────────────────────────

/// Serve `/metrics` until ctrl-c
pub async fn serve(addr: SocketAddr, sink: Arc<PrometheusSink>) -> Result<()> {
    let router = build_router(Arc::new(AppState { sink }));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Metrics endpoint listening on http://{}/metrics", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Metrics endpoint shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
}
