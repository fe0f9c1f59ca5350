// src/server/metrics_server.rs

use crate::core::metrics::{self, gather_metrics};
use crate::core::state::ServerState;
use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Updates gauges derived from server state, then encodes every registered
/// metric in the Prometheus text format.
pub(crate) fn render_metrics(state: &ServerState) -> String {
    metrics::CONNECTION_GROUPS.set(state.groups.len() as f64);
    gather_metrics()
}

/// Handles HTTP requests to the /metrics endpoint.
async fn metrics_handler(state: Arc<ServerState>) -> impl IntoResponse {
    let body = render_metrics(&state);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        body,
    )
}

/// Runs a simple HTTP server to expose Prometheus metrics on /metrics.
pub async fn run_metrics_server(state: Arc<ServerState>, shutdown: CancellationToken) {
    let host = state.config.host.clone();
    let port = state.config.metrics.port;

    let app = Router::new().route("/metrics", get(move || metrics_handler(state.clone())));

    let listener = match tokio::net::TcpListener::bind((host.as_str(), port)).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind metrics server on port {}: {}", port, e);
            return;
        }
    };
    info!(
        "Prometheus metrics server listening on http://{}:{}/metrics",
        host, port
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("Metrics server shutting down.");
        })
        .await
    {
        error!("Metrics server failed: {}", e);
    }
}
