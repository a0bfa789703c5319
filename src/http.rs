//! HTTP server for the Prometheus metrics endpoint.
//!
//! Spawned beside the event loop when `bot.metrics_port` is non-zero.

use axum::{Router, routing::get};
use std::net::SocketAddr;

/// GET /metrics
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

/// Serve `/metrics` on `0.0.0.0:port` until the task is dropped.
///
/// A bind failure is logged and the bot keeps running without metrics.
pub async fn run_http_server(port: u16) {
    let app = Router::new().route("/metrics", get(metrics_handler));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind metrics server on {}: {}", addr, e);
            return;
        }
    };
    tracing::info!("Metrics server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Metrics server error: {}", e);
    }
}
