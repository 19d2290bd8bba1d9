//! Admin endpoint: liveness and Prometheus exposition.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use idv_telemetry::PrometheusObserver;
use shared_types::NodeId;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Clone)]
struct AdminState {
    node_id: NodeId,
    metrics: Arc<PrometheusObserver>,
}

/// `GET /health` and `GET /metrics`.
pub fn admin_router(node_id: NodeId, metrics: Arc<PrometheusObserver>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .with_state(AdminState { node_id, metrics })
}

async fn health(State(state): State<AdminState>) -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "node_id": state.node_id }))
}

async fn render_metrics(State(state): State<AdminState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        ),
        Err(e) => {
            error!("[node] Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                e.to_string(),
            )
        }
    }
}

/// Serve `router` on `addr` until the shutdown flag is raised.
pub async fn serve_admin(
    addr: SocketAddr,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "[node] Admin endpoint listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
}
