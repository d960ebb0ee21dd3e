use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::encoding::text::encode;
use tokio::task::JoinSet;
use tracing::info;

use crate::state::WebhookState;

/// Axum handler that returns Prometheus metrics
async fn metrics_handler(State(state): State<Arc<WebhookState>>) -> Response {
    let mut buffer = String::new();

    if let Err(err) = encode(&mut buffer, &state.registry) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", err),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        buffer,
    )
        .into_response()
}

pub(crate) fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

pub(crate) fn start_metrics(tasks: &mut JoinSet<Result<()>>, state: Arc<WebhookState>) {
    let app = router(state.clone());

    let listen_addr = format!(
        "{}:{}",
        state.config.prometheus.address, state.config.prometheus.port
    );

    tasks.spawn(async move {
        let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
        info!("Serving metrics on http://{listen_addr}");
        axum::serve(listener, app).await?;
        Ok(())
    });
}
