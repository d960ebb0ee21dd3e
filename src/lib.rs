use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{HeaderName, Request},
    routing::post,
};
use tokio::task::JoinSet;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, info_span};

pub use config::Configuration;
pub use engine::ContainerEngine;
pub use state::WebhookState;

mod callback;
mod config;
mod engine;
mod error;
mod handler;
mod metrics;
mod notification;
mod redeploy;
mod state;


const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: Arc<WebhookState>) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/docker-webhook", post(handler::post))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get(REQUEST_ID_HEADER)
                            .and_then(|value| value.to_str().ok())
                            .unwrap_or("invalid-request-id");

                        info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id,
                        )
                    }),
                )
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
}

/// Connects to the container engine named by the environment.
pub fn docker_engine() -> Result<Arc<dyn ContainerEngine>> {
    Ok(Arc::new(engine::DockerEngine::from_env()?))
}

/// Spawns the webhook and metrics listeners. A task finishing means its
/// listener failed or stopped serving.
pub fn start(
    tasks: &mut JoinSet<Result<()>>,
    config: Configuration,
    engine: Arc<dyn ContainerEngine>,
) {
    let state = Arc::new(WebhookState::new(config, engine));

    metrics::start_metrics(tasks, state.clone());

    let listen_addr = state.config.listen_addr();
    let app = router(state);

    tasks.spawn(async move {
        let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
        info!("Serving on http://{listen_addr}");
        axum::serve(listener, app).await?;
        Ok(())
    });
}
