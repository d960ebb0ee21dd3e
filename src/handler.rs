use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::{
    error::WebhookError,
    notification::{Acknowledgement, Notification},
    state::{RequestLabels, WebhookState},
};

const MAX_BODY_SIZE: usize = 1024 * 1024;

pub(crate) async fn post(State(state): State<Arc<WebhookState>>, body: Body) -> Response {
    let response = match handle(&state, body).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    };

    state
        .requests_total
        .get_or_create(&RequestLabels {
            status: response.status().as_u16().to_string(),
        })
        .inc();

    response
}

async fn handle(state: &WebhookState, body: Body) -> Result<(), WebhookError> {
    let content = to_bytes(body, MAX_BODY_SIZE)
        .await
        .map_err(WebhookError::BodyUnreadable)?;

    let notification: Notification =
        serde_json::from_slice(&content).map_err(WebhookError::Malformed)?;

    if !notification.is_trusted(&state.config.trusted_prefix) {
        return Err(WebhookError::Untrusted {
            callback_url: notification.callback_url,
        });
    }

    info!(
        repository = %notification.repository.repo_name,
        tag = %notification.push_data.tag,
        "Received push notification"
    );

    let ack = Acknowledgement::success(&state.config.callback);
    state
        .callbacks
        .acknowledge(&notification.callback_url, &ack)
        .await
        .map_err(WebhookError::Callback)?;

    // The callback URL answered, so the notification really came from the registry.
    state.redeployer.redeploy().await?;

    Ok(())
}
