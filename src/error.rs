use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::redeploy::RedeployError;

#[derive(Debug, Error)]
pub(crate) enum WebhookError {
    #[error("Could not read request body")]
    BodyUnreadable(#[source] axum::Error),
    #[error("Notification is not valid JSON")]
    Malformed(#[source] serde_json::Error),
    #[error("Got request not from docker hub: {callback_url}")]
    Untrusted { callback_url: String },
    #[error("Callback failed")]
    Callback(#[source] anyhow::Error),
    #[error(transparent)]
    Redeploy(#[from] RedeployError),
}

fn format_error(e: &(dyn std::error::Error + 'static)) -> String {
    let mut s = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        s.push_str(&format!("\nCaused by: {cause}"));
        source = cause.source();
    }
    s
}

impl WebhookError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BodyUnreadable(_) | Self::Malformed(_) | Self::Untrusted { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Callback(_) | Self::Redeploy(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_client_error() {
            warn!(error = %format_error(&self), "Rejected notification");
        } else {
            error!(error = %format_error(&self), "Webhook failed");
        }

        (status, Body::empty()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::redeploy::Step;

    #[test]
    fn status_codes() {
        let untrusted = WebhookError::Untrusted {
            callback_url: "https://example.com".into(),
        };
        assert_eq!(untrusted.into_response().status(), StatusCode::BAD_REQUEST);

        let malformed = WebhookError::Malformed(
            serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        );
        assert_eq!(malformed.into_response().status(), StatusCode::BAD_REQUEST);

        let callback = WebhookError::Callback(anyhow!("connection refused"));
        assert_eq!(
            callback.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let redeploy = WebhookError::from(RedeployError {
            step: Step::Start,
            source: anyhow!("no such container"),
        });
        assert_eq!(
            redeploy.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_chain() {
        let err = WebhookError::from(RedeployError {
            step: Step::Pull,
            source: anyhow!("manifest unknown"),
        });

        assert_eq!(format_error(&err), "pull step failed\nCaused by: manifest unknown");
    }
}
