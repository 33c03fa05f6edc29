use std::{any::Any, error::Error as StdError, fmt::Write as _};

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    config::models::DeploymentMode,
    core::envelope::{Envelope, EnvelopeStatus},
    error::GatewayError,
};

const GENERIC_MESSAGE: &str = "Something went wrong!";

/// Turns every pipeline failure into exactly one client response.
///
/// Development mode exposes diagnostics (`error`, `stack`). Production mode
/// shows operational messages as-is and hides everything else behind a
/// generic 500. Upstream rejections are relayed byte-for-byte in both modes.
#[derive(Debug, Clone, Copy)]
pub struct ErrorNormalizer {
    mode: DeploymentMode,
}

impl ErrorNormalizer {
    pub fn new(mode: DeploymentMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    pub fn render(&self, error: GatewayError) -> Response {
        log_error(&error);

        let error = match error {
            GatewayError::Upstream(relayed) => return relayed.into_response(),
            other => other,
        };

        let envelope = if self.mode.is_development() {
            development_envelope(&error)
        } else if error.is_operational() {
            Envelope::failure(error.status(), error.to_string())
        } else {
            Envelope::failure(EnvelopeStatus::Error, GENERIC_MESSAGE)
        };

        (error.status_code(), Json(envelope)).into_response()
    }

    /// Render a panic caught while handling a request.
    pub fn render_panic(&self, payload: Box<dyn Any + Send + 'static>) -> Response {
        self.render(GatewayError::from_panic(payload))
    }
}

fn development_envelope(error: &GatewayError) -> Envelope {
    Envelope::failure(error.status(), error.to_string())
        .with_field(
            "error",
            json!({
                "statusCode": error.status_code().as_u16(),
                "status": error.status(),
                "isOperational": error.is_operational(),
                "kind": error.kind(),
            }),
        )
        .with_field("stack", json!(render_stack(error)))
}

/// Debug rendering of the error followed by its `source()` chain.
fn render_stack(error: &GatewayError) -> String {
    let mut stack = format!("{error:?}");
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(stack, "\nCaused by: {cause}");
        source = cause.source();
    }
    stack
}

fn log_error(error: &GatewayError) {
    let status = error.status_code().as_u16();
    if error.is_operational() {
        tracing::warn!(kind = error.kind(), status, message = %error, "Request failed");
    } else {
        tracing::error!(
            kind = error.kind(),
            status,
            error = ?error,
            "Unexpected error while handling request"
        );
    }
}
