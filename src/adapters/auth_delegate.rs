use std::{sync::Arc, time::Duration};

use axum::body::Body as AxumBody;
use http::{HeaderValue, Method, Request, header};
use serde::Deserialize;
use tracing::Instrument;

use crate::{
    core::{identity::Identity, relay::RelayedResponse},
    error::{AUTH_UNAVAILABLE, GatewayError, GatewayResult, TOKEN_MISSING},
    ports::http_client::{HttpClient, HttpClientError},
    tracing_setup::create_introspection_span,
};

pub const INTROSPECT_PATH: &str = "/api/v1/auth/introspect";

#[derive(Deserialize)]
struct IntrospectionBody {
    data: Identity,
}

/// Resolves a caller's identity by delegating token validation to the auth
/// service's introspection endpoint.
///
/// The token is never inspected locally; the `Authorization` value is passed
/// through verbatim.
pub struct AuthDelegate {
    client: Arc<dyn HttpClient>,
    introspect_url: String,
    timeout: Duration,
}

impl AuthDelegate {
    pub fn new(client: Arc<dyn HttpClient>, auth_service_host: &str, timeout: Duration) -> Self {
        Self {
            client,
            introspect_url: format!(
                "{}{INTROSPECT_PATH}",
                auth_service_host.trim_end_matches('/')
            ),
            timeout,
        }
    }

    pub fn introspect_url(&self) -> &str {
        &self.introspect_url
    }

    /// Authenticate the caller.
    ///
    /// * missing or empty token: 401 without contacting the auth service
    /// * non-2xx from the auth service: relayed to the caller unchanged
    /// * no response within the timeout: 504
    /// * 2xx with a body lacking `data.id`/`data.role`: non-operational 500
    pub async fn authenticate(
        &self,
        authorization: Option<&HeaderValue>,
    ) -> GatewayResult<Identity> {
        let token = match authorization {
            Some(value) if !value.is_empty() => value.clone(),
            _ => return Err(GatewayError::Unauthorized(TOKEN_MISSING.to_string())),
        };

        let span = create_introspection_span(&self.introspect_url);
        let result = self.introspect(token).instrument(span.clone()).await;

        let outcome = match &result {
            Ok(_) => "authenticated",
            Err(GatewayError::Upstream(_)) => "rejected",
            Err(GatewayError::ServiceUnavailable(_)) => "unavailable",
            Err(_) => "failed",
        };
        span.record("auth.outcome", outcome);
        result
    }

    async fn introspect(&self, token: HeaderValue) -> GatewayResult<Identity> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(&self.introspect_url)
            .header(header::AUTHORIZATION, token)
            .body(AxumBody::empty())
            .map_err(|e| GatewayError::internal_with("Failed to build introspection request", e))?;

        let response = self
            .client
            .send_request(request, self.timeout)
            .await
            .map_err(|e| match e {
                e if e.is_transport() => {
                    tracing::warn!(error = %e, "Auth service did not respond");
                    GatewayError::ServiceUnavailable(AUTH_UNAVAILABLE.to_string())
                }
                HttpClientError::InvalidRequest(msg) => {
                    GatewayError::internal(format!("Invalid introspection request: {msg}"))
                }
                other => GatewayError::internal_with("Introspection call failed", other),
            })?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "Auth service rejected token");
            return Err(GatewayError::Upstream(RelayedResponse::from(response)));
        }

        let body: IntrospectionBody = serde_json::from_slice(response.body())
            .map_err(|e| GatewayError::internal_with("Malformed introspection response", e))?;

        tracing::debug!(user.id = %body.data.id, user.role = %body.data.role, "Token introspected");
        Ok(body.data)
    }
}
