use std::{error::Error as StdError, sync::Arc, time::Duration};

use axum::body::{Body as AxumBody, to_bytes};
use http::{HeaderValue, Request, header};
use http_body_util::LengthLimitError;

use crate::{
    core::{relay::RelayedResponse, route_table::Route},
    error::{BACKEND_UNAVAILABLE, GatewayError, GatewayResult},
    ports::http_client::{HttpClient, HttpClientError},
};

/// Forwards an authorized request to its route's backend and buffers the
/// reply.
///
/// Only the method, path, query string, `Content-Type` and body travel
/// upstream. Caller credentials and every other header stay at the gateway.
/// Any backend status is relayed as-is; only a missing response is an error.
pub struct ProxyForwarder {
    client: Arc<dyn HttpClient>,
    timeout: Duration,
    max_body_bytes: usize,
}

impl ProxyForwarder {
    pub fn new(client: Arc<dyn HttpClient>, timeout: Duration, max_body_bytes: usize) -> Self {
        Self {
            client,
            timeout,
            max_body_bytes,
        }
    }

    /// `<serviceUrl><original path>[?<query>]`
    pub fn target_url(route: &Route, req: &Request<AxumBody>) -> String {
        let path_and_query = req
            .uri()
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        format!("{}{}", route.target_base_url, path_and_query)
    }

    pub async fn forward(
        &self,
        route: &Route,
        req: Request<AxumBody>,
    ) -> GatewayResult<RelayedResponse> {
        let target = Self::target_url(route, &req);
        let (parts, body) = req.into_parts();

        let body = to_bytes(body, self.max_body_bytes).await.map_err(|e| {
            if exceeds_limit(&e) {
                GatewayError::PayloadTooLarge(format!(
                    "Request body exceeds the {} byte limit",
                    self.max_body_bytes
                ))
            } else {
                GatewayError::internal_with("Failed to read request body", e)
            }
        })?;

        let mut builder = Request::builder().method(parts.method).uri(&target);
        if let Some(content_type) = parts.headers.get(header::CONTENT_TYPE) {
            builder = builder.header(header::CONTENT_TYPE, content_type.clone());
        }
        if !body.is_empty() {
            builder = builder.header(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        }
        let outbound = builder
            .body(AxumBody::from(body))
            .map_err(|e| GatewayError::internal_with("Failed to build backend request", e))?;

        tracing::debug!(target_url = %target, "Forwarding request to backend");

        let response = self
            .client
            .send_request(outbound, self.timeout)
            .await
            .map_err(|e| match e {
                e if e.is_transport() => {
                    tracing::warn!(target_url = %target, error = %e, "Backend did not respond");
                    GatewayError::ServiceUnavailable(BACKEND_UNAVAILABLE.to_string())
                }
                HttpClientError::InvalidRequest(msg) => {
                    GatewayError::internal(format!("Invalid backend request: {msg}"))
                }
                other => GatewayError::internal_with("Backend call failed", other),
            })?;

        tracing::debug!(status = %response.status(), "Backend responded");
        Ok(RelayedResponse::from(response))
    }
}

fn exceeds_limit(error: &axum::Error) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        if err.is::<LengthLimitError>() {
            return true;
        }
        current = err.source();
    }
    false
}
