use std::{any::Any, sync::Arc};

use axum::{
    Router,
    body::Body as AxumBody,
    extract::State,
    http::header,
    middleware,
    response::{IntoResponse, Response},
};
use hyper::Request;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::{
    adapters::{
        auth_delegate::AuthDelegate, error_normalizer::ErrorNormalizer,
        middleware::request_id_middleware, proxy_forwarder::ProxyForwarder,
    },
    config::models::GatewaySettings,
    core::{
        access::{AccessDecision, authorize},
        relay::RelayedResponse,
        route_table::RouteTable,
    },
    error::{GatewayError, GatewayResult},
    ports::http_client::HttpClient,
};

/// HTTP handler for the Bastion gateway.
///
/// Each request runs the same pipeline: route lookup, then (for protected
/// routes) token introspection and access evaluation, then forwarding. The
/// first failing stage short-circuits to the error normalizer, so every
/// request gets exactly one response.
pub struct HttpHandler {
    routes: Arc<RouteTable>,
    auth: AuthDelegate,
    forwarder: ProxyForwarder,
    normalizer: ErrorNormalizer,
}

impl HttpHandler {
    pub fn new(
        routes: Arc<RouteTable>,
        http_client: Arc<dyn HttpClient>,
        settings: &GatewaySettings,
    ) -> Self {
        let timeout = settings.request_timeout();
        Self {
            routes,
            auth: AuthDelegate::new(
                http_client.clone(),
                &settings.auth_service_host,
                timeout,
            ),
            forwarder: ProxyForwarder::new(http_client, timeout, settings.max_body_bytes),
            normalizer: ErrorNormalizer::new(settings.mode()),
        }
    }

    pub fn normalizer(&self) -> ErrorNormalizer {
        self.normalizer
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Main request handler
    pub async fn handle_request(&self, req: Request<AxumBody>) -> Response {
        match self.process(req).await {
            Ok(relayed) => relayed.into_response(),
            Err(error) => self.normalizer.render(error),
        }
    }

    async fn process(&self, req: Request<AxumBody>) -> GatewayResult<RelayedResponse> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let Some(matched) = self.routes.match_route(&method, &path) else {
            return Err(GatewayError::NotFound(format!("Cannot {method} {path}")));
        };
        let route = matched.route;

        tracing::debug!(route = %route.pattern, public = route.public, "Route matched");

        if !route.public {
            let identity = self
                .auth
                .authenticate(req.headers().get(header::AUTHORIZATION))
                .await?;

            match authorize(route, &identity, &matched.params) {
                AccessDecision::Allow => {
                    tracing::debug!(user.id = %identity.id, user.role = %identity.role, "Access granted");
                }
                AccessDecision::Deny(reason) => {
                    tracing::info!(
                        user.id = %identity.id,
                        user.role = %identity.role,
                        route = %route.pattern,
                        reason = %reason,
                        "Access denied"
                    );
                    return Err(reason.into());
                }
            }
        }

        self.forwarder.forward(route, req).await
    }
}

async fn dispatch(State(handler): State<Arc<HttpHandler>>, req: Request<AxumBody>) -> Response {
    handler.handle_request(req).await
}

/// Build the gateway's Axum router: every method and path goes through
/// [`HttpHandler::handle_request`], wrapped in panic recovery, request-id
/// tagging and access logging.
pub fn router(handler: Arc<HttpHandler>) -> Router {
    let normalizer = handler.normalizer();

    Router::new()
        .fallback(dispatch)
        .with_state(handler)
        .layer(CatchPanicLayer::custom(
            move |payload: Box<dyn Any + Send + 'static>| normalizer.render_panic(payload),
        ))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}
