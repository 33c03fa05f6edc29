use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use bytes::Bytes;
use eyre::Result;
use http_body_util::BodyExt;
use hyper::{Request, Response, Version, header, header::HeaderValue};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;
use tracing::Instrument;

use crate::{
    ports::http_client::{HttpClient, HttpClientError, HttpClientResult},
    tracing_setup::create_backend_span,
};

pub const USER_AGENT: &str = concat!("bastion/", env!("CARGO_PKG_VERSION"));

/// HTTP client adapter using Hyper with Rustls (HTTP/1.1 + HTTP/2).
///
/// One instance is shared by the auth delegate and the proxy forwarder so
/// both reuse the same connection pool. Every call is bounded by the caller's
/// timeout, covering connect, response head and body collection.
pub struct HttpClientAdapter {
    client: Client<HttpsConnector<HttpConnector>, AxumBody>,
}

impl HttpClientAdapter {
    /// Create a new HTTP client adapter.
    pub fn new() -> Result<Self> {
        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false); // Allow HTTPS URLs

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();

        if !native_certs.certs.is_empty() {
            for cert in native_certs.certs {
                if root_cert_store.add(cert).is_err() {
                    tracing::warn!("Failed to add native certificate to rustls RootCertStore");
                }
            }
            tracing::debug!("Loaded {} native root certificates.", root_cert_store.len());
        }

        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, AxumBody>(https_connector);

        tracing::info!("Created outbound HTTP client");
        Ok(Self { client })
    }

    /// Stamp the gateway's User-Agent and the Host derived from the target URI.
    fn prepare_headers(req: &mut Request<AxumBody>) -> HttpClientResult<()> {
        let host_header_val = match req.uri().host() {
            Some(host) => match req.uri().port() {
                Some(port) => HeaderValue::from_str(&format!("{host}:{}", port.as_u16())),
                None => HeaderValue::from_str(host),
            }
            .map_err(|e| HttpClientError::InvalidRequest(format!("Invalid host: {e}")))?,
            None => {
                return Err(HttpClientError::InvalidRequest(format!(
                    "Outgoing URI has no host: {}",
                    req.uri()
                )));
            }
        };

        let headers = req.headers_mut();
        headers.insert(header::HOST, host_header_val);
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        Ok(())
    }

    async fn execute(&self, req: Request<AxumBody>) -> HttpClientResult<Response<Bytes>> {
        let method = req.method().clone();
        let uri = req.uri().clone();

        let response = self.client.request(req).await.map_err(|e| {
            HttpClientError::ConnectionError(format!("Request to {method} {uri} failed: {e}"))
        })?;

        tracing::Span::current().record("http.status_code", response.status().as_u16());

        let (mut parts, body) = response.into_parts();
        let collected = body.collect().await.map_err(|e| {
            HttpClientError::ConnectionError(format!(
                "Reading response body from {method} {uri} failed: {e}"
            ))
        })?;

        // The body is fully buffered now; framing is re-derived downstream.
        parts.headers.remove(header::TRANSFER_ENCODING);
        Ok(Response::from_parts(parts, collected.to_bytes()))
    }
}

#[async_trait]
impl HttpClient for HttpClientAdapter {
    async fn send_request(
        &self,
        mut req: Request<AxumBody>,
        timeout: Duration,
    ) -> HttpClientResult<Response<Bytes>> {
        Self::prepare_headers(&mut req)?;
        *req.version_mut() = Version::HTTP_11;

        let span = create_backend_span(req.method(), req.uri());
        tracing::debug!(
            parent: &span,
            "Sending request: {} {}",
            req.method(),
            req.uri()
        );

        let result = tokio::time::timeout(timeout, self.execute(req))
            .instrument(span.clone())
            .await
            .unwrap_or(Err(HttpClientError::Timeout(timeout)));

        if let Err(e) = &result {
            span.record("http.status_code", 599u16);
            tracing::warn!(parent: &span, error = %e, "Outbound request failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header as header_matcher, method, path},
    };

    use super::*;

    #[tokio::test]
    async fn test_http_client_creation() {
        let client = HttpClientAdapter::new();
        assert!(client.is_ok());
    }

    #[test]
    fn test_prepare_headers_sets_host_and_user_agent() {
        let mut req = Request::builder()
            .uri("http://users.internal:4001/users/1")
            .header(header::USER_AGENT, "curl/8.0")
            .body(AxumBody::empty())
            .unwrap();

        HttpClientAdapter::prepare_headers(&mut req).unwrap();

        let headers = req.headers();
        assert_eq!(headers[header::HOST], "users.internal:4001");
        assert_eq!(headers[header::USER_AGENT], USER_AGENT);
    }

    #[test]
    fn test_prepare_headers_requires_host() {
        let mut req = Request::builder()
            .uri("/relative/only")
            .body(AxumBody::empty())
            .unwrap();

        let err = HttpClientAdapter::prepare_headers(&mut req).unwrap_err();
        assert!(matches!(err, HttpClientError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_buffers_error_statuses_as_responses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .and(header_matcher("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&server)
            .await;

        let client = HttpClientAdapter::new().unwrap();
        let req = Request::builder()
            .uri(format!("{}/missing", server.uri()))
            .body(AxumBody::empty())
            .unwrap();

        let response = client
            .send_request(req, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
        assert_eq!(&response.body()[..], b"nope");
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = HttpClientAdapter::new().unwrap();
        let req = Request::builder()
            .uri(format!("{}/slow", server.uri()))
            .body(AxumBody::empty())
            .unwrap();

        let err = client
            .send_request(req, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpClientError::Timeout(_)));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop to obtain a port nothing listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let client = HttpClientAdapter::new().unwrap();
        let req = Request::builder()
            .uri(format!("http://127.0.0.1:{port}/"))
            .body(AxumBody::empty())
            .unwrap();

        let err = client
            .send_request(req, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpClientError::ConnectionError(_)));
    }
}
