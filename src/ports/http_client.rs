use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use bytes::Bytes;
use hyper::{Request, Response};
use thiserror::Error;

/// Custom error type for HTTP client operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpClientError {
    /// Connection refused, reset, DNS failure and the like
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// No complete response within the budget
    #[error("Timeout error after {0:?}")]
    Timeout(Duration),

    /// The request could not be built or has no usable target
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl HttpClientError {
    /// True when the upstream never produced a response.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            HttpClientError::ConnectionError(_) | HttpClientError::Timeout(_)
        )
    }
}

/// Result type alias for HTTP client operations
pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// HttpClient defines the port (interface) for outbound calls to the auth
/// service and to backends.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Send `req` and buffer the complete response.
    ///
    /// `timeout` bounds connecting, receiving the response head and
    /// collecting the body. Any HTTP status, including 4xx/5xx, is a
    /// successful result.
    async fn send_request(
        &self,
        req: Request<AxumBody>,
        timeout: Duration,
    ) -> HttpClientResult<Response<Bytes>>;
}
