//! In-process fake for the [`HttpClient`] port.
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use bytes::Bytes;
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri, header};
use http_body_util::BodyExt;

use crate::ports::http_client::{HttpClient, HttpClientError, HttpClientResult};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

type Responder = Box<dyn Fn(&RecordedRequest) -> HttpClientResult<Response<Bytes>> + Send + Sync>;

/// Records every outbound request and answers with a caller-supplied script.
pub struct RecordingHttpClient {
    responder: Responder,
    recorded: Mutex<Vec<RecordedRequest>>,
}

impl RecordingHttpClient {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&RecordedRequest) -> HttpClientResult<Response<Bytes>> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            recorded: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded.lock().unwrap().clone()
    }

    /// Number of recorded requests whose path equals `path`.
    pub fn calls_to(&self, path: &str) -> usize {
        self.recorded
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.uri.path() == path)
            .count()
    }
}

#[async_trait]
impl HttpClient for RecordingHttpClient {
    async fn send_request(
        &self,
        req: Request<AxumBody>,
        _timeout: Duration,
    ) -> HttpClientResult<Response<Bytes>> {
        let (parts, body) = req.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| HttpClientError::InvalidRequest(e.to_string()))?
            .to_bytes();

        let recorded = RecordedRequest {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        };
        let response = (self.responder)(&recorded);
        self.recorded.lock().unwrap().push(recorded);
        response
    }
}

pub fn json_response(status: u16, body: serde_json::Value) -> HttpClientResult<Response<Bytes>> {
    Ok(Response::builder()
        .status(StatusCode::from_u16(status).unwrap())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Bytes::from(body.to_string()))
        .unwrap())
}

pub fn refused() -> HttpClientResult<Response<Bytes>> {
    Err(HttpClientError::ConnectionError(
        "connection refused".to_string(),
    ))
}
