//! The uniform JSON response envelope: `{status, data?, message?, ...}`.
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    /// Client-caused or anticipated failure.
    Fail,
    /// Unexpected, system-side failure.
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub status: EnvelopeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Extra top-level diagnostic fields (development mode only).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Self {
            status: EnvelopeStatus::Success,
            data: Some(data),
            message: None,
            extra: Map::new(),
        }
    }

    pub fn failure(status: EnvelopeStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            data: None,
            message: Some(message.into()),
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extra.insert(name.into(), value);
        self
    }
}
