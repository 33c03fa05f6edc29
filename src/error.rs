use std::any::Any;

use http::StatusCode;
use thiserror::Error;

use crate::core::{access::DenyReason, envelope::EnvelopeStatus, relay::RelayedResponse};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub const TOKEN_MISSING: &str = "Token is missing";
pub const AUTH_UNAVAILABLE: &str = "Service Unavailable - No response from auth service";
pub const BACKEND_UNAVAILABLE: &str = "Service Unavailable - No response from service";

/// Every way a request can fail on its way through the gateway.
///
/// All variants except [`GatewayError::Internal`] are operational: they are
/// raised deliberately and their message is safe to show callers.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// No response from an upstream within the timeout budget.
    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// An upstream answered with an error; relayed to the caller verbatim.
    #[error("Upstream responded with status {}", .0.status)]
    Upstream(RelayedResponse),
}

/// Convenience type alias for pipeline results.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub fn internal(message: impl Into<String>) -> Self {
        GatewayError::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        GatewayError::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Build a non-operational error from a caught panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send + 'static>) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        GatewayError::internal(format!("Request handler panicked: {detail}"))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::ServiceUnavailable(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Upstream(relayed) => relayed.status,
        }
    }

    pub fn status(&self) -> EnvelopeStatus {
        if self.is_operational() {
            EnvelopeStatus::Fail
        } else {
            EnvelopeStatus::Error
        }
    }

    pub fn is_operational(&self) -> bool {
        !matches!(self, GatewayError::Internal { .. })
    }

    /// Short machine-readable name used in logs and development diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Unauthorized(_) => "unauthorized",
            GatewayError::Forbidden(_) => "forbidden",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::PayloadTooLarge(_) => "payload_too_large",
            GatewayError::ServiceUnavailable(_) => "service_unavailable",
            GatewayError::Internal { .. } => "internal_error",
            GatewayError::Upstream(_) => "upstream",
        }
    }
}

impl From<DenyReason> for GatewayError {
    fn from(reason: DenyReason) -> Self {
        GatewayError::Forbidden(reason.message().to_string())
    }
}

impl From<eyre::Report> for GatewayError {
    fn from(report: eyre::Report) -> Self {
        GatewayError::internal_with(report.to_string(), report)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use bytes::Bytes;

    use super::*;

    #[test]
    fn taxonomy_status_codes() {
        assert_eq!(
            GatewayError::Unauthorized(TOKEN_MISSING.into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::from(DenyReason::NotOwner).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            GatewayError::ServiceUnavailable(AUTH_UNAVAILABLE.into()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            GatewayError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn only_internal_errors_are_non_operational() {
        assert!(GatewayError::Forbidden("no".into()).is_operational());
        assert!(GatewayError::ServiceUnavailable("down".into()).is_operational());
        assert_eq!(
            GatewayError::ServiceUnavailable("down".into()).status(),
            EnvelopeStatus::Fail
        );

        let internal = GatewayError::internal("defect");
        assert!(!internal.is_operational());
        assert_eq!(internal.status(), EnvelopeStatus::Error);
    }

    #[test]
    fn upstream_keeps_relayed_status() {
        let relayed = RelayedResponse::json(StatusCode::CONFLICT, Bytes::from_static(b"{}"));
        let error = GatewayError::Upstream(relayed);
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        assert!(error.is_operational());
    }

    #[test]
    fn eyre_reports_become_internal_errors_with_source() {
        let error = GatewayError::from(eyre::eyre!("unexpected state"));
        assert_eq!(error.kind(), "internal_error");
        assert_eq!(error.to_string(), "unexpected state");
        assert!(error.source().is_some());
    }

    #[test]
    fn panic_payloads_are_described() {
        let error = GatewayError::from_panic(Box::new("index out of bounds"));
        assert!(error.to_string().contains("index out of bounds"));

        let error = GatewayError::from_panic(Box::new(String::from("owned message")));
        assert!(error.to_string().contains("owned message"));
    }
}
