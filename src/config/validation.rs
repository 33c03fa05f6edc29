#![allow(clippy::collapsible_if)]

use std::collections::HashMap;

use http::Method;

use crate::{
    config::models::{AccessScope, GatewaySettings, RouteDescriptor},
    core::{access::USER_ID_PARAM, path_pattern::PathPattern},
};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Methods a route may be registered for.
const SUPPORTED_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
];

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Route conflict detected: {message}")]
    RouteConflict { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Route configuration validator
pub struct RouteConfigValidator;

impl RouteConfigValidator {
    /// Validate the full route list, reporting every problem at once.
    pub fn validate(routes: &[RouteDescriptor]) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if routes.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "routes".to_string(),
            });
        }

        for (index, route) in routes.iter().enumerate() {
            if let Err(mut route_errors) = Self::validate_single_route(index, route) {
                errors.append(&mut route_errors);
            }
        }

        if let Err(conflict_error_list) = Self::check_route_conflicts(routes) {
            errors.extend(conflict_error_list);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: format_multiple_errors(errors),
            })
        }
    }

    /// Parse a configured HTTP verb, accepting any letter case.
    pub fn parse_method(raw: &str) -> ValidationResult<Method> {
        let upper = raw.trim().to_ascii_uppercase();
        SUPPORTED_METHODS
            .iter()
            .find(|m| m.as_str() == upper)
            .cloned()
            .ok_or_else(|| ValidationError::InvalidField {
                field: "method".to_string(),
                message: format!(
                    "Unsupported HTTP method '{raw}'. Use one of GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS"
                ),
            })
    }

    fn validate_single_route(
        index: usize,
        route: &RouteDescriptor,
    ) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let label = format!("route #{} ({} {})", index + 1, route.method, route.path);

        if let Err(ValidationError::InvalidField { message, .. }) =
            Self::parse_method(&route.method)
        {
            errors.push(ValidationError::InvalidField {
                field: format!("{label} method"),
                message,
            });
        }

        let pattern = match PathPattern::parse(&route.path) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                errors.push(ValidationError::InvalidField {
                    field: format!("{label} path"),
                    message: e.to_string(),
                });
                None
            }
        };

        if let Err(e) = validate_url(&route.service_url, &format!("{label} serviceUrl")) {
            errors.push(e);
        }

        if !route.public {
            if route.roles_allowed.is_empty() {
                errors.push(ValidationError::MissingField {
                    field: format!("{label} rolesAllowed (required for non-public routes)"),
                });
            }

            let grants_self = route
                .roles_allowed
                .values()
                .any(|rule| rule.access == AccessScope::SelfOnly);
            if let Some(pattern) = &pattern {
                if grants_self && !pattern.has_param(USER_ID_PARAM) {
                    errors.push(ValidationError::InvalidField {
                        field: format!("{label} rolesAllowed"),
                        message: format!(
                            "A \"self\" access rule requires a ':{USER_ID_PARAM}' path parameter"
                        ),
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Two routes conflict when they share a verb and their patterns match
    /// exactly the same set of paths.
    fn check_route_conflicts(routes: &[RouteDescriptor]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut seen: HashMap<(Method, String), &str> = HashMap::new();

        for route in routes {
            let (Ok(method), Ok(pattern)) = (
                Self::parse_method(&route.method),
                PathPattern::parse(&route.path),
            ) else {
                continue;
            };

            let key = (method, pattern.shape());
            if let Some(previous) = seen.get(&key) {
                errors.push(ValidationError::RouteConflict {
                    message: format!(
                        "{} '{}' duplicates the earlier route '{}'",
                        key.0, route.path, previous
                    ),
                });
            } else {
                seen.insert(key, route.path.as_str());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Settings validator
pub struct SettingsValidator;

impl SettingsValidator {
    pub fn validate(settings: &GatewaySettings) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if settings.auth_service_host.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "AUTH_SERVICE_HOST".to_string(),
            });
        } else if let Err(e) = validate_url(&settings.auth_service_host, "AUTH_SERVICE_HOST") {
            errors.push(e);
        }

        if settings.request_timeout_ms == 0 {
            errors.push(ValidationError::InvalidField {
                field: "REQUEST_TIMEOUT_MS".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if settings.max_body_bytes == 0 {
            errors.push(ValidationError::InvalidField {
                field: "MAX_BODY_BYTES".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if let Err(e) = settings.listen_addr() {
            errors.push(ValidationError::InvalidField {
                field: "HOST/PORT".to_string(),
                message: e.to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: format_multiple_errors(errors),
            })
        }
    }
}

/// Validate URL format
fn validate_url(url_str: &str, context: &str) -> ValidationResult<()> {
    match url::Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ValidationError::InvalidField {
                    field: context.to_string(),
                    message: format!(
                        "URL scheme must be 'http' or 'https', got '{}'",
                        url.scheme()
                    ),
                });
            }

            if url.host().is_none() {
                return Err(ValidationError::InvalidField {
                    field: context.to_string(),
                    message: "URL must have a valid host".to_string(),
                });
            }

            if url.query().is_some() || url.fragment().is_some() {
                return Err(ValidationError::InvalidField {
                    field: context.to_string(),
                    message: "URL must not carry a query string or fragment".to_string(),
                });
            }

            Ok(())
        }
        Err(e) => Err(ValidationError::InvalidField {
            field: context.to_string(),
            message: format!("Invalid URL format '{url_str}': {e}"),
        }),
    }
}

/// Format multiple validation errors into a single message
fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
    if errors.is_empty() {
        return "No errors".to_string();
    }

    if errors.len() == 1 {
        return errors[0].to_string();
    }

    let mut message = format!("Found {} validation errors:\n", errors.len());
    for (i, error) in errors.iter().enumerate() {
        message.push_str(&format!("  {}. {}\n", i + 1, error));
    }
    message
}
