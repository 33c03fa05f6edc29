use eyre::{Result, WrapErr};
use http::{Method, Uri};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::DeploymentMode;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging for the given deployment mode: human-readable output in
/// development, JSON lines in production. `RUST_LOG` overrides the default
/// `info` filter.
pub fn init_tracing(mode: DeploymentMode) -> Result<()> {
    if mode.is_development() {
        init_console_tracing()
    } else {
        init_json_tracing()
    }
}

/// Initialize structured logging with JSON output
pub fn init_json_tracing() -> Result<()> {
    Registry::default()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .wrap_err("Failed to install JSON tracing subscriber")?;

    tracing::info!("Bastion structured logging initialized");
    Ok(())
}

/// Initialize console-friendly logging for development
pub fn init_console_tracing() -> Result<()> {
    Registry::default()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .wrap_err("Failed to install console tracing subscriber")?;

    tracing::info!("Bastion console logging initialized");
    Ok(())
}

/// Shutdown tracing gracefully
pub fn shutdown_tracing() {
    // tracing-subscriber has no explicit flush; writers are unbuffered.
    tracing::info!("Bastion tracing shutdown complete");
}

/// Create a request-scoped tracing span
pub fn create_request_span(method: &str, path: &str, request_id: &str) -> tracing::Span {
    tracing::info_span!(
        "request",
        http.method = method,
        http.path = path,
        request.id = request_id,
        http.status_code = tracing::field::Empty,
        duration_ms = tracing::field::Empty,
    )
}

/// Create a span around the token introspection call
pub fn create_introspection_span(introspect_url: &str) -> tracing::Span {
    tracing::info_span!(
        "auth_introspection",
        auth.url = introspect_url,
        auth.outcome = tracing::field::Empty,
    )
}

/// Create an outbound request span
pub fn create_backend_span(method: &Method, uri: &Uri) -> tracing::Span {
    let backend_url = format!(
        "{}://{}",
        uri.scheme_str().unwrap_or("http"),
        uri.authority().map_or("unknown", |a| a.as_str())
    );
    tracing::info_span!(
        "backend_request",
        backend.url = %backend_url,
        http.method = %method,
        http.path = uri.path(),
        http.status_code = tracing::field::Empty,
    )
}
