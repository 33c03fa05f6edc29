//! Bastion - an authenticating API gateway.
//!
//! Bastion sits in front of a set of backend services. For every inbound
//! request it finds the configured route, asks an external identity service
//! who the caller is (unless the route is public), checks the caller's role
//! against the route's access rules and finally relays the request to the
//! owning backend. Every failure along the way becomes exactly one uniform
//! JSON response.
//!
//! # Features
//! - Declarative JSON route table with `:param` path segments and `${VAR}`
//!   environment placeholders
//! - Token introspection delegated to an auth service
//! - Per-route role rules, including owner-only (`"self"`) access
//! - Backend responses relayed verbatim, errors normalized into an envelope
//! - Development and production error rendering
//! - Structured tracing with per-request ids and graceful shutdown
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use bastion::{HttpClientAdapter, HttpHandler, RouteTable, config::load_settings, router};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let settings = load_settings()?;
//! let routes = Arc::new(RouteTable::load(&settings.routes_config)?);
//! let client = Arc::new(HttpClientAdapter::new()?);
//! let app = router(Arc::new(HttpHandler::new(routes, client, &settings)));
//!
//! let listener = tokio::net::TcpListener::bind(settings.listen_addr()?).await?;
//! axum::serve(listener, app).await?;
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations)
//! while keeping the routing and access logic inside `core`, free of I/O.
pub mod config;
pub mod error;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{HttpClientAdapter, HttpHandler, router},
    core::RouteTable,
    error::GatewayError,
    ports::http_client::HttpClient,
    utils::GracefulShutdown,
};
