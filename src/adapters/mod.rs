pub mod auth_delegate;
pub mod error_normalizer;
pub mod http_client;
pub mod http_handler;
pub mod middleware;
pub mod proxy_forwarder;
#[cfg(test)]
pub(crate) mod test_support;

/// Re-export commonly used types from adapters
pub use auth_delegate::AuthDelegate;
pub use error_normalizer::ErrorNormalizer;
pub use http_client::HttpClientAdapter;
pub use http_handler::{HttpHandler, router};
pub use middleware::request_id_middleware;
pub use proxy_forwarder::ProxyForwarder;
