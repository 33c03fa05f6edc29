//! Configuration data structures for Bastion.
//!
//! Two inputs feed the gateway at start-up: the process-level
//! [`GatewaySettings`] (read from the environment) and the list of
//! [`RouteDescriptor`]s (read from a JSON routes document). Both are plain
//! serde types with defaults so that minimal configurations stay concise.
use std::{collections::HashMap, fmt, net::SocketAddr, time::Duration};

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_routes_config() -> String {
    "config/routes.json".to_string()
}

fn default_max_body_bytes() -> usize {
    100 * 1024
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

/// Deployment mode controlling how much error detail reaches callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeploymentMode {
    Development,
    #[default]
    Production,
}

impl DeploymentMode {
    pub fn is_development(self) -> bool {
        self == DeploymentMode::Development
    }
}

impl From<String> for DeploymentMode {
    fn from(value: String) -> Self {
        DeploymentMode::from(value.as_str())
    }
}

impl From<&str> for DeploymentMode {
    fn from(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("development") {
            DeploymentMode::Development
        } else {
            DeploymentMode::Production
        }
    }
}

impl From<DeploymentMode> for String {
    fn from(mode: DeploymentMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentMode::Development => write!(f, "development"),
            DeploymentMode::Production => write!(f, "production"),
        }
    }
}

/// Process-wide settings, sourced from environment variables.
///
/// Field names are the lower-cased variable names (`PORT` -> `port`), which is
/// how the `config` crate's environment source exposes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin of the identity service, e.g. `http://auth:4000`.
    #[serde(default)]
    pub auth_service_host: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub gateway_env: DeploymentMode,
    #[serde(default = "default_routes_config")]
    pub routes_config: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl GatewaySettings {
    /// Timeout applied to every outbound call (introspection and forwarding).
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn mode(&self) -> DeploymentMode {
        self.gateway_env
    }

    /// Socket address the listener binds to.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let raw = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        };
        raw.parse()
            .wrap_err_with(|| format!("Invalid listen address '{raw}'"))
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth_service_host: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            gateway_env: DeploymentMode::default(),
            routes_config: default_routes_config(),
            max_body_bytes: default_max_body_bytes(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

/// Scope granted to a role on a route.
///
/// `"self"` restricts the role to the resource named by the `:userID` path
/// parameter; every other value grants access to all resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccessScope {
    SelfOnly,
    All,
}

impl From<String> for AccessScope {
    fn from(value: String) -> Self {
        if value == "self" {
            AccessScope::SelfOnly
        } else {
            AccessScope::All
        }
    }
}

impl From<AccessScope> for String {
    fn from(scope: AccessScope) -> Self {
        match scope {
            AccessScope::SelfOnly => "self".to_string(),
            AccessScope::All => "all".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub access: AccessScope,
}

impl AccessRule {
    pub fn self_only() -> Self {
        Self {
            access: AccessScope::SelfOnly,
        }
    }

    pub fn all() -> Self {
        Self {
            access: AccessScope::All,
        }
    }
}

/// One entry of the routes document, after placeholder substitution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDescriptor {
    pub method: String,
    pub path: String,
    #[serde(alias = "service_url")]
    pub service_url: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default, alias = "roles_allowed")]
    pub roles_allowed: HashMap<String, AccessRule>,
}

impl RouteDescriptor {
    /// Create a public route descriptor.
    pub fn public(
        method: impl Into<String>,
        path: impl Into<String>,
        service_url: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            service_url: service_url.into(),
            public: true,
            roles_allowed: HashMap::new(),
        }
    }

    /// Create a protected route descriptor with no roles; add them with [`RouteDescriptor::allow`].
    pub fn protected(
        method: impl Into<String>,
        path: impl Into<String>,
        service_url: impl Into<String>,
    ) -> Self {
        Self {
            public: false,
            ..Self::public(method, path, service_url)
        }
    }

    pub fn allow(mut self, role: impl Into<String>, rule: AccessRule) -> Self {
        self.roles_allowed.insert(role.into(), rule);
        self
    }
}
