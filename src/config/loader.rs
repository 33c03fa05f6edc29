use std::path::Path;

use config::{Config, Environment};
use eyre::{Context, Result, eyre};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::config::models::{GatewaySettings, RouteDescriptor};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("invalid placeholder regex"));

/// Environment variables recognised as gateway settings.
pub const SETTINGS_KEYS: [&str; 8] = [
    "HOST",
    "PORT",
    "AUTH_SERVICE_HOST",
    "REQUEST_TIMEOUT_MS",
    "GATEWAY_ENV",
    "ROUTES_CONFIG",
    "MAX_BODY_BYTES",
    "SHUTDOWN_GRACE_SECS",
];

/// Load gateway settings from the process environment.
///
/// Call `dotenvy::dotenv()` beforehand to merge a local `.env` file.
pub fn load_settings() -> Result<GatewaySettings> {
    load_settings_from(std::env::vars())
}

/// Load gateway settings from an explicit set of `(NAME, value)` pairs.
/// Unknown names are ignored.
pub fn load_settings_from<I, K, V>(vars: I) -> Result<GatewaySettings>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let source: config::Map<String, String> = vars
        .into_iter()
        .filter(|(key, _)| SETTINGS_KEYS.contains(&key.as_ref()))
        .map(|(key, value)| (key.as_ref().to_ascii_lowercase(), value.into()))
        .collect();

    let settings = Config::builder()
        .add_source(Environment::default().source(Some(source)))
        .build()
        .context("Failed to build settings from environment")?;

    settings
        .try_deserialize()
        .context("Failed to deserialize gateway settings from environment")
}

/// Read a routes file and resolve `${VAR}` placeholders against the process
/// environment.
pub fn load_route_descriptors(path: &Path) -> Result<Vec<RouteDescriptor>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read routes file {}", path.display()))?;

    parse_route_descriptors(&raw, |name| std::env::var(name).ok())
        .with_context(|| format!("Failed to parse routes file {}", path.display()))
}

/// Parse a routes document (a JSON array, or an object with a `routes` array),
/// resolving placeholders with `lookup` before typed deserialization.
pub fn parse_route_descriptors<F>(raw: &str, lookup: F) -> Result<Vec<RouteDescriptor>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut document: Value = serde_json::from_str(raw).context("Routes file is not valid JSON")?;

    let missing = resolve_placeholders(&mut document, &lookup);
    for name in &missing {
        tracing::warn!(
            variable = %name,
            "Routes file references an unset environment variable; substituting an empty string"
        );
    }

    let routes = match document {
        Value::Array(_) => document,
        Value::Object(mut map) => map
            .remove("routes")
            .ok_or_else(|| eyre!("Routes document object must contain a 'routes' array"))?,
        _ => return Err(eyre!("Routes document must be an array or an object")),
    };

    serde_json::from_value(routes).context("Invalid route descriptor")
}

/// Replace every `${NAME}` occurrence in every string of `value`, recursively.
/// Unset variables become empty strings; their names are returned.
pub fn resolve_placeholders<F>(value: &mut Value, lookup: &F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = Vec::new();
    resolve_value(value, lookup, &mut missing);
    missing.sort();
    missing.dedup();
    missing
}

fn resolve_value<F>(value: &mut Value, lookup: &F, missing: &mut Vec<String>)
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(s) => {
            if PLACEHOLDER.is_match(s) {
                let resolved = PLACEHOLDER.replace_all(s, |caps: &Captures| {
                    let name = &caps[1];
                    lookup(name).unwrap_or_else(|| {
                        missing.push(name.to_string());
                        String::new()
                    })
                });
                *s = resolved.into_owned();
            }
        }
        Value::Array(items) => {
            for item in items {
                resolve_value(item, lookup, missing);
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                resolve_value(item, lookup, missing);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io::Write};

    use tempfile::NamedTempFile;

    use super::*;
    use crate::config::models::{AccessScope, DeploymentMode};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn resolves_every_placeholder_in_a_string() {
        let mut value = serde_json::json!({
            "url": "http://${HOST}:${PORT}/base",
            "nested": [{"deep": "${HOST}"}],
            "untouched": 5
        });
        let missing = resolve_placeholders(&mut value, &env(&[("HOST", "users"), ("PORT", "4001")]));

        assert!(missing.is_empty());
        assert_eq!(value["url"], "http://users:4001/base");
        assert_eq!(value["nested"][0]["deep"], "users");
        assert_eq!(value["untouched"], 5);
    }

    #[test]
    fn missing_variables_become_empty_strings() {
        let mut value = serde_json::json!(["${NOPE}/x", "${NOPE}", "${ALSO_NOPE}"]);
        let missing = resolve_placeholders(&mut value, &env(&[]));

        assert_eq!(value, serde_json::json!(["/x", "", ""]));
        assert_eq!(missing, vec!["ALSO_NOPE".to_string(), "NOPE".to_string()]);
    }

    #[test]
    fn parses_top_level_array() {
        let raw = r#"[
            {"method": "GET", "path": "/health", "serviceUrl": "${HEALTH_URL}", "public": true},
            {"method": "GET", "path": "/users/:userID", "serviceUrl": "http://users:4001",
             "rolesAllowed": {"member": {"access": "self"}, "admin": {"access": "all"}}}
        ]"#;
        let routes =
            parse_route_descriptors(raw, env(&[("HEALTH_URL", "http://health:9000")])).unwrap();

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].service_url, "http://health:9000");
        assert!(routes[0].public);
        assert_eq!(routes[1].roles_allowed["member"].access, AccessScope::SelfOnly);
        assert_eq!(routes[1].roles_allowed["admin"].access, AccessScope::All);
    }

    #[test]
    fn parses_wrapped_object() {
        let raw = r#"{"routes": [{"method": "POST", "path": "/orders", "service_url": "http://o:1", "public": true}]}"#;
        let routes = parse_route_descriptors(raw, env(&[])).unwrap();
        assert_eq!(routes[0].method, "POST");
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(parse_route_descriptors("not json", env(&[])).is_err());
        assert!(parse_route_descriptors(r#"{"paths": []}"#, env(&[])).is_err());
        assert!(parse_route_descriptors("42", env(&[])).is_err());
        // Missing required `path`.
        assert!(
            parse_route_descriptors(r#"[{"method":"GET","serviceUrl":"http://a:1"}]"#, env(&[]))
                .is_err()
        );
    }

    #[test]
    fn loads_routes_file_from_disk() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(
            file,
            r#"[{{"method":"GET","path":"/health","serviceUrl":"http://backend:8080","public":true}}]"#
        )
        .unwrap();

        let routes = load_route_descriptors(file.path()).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/health");
    }

    #[test]
    fn missing_routes_file_is_an_error() {
        assert!(load_route_descriptors(Path::new("/definitely/not/here.json")).is_err());
    }

    #[test]
    fn settings_use_defaults() {
        let settings = load_settings_from(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.request_timeout_ms, 5000);
        assert_eq!(settings.gateway_env, DeploymentMode::Production);
        assert_eq!(settings.routes_config, "config/routes.json");
    }

    #[test]
    fn settings_read_known_variables() {
        let settings = load_settings_from([
            ("PORT", "8081"),
            ("AUTH_SERVICE_HOST", "http://auth:4000"),
            ("REQUEST_TIMEOUT_MS", "250"),
            ("GATEWAY_ENV", "development"),
            ("UNRELATED", "ignored"),
        ])
        .unwrap();

        assert_eq!(settings.port, 8081);
        assert_eq!(settings.auth_service_host, "http://auth:4000");
        assert_eq!(settings.request_timeout().as_millis(), 250);
        assert!(settings.mode().is_development());
    }

    #[test]
    fn settings_reject_non_numeric_port() {
        assert!(load_settings_from([("PORT", "eighty")]).is_err());
    }
}
