use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The caller's identity as reported by the introspection endpoint.
///
/// Only `id` and `role` are interpreted; every other claim is carried along
/// untouched. Numeric ids are normalized to their decimal string form so they
/// compare equal to the corresponding URL segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub role: String,
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

impl Identity {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            claims: Map::new(),
        }
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "identity id must be a string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_extra_claims() {
        let identity: Identity = serde_json::from_str(
            r#"{"id":"42","role":"member","email":"a@b.c","scopes":["read"]}"#,
        )
        .unwrap();
        assert_eq!(identity.id, "42");
        assert_eq!(identity.role, "member");
        assert_eq!(identity.claim("email"), Some(&Value::from("a@b.c")));
        assert_eq!(identity.claims.len(), 2);
    }

    #[test]
    fn numeric_id_becomes_string() {
        let identity: Identity = serde_json::from_str(r#"{"id":7,"role":"admin"}"#).unwrap();
        assert_eq!(identity.id, "7");
    }

    #[test]
    fn rejects_missing_role() {
        assert!(serde_json::from_str::<Identity>(r#"{"id":"1"}"#).is_err());
        assert!(serde_json::from_str::<Identity>(r#"{"id":null,"role":"x"}"#).is_err());
    }
}
