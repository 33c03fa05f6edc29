//! Express-style path templates (`/users/:userID/orders`).
//!
//! A pattern is a sequence of literal and named-parameter segments. Literal
//! segments compare ASCII case-insensitively, a single trailing slash on the
//! request path is tolerated, and parameter values are percent-decoded.
use std::{collections::HashMap, fmt};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static PARAM_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("invalid param name regex"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("path must start with '/'")]
    MissingLeadingSlash,

    #[error("path contains an empty segment")]
    EmptySegment,

    #[error("invalid parameter name ':{0}' (use letters, digits and '_')")]
    InvalidParamName(String),

    #[error("parameter ':{0}' appears more than once")]
    DuplicateParam(String),

    #[error("unsupported pattern syntax in segment '{0}'")]
    UnsupportedSyntax(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let rest = raw
            .strip_prefix('/')
            .ok_or(PatternError::MissingLeadingSlash)?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        let mut segments = Vec::new();
        if !rest.is_empty() {
            for part in rest.split('/') {
                segments.push(Self::parse_segment(part, &segments)?);
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    fn parse_segment(part: &str, seen: &[Segment]) -> Result<Segment, PatternError> {
        if part.is_empty() {
            return Err(PatternError::EmptySegment);
        }

        if let Some(name) = part.strip_prefix(':') {
            if !PARAM_NAME.is_match(name) {
                return Err(PatternError::InvalidParamName(name.to_string()));
            }
            if seen
                .iter()
                .any(|s| matches!(s, Segment::Param(existing) if existing == name))
            {
                return Err(PatternError::DuplicateParam(name.to_string()));
            }
            return Ok(Segment::Param(name.to_string()));
        }

        if part.contains(['*', '?', '(', ')', ':', '+']) {
            return Err(PatternError::UnsupportedSyntax(part.to_string()));
        }

        Ok(Segment::Literal(part.to_string()))
    }

    /// The template exactly as configured.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Canonical form used to detect two templates that match the same paths:
    /// literals lower-cased, parameter names erased.
    pub fn shape(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(lit) => format!("/{}", lit.to_ascii_lowercase()),
                Segment::Param(_) => "/:".to_string(),
            })
            .collect()
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Param(p) if p == name))
    }

    /// Match a request path (without query string), returning the extracted
    /// parameters on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let rest = path.strip_prefix('/')?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        let parts: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/').collect()
        };

        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) => {
                    if !lit.eq_ignore_ascii_case(part) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    let decoded = urlencoding::decode(part).ok()?;
                    params.insert(name.clone(), decoded.into_owned());
                }
            }
        }

        Some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Named parameter values extracted from a matched request path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_literal_paths() {
        let pattern = PathPattern::parse("/health").unwrap();
        assert!(pattern.matches("/health").unwrap().is_empty());
        assert!(pattern.matches("/health/").is_some());
        assert!(pattern.matches("/HEALTH").is_some());
        assert!(pattern.matches("/health/deep").is_none());
        assert!(pattern.matches("/healthz").is_none());
    }

    #[test]
    fn root_pattern_matches_only_root() {
        let pattern = PathPattern::parse("/").unwrap();
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("/users").is_none());
    }

    #[test]
    fn extracts_named_params() {
        let pattern = PathPattern::parse("/api/v1/users/:userID/orders/:orderId").unwrap();
        let params = pattern.matches("/api/v1/users/42/orders/a%20b").unwrap();
        assert_eq!(params.get("userID"), Some("42"));
        assert_eq!(params.get("orderId"), Some("a b"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn empty_param_value_does_not_match() {
        let pattern = PathPattern::parse("/users/:userID/profile").unwrap();
        assert!(pattern.matches("/users//profile").is_none());
    }

    #[test]
    fn undecodable_param_does_not_match() {
        let pattern = PathPattern::parse("/users/:userID").unwrap();
        assert!(pattern.matches("/users/%FF").is_none());
    }

    #[test]
    fn rejects_malformed_patterns() {
        assert_eq!(
            PathPattern::parse("users"),
            Err(PatternError::MissingLeadingSlash)
        );
        assert_eq!(PathPattern::parse("/a//b"), Err(PatternError::EmptySegment));
        assert_eq!(
            PathPattern::parse("/users/:"),
            Err(PatternError::InvalidParamName(String::new()))
        );
        assert_eq!(
            PathPattern::parse("/a/:id/b/:id"),
            Err(PatternError::DuplicateParam("id".to_string()))
        );
        assert!(matches!(
            PathPattern::parse("/files/*"),
            Err(PatternError::UnsupportedSyntax(_))
        ));
    }

    #[test]
    fn shape_ignores_param_names_and_case() {
        let a = PathPattern::parse("/Users/:id").unwrap();
        let b = PathPattern::parse("/users/:userID/").unwrap();
        assert_eq!(a.shape(), b.shape());
        assert_eq!(PathPattern::parse("/").unwrap().shape(), "/");
    }
}
