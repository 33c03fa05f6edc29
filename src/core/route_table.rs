//! Immutable route table.
//!
//! Built once from validated [`RouteDescriptor`]s and shared read-only by every
//! request task (wrap it in an `Arc`). Matching walks routes in declaration
//! order and the first route whose method and pattern both match wins.
use std::{collections::HashMap, path::Path};

use eyre::{Result, WrapErr};
use http::Method;

use crate::{
    config::{
        loader::load_route_descriptors,
        models::{AccessRule, RouteDescriptor},
        validation::{RouteConfigValidator, ValidationError, ValidationResult},
    },
    core::path_pattern::{PathParams, PathPattern},
};

/// A configured route policy.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: PathPattern,
    /// Backend origin (plus optional base path) without a trailing slash.
    pub target_base_url: String,
    pub public: bool,
    pub roles_allowed: HashMap<String, AccessRule>,
}

impl Route {
    fn from_descriptor(descriptor: RouteDescriptor) -> ValidationResult<Self> {
        let method = RouteConfigValidator::parse_method(&descriptor.method)?;
        let pattern =
            PathPattern::parse(&descriptor.path).map_err(|e| ValidationError::InvalidField {
                field: format!("route '{}' path", descriptor.path),
                message: e.to_string(),
            })?;

        Ok(Self {
            method,
            pattern,
            target_base_url: descriptor.service_url.trim_end_matches('/').to_string(),
            public: descriptor.public,
            roles_allowed: descriptor.roles_allowed,
        })
    }
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: PathParams,
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Validate descriptors and build the table. Fails on the first
    /// configuration problem set (all problems are reported together).
    pub fn from_descriptors(descriptors: Vec<RouteDescriptor>) -> ValidationResult<Self> {
        RouteConfigValidator::validate(&descriptors)?;

        let routes = descriptors
            .into_iter()
            .map(Route::from_descriptor)
            .collect::<ValidationResult<Vec<_>>>()?;

        Ok(Self { routes })
    }

    /// Read, resolve, validate and build a route table from a routes file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let descriptors = load_route_descriptors(path)?;
        Self::from_descriptors(descriptors)
            .wrap_err_with(|| format!("Invalid route configuration in {}", path.display()))
    }

    /// Find the first route declared for `method` whose pattern matches `path`.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                route
                    .pattern
                    .matches(path)
                    .map(|params| RouteMatch { route, params })
            })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
