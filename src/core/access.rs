//! Role-based access evaluation.
//!
//! A pure function of (route policy, identity, path parameters): no I/O and
//! no shared state, so it can run on any request task without coordination.
use std::fmt;

use crate::{
    config::models::AccessScope,
    core::{identity::Identity, path_pattern::PathParams, route_table::Route},
};

/// Path parameter holding the resource owner id for `"self"` rules.
pub const USER_ID_PARAM: &str = "userID";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The identity's role has no rule on this route.
    RoleNotAllowed,
    /// A `"self"` rule applies and the URL names someone else's resource.
    NotOwner,
}

impl DenyReason {
    pub fn message(self) -> &'static str {
        match self {
            DenyReason::RoleNotAllowed => "Access Forbidden: Role not allowed",
            DenyReason::NotOwner => "Access Forbidden: You can only access your own data.",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(self) -> bool {
        self == AccessDecision::Allow
    }
}

/// Decide whether `identity` may call `route` with the given path parameters.
///
/// A `"self"` rule on a route without a `:userID` segment always denies.
pub fn authorize(route: &Route, identity: &Identity, params: &PathParams) -> AccessDecision {
    let Some(rule) = route.roles_allowed.get(&identity.role) else {
        return AccessDecision::Deny(DenyReason::RoleNotAllowed);
    };

    match rule.access {
        AccessScope::SelfOnly => {
            if params.get(USER_ID_PARAM) == Some(identity.id.as_str()) {
                AccessDecision::Allow
            } else {
                AccessDecision::Deny(DenyReason::NotOwner)
            }
        }
        AccessScope::All => AccessDecision::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::models::{AccessRule, RouteDescriptor},
        core::route_table::RouteTable,
    };

    fn user_route() -> RouteTable {
        RouteTable::from_descriptors(vec![
            RouteDescriptor::protected("GET", "/users/:userID", "http://users:4001")
                .allow("member", AccessRule::self_only())
                .allow("admin", AccessRule::all()),
        ])
        .unwrap()
    }

    fn params(user_id: &str) -> PathParams {
        [(USER_ID_PARAM, user_id)].into_iter().collect()
    }

    #[test]
    fn unknown_role_is_denied_regardless_of_path() {
        let table = user_route();
        let route = &table.routes()[0];
        let guest = Identity::new("42", "guest");

        assert_eq!(
            authorize(route, &guest, &params("42")),
            AccessDecision::Deny(DenyReason::RoleNotAllowed)
        );
        assert_eq!(
            authorize(route, &guest, &params("7")),
            AccessDecision::Deny(DenyReason::RoleNotAllowed)
        );
    }

    #[test]
    fn self_rule_requires_matching_user_id() {
        let table = user_route();
        let route = &table.routes()[0];

        assert!(authorize(route, &Identity::new("42", "member"), &params("42")).is_allowed());
        assert_eq!(
            authorize(route, &Identity::new("7", "member"), &params("42")),
            AccessDecision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn self_rule_without_user_param_denies() {
        let table = user_route();
        let route = &table.routes()[0];

        assert_eq!(
            authorize(route, &Identity::new("42", "member"), &PathParams::default()),
            AccessDecision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn all_rule_ignores_url_params() {
        let table = user_route();
        let route = &table.routes()[0];

        assert!(authorize(route, &Identity::new("1", "admin"), &params("42")).is_allowed());
        assert!(authorize(route, &Identity::new("1", "admin"), &PathParams::default()).is_allowed());
    }

    #[test]
    fn deny_messages_match_envelope_text() {
        assert_eq!(
            DenyReason::NotOwner.to_string(),
            "Access Forbidden: You can only access your own data."
        );
        assert_eq!(
            DenyReason::RoleNotAllowed.message(),
            "Access Forbidden: Role not allowed"
        );
    }
}
