pub mod access;
pub mod envelope;
pub mod identity;
pub mod path_pattern;
pub mod relay;
pub mod route_table;

pub use access::{AccessDecision, DenyReason, authorize};
pub use envelope::{Envelope, EnvelopeStatus};
pub use identity::Identity;
pub use path_pattern::{PathParams, PathPattern};
pub use relay::RelayedResponse;
pub use route_table::{Route, RouteMatch, RouteTable};
