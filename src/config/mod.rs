pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{load_route_descriptors, load_settings, load_settings_from};
pub use models::*;
pub use validation::{RouteConfigValidator, SettingsValidator, ValidationError, ValidationResult};
