//! Reloader configuration: options, validation, loading and the global default.

mod builder;
mod configuration;
mod global;
mod validation;

pub use builder::ConfigurationBuilder;
pub use configuration::{
    Configuration, ConfigurationProps, DEFAULT_CLONED_RESOURCE_TAG_NAME, Printer,
};
pub use global::{get_global_configuration, reset_global_configuration, set_global_configuration};
pub use validation::Validate;
