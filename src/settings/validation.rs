//! Configuration validation support.

use crate::error::ValidationError;

/// Trait for configuration validation.
///
/// [`ConfigurationProps`](crate::settings::ConfigurationProps) implements this,
/// and `Configuration::from_props` refuses props that fail it.
///
/// # Examples
///
/// ```rust
/// use hot_reloader::settings::{ConfigurationProps, Validate};
///
/// let props = ConfigurationProps {
///     cloned_resource_tag_name: String::new(),
/// };
/// assert!(props.validate().is_err());
/// ```
pub trait Validate {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Should return a `ValidationError` describing what validation failed.
    fn validate(&self) -> Result<(), ValidationError>;
}
