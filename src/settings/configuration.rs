//! The immutable configuration value read by reloaders.

use super::Validate;
use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Tag applied to every clone unless configured otherwise.
pub const DEFAULT_CLONED_RESOURCE_TAG_NAME: &str = "HotReloadTarget";

/// Sink for informational reload messages.
pub type Printer = Arc<dyn Fn(&str) + Send + Sync>;

/// Recognized configuration options.
///
/// Every field has a default, so a partial options object (for example a
/// YAML file naming only some keys) deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigurationProps {
    /// Tag applied to every clone, so external tooling can find or filter them.
    pub cloned_resource_tag_name: String,
}

impl Default for ConfigurationProps {
    fn default() -> Self {
        Self {
            cloned_resource_tag_name: DEFAULT_CLONED_RESOURCE_TAG_NAME.to_string(),
        }
    }
}

impl Validate for ConfigurationProps {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        let tag = &self.cloned_resource_tag_name;
        if tag.is_empty() {
            return Err(ValidationError::invalid_field(
                "cloned_resource_tag_name",
                "must not be empty",
            ));
        }
        if tag.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ValidationError::invalid_field(
                "cloned_resource_tag_name",
                "must not contain whitespace or control characters",
            ));
        }
        Ok(())
    }
}

fn default_printer() -> Printer {
    Arc::new(|message: &str| tracing::warn!(target: "hot_reloader", "{}", message))
}

/// Options a reloader runs with.
///
/// Immutable once built; reloaders share it behind an `Arc`.
///
/// # Examples
///
/// ```rust
/// use hot_reloader::settings::{Configuration, ConfigurationProps};
///
/// let configuration = Configuration::from_props(ConfigurationProps {
///     cloned_resource_tag_name: "LiveCopy".to_string(),
/// })
/// .unwrap()
/// .with_printer(|message| println!("{message}"));
///
/// assert_eq!(configuration.cloned_resource_tag_name(), "LiveCopy");
/// assert!(Configuration::is(&configuration));
/// ```
#[derive(Clone)]
pub struct Configuration {
    props: ConfigurationProps,
    printer: Printer,
}

impl Configuration {
    /// Create a configuration with every option at its default.
    pub fn new() -> Self {
        Self {
            props: ConfigurationProps::default(),
            printer: default_printer(),
        }
    }

    /// Create a configuration from explicit props.
    ///
    /// # Errors
    ///
    /// Returns `ReloadError::InvalidConfiguration` if the props fail validation.
    pub fn from_props(props: ConfigurationProps) -> Result<Self> {
        props.validate()?;
        Ok(Self {
            props,
            printer: default_printer(),
        })
    }

    /// Create a configuration from props, falling back to defaults if they are invalid.
    pub fn from_props_or_default(props: ConfigurationProps) -> Self {
        match props.validate() {
            Ok(()) => Self {
                props,
                printer: default_printer(),
            },
            Err(err) => {
                tracing::warn!(error = %err, "invalid configuration props, using defaults");
                Self::new()
            }
        }
    }

    /// Replace the message sink.
    pub fn with_printer<F>(mut self, printer: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.printer = Arc::new(printer);
        self
    }

    pub(crate) fn with_shared_printer(mut self, printer: Printer) -> Self {
        self.printer = printer;
        self
    }

    /// Whether `value` is a well-formed configuration.
    pub fn is(value: &dyn Any) -> bool {
        value
            .downcast_ref::<Configuration>()
            .is_some_and(|configuration| configuration.props.validate().is_ok())
    }

    /// The recognized options.
    pub fn props(&self) -> &ConfigurationProps {
        &self.props
    }

    /// Tag applied to every clone.
    pub fn cloned_resource_tag_name(&self) -> &str {
        &self.props.cloned_resource_tag_name
    }

    /// Send a message to the configured sink.
    pub fn print(&self, message: &str) {
        (self.printer)(message);
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("props", &self.props)
            .finish_non_exhaustive()
    }
}
