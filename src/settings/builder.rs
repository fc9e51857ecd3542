//! Builder for loading a [`Configuration`] from files and the environment.

use super::configuration::{Configuration, ConfigurationProps, Printer};
use crate::error::{ReloadError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Builder for constructing a [`Configuration`].
///
/// Layers are merged lowest first: explicit props, then files in the order
/// given, then environment variables.
///
/// # Examples
///
/// ```rust,no_run
/// use hot_reloader::settings::Configuration;
///
/// # fn example() -> hot_reloader::error::Result<()> {
/// // HOT_RELOAD_CLONED_RESOURCE_TAG_NAME=LiveCopy overrides the file
/// let configuration = Configuration::builder()
///     .with_file("config/hot_reload.yaml")
///     .with_env_overrides("HOT_RELOAD", "__")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ConfigurationBuilder {
    file_paths: Vec<PathBuf>,
    env_prefix: Option<String>,
    env_separator: Option<String>,
    props: Option<ConfigurationProps>,
    printer: Option<Printer>,
}

impl ConfigurationBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a YAML (.yaml, .yml), TOML (.toml) or JSON (.json) file.
    ///
    /// Later files override earlier ones.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_paths.push(path.into());
        self
    }

    /// Read overrides from environment variables named `<prefix>_<KEY>`.
    ///
    /// `separator` splits nested keys.
    pub fn with_env_overrides(mut self, prefix: &str, separator: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self.env_separator = Some(separator.to_string());
        self
    }

    /// Start from explicit props instead of the defaults.
    pub fn with_props(mut self, props: ConfigurationProps) -> Self {
        self.props = Some(props);
        self
    }

    /// Use `printer` as the message sink.
    pub fn with_printer<F>(mut self, printer: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.printer = Some(Arc::new(printer));
        self
    }

    /// Load, merge and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A file is missing or has an unsupported extension
    /// - A layer cannot be parsed or merged
    /// - The merged props fail validation
    pub fn build(self) -> Result<Configuration> {
        let mut builder = config::Config::builder();

        if let Some(props) = &self.props {
            let layer = config::Config::try_from(props).map_err(|e| {
                ReloadError::LoadError(format!("Failed to convert explicit props: {}", e))
            })?;
            builder = builder.add_source(layer);
        }

        for path in &self.file_paths {
            check_file(path)?;
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        }

        if let (Some(prefix), Some(separator)) = (&self.env_prefix, &self.env_separator) {
            builder = builder.add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator(separator)
                    .try_parsing(true),
            );
        }

        let merged = builder
            .build()
            .map_err(|e| ReloadError::LoadError(format!("Failed to build configuration: {}", e)))?;
        let props: ConfigurationProps = merged.try_deserialize().map_err(|e| {
            ReloadError::LoadError(format!("Failed to deserialize configuration: {}", e))
        })?;

        let configuration = Configuration::from_props(props)?;
        Ok(match self.printer {
            Some(printer) => configuration.with_shared_printer(printer),
            None => configuration,
        })
    }
}

fn check_file(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| {
            ReloadError::LoadError(format!(
                "Unable to determine file format for: {}",
                path.display()
            ))
        })?;

    if !matches!(extension, "yaml" | "yml" | "toml" | "json") {
        return Err(ReloadError::LoadError(format!(
            "Unsupported file extension: {}. Supported: .yaml, .yml, .toml, .json",
            extension
        )));
    }

    if !path.exists() {
        return Err(ReloadError::LoadError(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }
    Ok(())
}

impl Configuration {
    /// Create a new builder for loading a configuration.
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }
}
