//! Error types for hot-reloader.

use crate::tree::ResourceId;
use std::fmt;

/// Result type alias for hot-reloader operations.
pub type Result<T> = std::result::Result<T, ReloadError>;

/// Errors that can occur outside the reload protocol itself.
///
/// `Reloader::listen`, `Reloader::scan` and `Reloader::destroy` never return
/// these; failures inside a reload cycle are handled locally and logged.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    /// An operation on the host resource tree failed.
    #[error("Resource tree error: {0}")]
    Tree(#[from] TreeError),

    /// Configuration props were rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Failed to load configuration from a file or the environment.
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    /// File watching failed to initialize or to (un)watch a path.
    #[error("File watching error: {0}")]
    WatchError(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors raised by [`ResourceTree`](crate::tree::ResourceTree) mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// The handle was never issued by this tree.
    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),

    /// The resource has been destroyed and can no longer be changed or cloned.
    #[error("resource {0} has been destroyed")]
    Destroyed(ResourceId),

    /// The root cannot be moved, cloned or destroyed.
    #[error("the root resource is locked")]
    RootLocked,

    /// Re-parenting would make a resource its own ancestor.
    #[error("cannot parent {resource} under {parent}: would create a cycle")]
    WouldCycle {
        /// The resource being moved
        resource: ResourceId,
        /// The requested new parent
        parent: ResourceId,
    },
}

/// Validation error for configuration props.
#[derive(Debug)]
pub enum ValidationError {
    /// Custom validation error with a message.
    Custom(String),

    /// A specific field has an invalid value.
    InvalidField {
        /// The field name/path
        field: String,
        /// The reason why it's invalid
        reason: String,
    },

    /// Multiple validation errors occurred.
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Create a custom validation error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(msg) => write!(f, "{}", msg),
            Self::InvalidField { field, reason } => {
                write!(f, "Field '{}' is invalid: {}", field, reason)
            }
            Self::Multiple(errors) => {
                writeln!(f, "Multiple validation errors:")?;
                for (i, err) in errors.iter().enumerate() {
                    writeln!(f, "  {}. {}", i + 1, err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for ReloadError {
    fn from(err: ValidationError) -> Self {
        ReloadError::InvalidConfiguration(err.to_string())
    }
}
