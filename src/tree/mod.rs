//! The host resource tree.
//!
//! Resources are addressed by [`ResourceId`] handles into an owned table
//! ([`ResourceTree`]) rather than by object references. The [`Host`] wraps the
//! table together with a FIFO event queue and the listener connections, and
//! delivers queued [`TreeEvent`]s from a single dispatch loop.

mod arena;
mod host;
mod signal;

use crate::error::TreeError;
use std::fmt;

pub use arena::ResourceTree;
pub use host::{Host, WeakHost};
pub use signal::{Connection, SignalKind};

/// Result type for tree operations.
pub type TreeResult<T> = std::result::Result<T, TreeError>;

/// Opaque handle to a resource in a [`ResourceTree`].
///
/// Handles are never reused. A destroyed resource keeps its handle, which then
/// only answers queries about its tombstone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value of this handle.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of resource a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// The fixed root of the tree.
    Root,
    /// A plain container.
    Folder,
    /// A watchable, instantiable unit of work.
    Module,
}

/// The property whose change raised a [`TreeEvent::Changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// The module content.
    Source,
    /// The resource name.
    Name,
    /// The parent/location, including removal and destruction.
    Parent,
}

/// An event raised by a tree mutation and queued on the [`Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeEvent {
    /// A property of `resource` changed.
    Changed {
        /// The resource that changed
        resource: ResourceId,
        /// Which property changed
        property: Property,
    },
    /// `descendant` became a descendant of `ancestor`.
    DescendantAdded {
        /// The ancestor observing the addition
        ancestor: ResourceId,
        /// The newly added descendant
        descendant: ResourceId,
    },
}

impl TreeEvent {
    /// The resource whose signal this event is delivered on.
    pub fn target(&self) -> ResourceId {
        match self {
            Self::Changed { resource, .. } => *resource,
            Self::DescendantAdded { ancestor, .. } => *ancestor,
        }
    }

    /// The signal this event is delivered on.
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Changed { .. } => SignalKind::Changed,
            Self::DescendantAdded { .. } => SignalKind::DescendantAdded,
        }
    }
}
