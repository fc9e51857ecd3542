//! # hot-reloader
//!
//! Development-time hot-reload controller for live module resources.
//!
//! ## Overview
//!
//! `hot-reloader` watches "module" resources in a running host and, when one
//! changes, swaps the running instance for a fresh clone without restarting
//! the process:
//! - Every `listen` delivers the resource once, immediately
//! - Each change runs cleanup for the live instance, clones the original and
//!   delivers the clone
//! - `scan` registers every module under a subtree, including later ones
//! - Unsubscribe handles and `destroy` are idempotent
//!
//! ## Quick Start
//!
//! ```rust
//! use hot_reloader::prelude::*;
//!
//! let host = Host::new();
//! let shared = host.create_folder("Shared", Some(host.root())).unwrap();
//! let weapons = host.create_module("Weapons", Some(shared), "damage = 10").unwrap();
//!
//! let reloader = Reloader::new(host.clone());
//! let stop = reloader.listen(
//!     weapons,
//!     |module, context| {
//!         // start using `module`; context.is_reloading is false the first time
//!     },
//!     |module, context| {
//!         // stop using `module`
//!     },
//! );
//!
//! // An editor rewrites the module...
//! host.set_source(weapons, "damage = 12").unwrap();
//! // ...and the host delivers the change: cleanup, clone, ready.
//! host.dispatch_pending();
//!
//! stop.call();
//! ```
//!
//! ## Features
//!
//! - **Exactly-once delivery**: one ready per listen, one cleanup/ready pair per change
//! - **Clone tracking**: at most one live clone per original, tagged for tooling
//! - **Ordered dispatch**: a single event queue, never reentrant
//! - **Configuration**: files, environment variables and a process-wide default
//! - **File watching**: map files to modules and reload on save (`file-watch`)

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod settings;
pub mod tree;

#[cfg(feature = "file-watch")]
pub mod notify;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{CleanupFunction, Context, Reloader};
    pub use crate::error::{ReloadError, Result, TreeError, ValidationError};
    pub use crate::settings::{
        Configuration, ConfigurationProps, Validate, get_global_configuration,
        set_global_configuration,
    };
    pub use crate::tree::{Host, ResourceId, ResourceKind};
}
