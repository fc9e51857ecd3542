//! Core reload controller types.

mod context;
mod reloader;
mod scan;

pub use context::{CleanupFunction, Context};
pub use reloader::Reloader;
