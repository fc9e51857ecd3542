//! File-backed change notification.
//!
//! Watches module source files on disk and turns edits into `Changed` events
//! on a [`Host`](crate::tree::Host).

pub mod bridge;
pub mod watcher;

pub use bridge::SourceBridge;
pub use watcher::SourceWatcher;
