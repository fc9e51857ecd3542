//! Feeds file contents into module resources.

use crate::error::Result;
use crate::tree::{Host, ResourceId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Maps source files to module resources on a [`Host`].
///
/// Applying a changed file rewrites the bound module's source, which raises
/// the `Changed` event reloaders listen for.
///
/// # Examples
///
/// ```rust,no_run
/// use hot_reloader::notify::{SourceBridge, SourceWatcher};
/// use hot_reloader::prelude::*;
/// use std::time::Duration;
///
/// # async fn example() -> hot_reloader::error::Result<()> {
/// let host = Host::new();
/// let weapons = host.create_module("Weapons", Some(host.root()), "")?;
///
/// let (watcher, rx) = SourceWatcher::new(Duration::from_millis(200))?;
/// let path = watcher.watch("modules/weapons.lua").await?;
///
/// let mut bridge = SourceBridge::new(host.clone());
/// bridge.bind(&path, weapons).await?;
///
/// let reloader = Reloader::new(host.clone());
/// let _stop = reloader.listen(weapons, |_, _| {}, |_, _| {});
///
/// bridge.run(rx).await;
/// # Ok(())
/// # }
/// ```
pub struct SourceBridge {
    host: Host,
    bindings: HashMap<PathBuf, ResourceId>,
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

impl SourceBridge {
    /// Create a bridge with no bindings.
    pub fn new(host: Host) -> Self {
        Self {
            host,
            bindings: HashMap::new(),
        }
    }

    /// Bind `path` to `resource` and load the file's current content into it.
    ///
    /// The binding is recorded only once the content has been loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the resource cannot be written.
    pub async fn bind(&mut self, path: impl AsRef<Path>, resource: ResourceId) -> Result<()> {
        let path = normalize(path.as_ref());
        let content = tokio::fs::read_to_string(&path).await?;
        if self.host.source(resource)? != content {
            self.host.set_source(resource, content)?;
        }
        self.bindings.insert(path, resource);
        Ok(())
    }

    /// Remove the binding for `path`, returning the resource it pointed at.
    pub fn unbind(&mut self, path: impl AsRef<Path>) -> Option<ResourceId> {
        self.bindings.remove(&normalize(path.as_ref()))
    }

    /// The resource bound to `path`.
    pub fn resource_for(&self, path: impl AsRef<Path>) -> Option<ResourceId> {
        self.bindings.get(&normalize(path.as_ref())).copied()
    }

    /// Re-read a bound file and update its resource if the content differs.
    ///
    /// Returns `Ok(false)` for unbound paths and unchanged content.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the resource cannot be written.
    pub async fn apply(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = normalize(path.as_ref());
        let Some(resource) = self.bindings.get(&path).copied() else {
            return Ok(false);
        };

        let content = tokio::fs::read_to_string(&path).await?;
        if self.host.source(resource)? == content {
            return Ok(false);
        }
        self.host.set_source(resource, content)?;
        tracing::debug!(path = %path.display(), %resource, "source file applied");
        Ok(true)
    }

    /// Apply every path received on `rx` and dispatch the resulting events,
    /// until the channel closes.
    pub async fn run(self, mut rx: mpsc::Receiver<PathBuf>) {
        while let Some(path) = rx.recv().await {
            match self.apply(&path).await {
                Ok(true) => {
                    self.host.dispatch_pending();
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "failed to apply source file");
                }
            }
        }
    }
}
