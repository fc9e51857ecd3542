//! Discovery of module resources under a subtree.

use super::reloader::{Callback, Shared, register};
use super::{CleanupFunction, Context, Reloader};
use crate::tree::{Host, ResourceId, ResourceKind, TreeEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-scan bookkeeping. `None` once the scan has been torn down.
struct Discovery {
    shared: Arc<Shared>,
    on_ready: Callback,
    on_cleanup: Callback,
    registered: Mutex<Option<HashMap<ResourceId, CleanupFunction>>>,
}

impl Discovery {
    fn is_candidate(&self, host: &Host, resource: ResourceId) -> bool {
        let tag = self.shared.configuration.cloned_resource_tag_name();
        host.kind(resource) == Ok(ResourceKind::Module)
            && host.exists(resource)
            && !host.has_tagged_ancestor(resource, tag)
    }

    fn consider(&self, host: &Host, resource: ResourceId) {
        if !self.is_candidate(host, resource) {
            return;
        }
        {
            let mut registered = self.registered.lock();
            let Some(map) = registered.as_mut() else {
                return;
            };
            if map.contains_key(&resource) {
                return;
            }
            map.insert(resource, CleanupFunction::noop());
        }

        let cleanup = register(
            host,
            &self.shared,
            resource,
            Arc::clone(&self.on_ready),
            Arc::clone(&self.on_cleanup),
        );

        // The scan may have been torn down from inside on_ready.
        let orphaned = match self.registered.lock().as_mut() {
            Some(map) => {
                map.insert(resource, cleanup);
                None
            }
            None => Some(cleanup),
        };
        if let Some(cleanup) = orphaned {
            cleanup.call();
        }
    }

    fn teardown(&self) {
        let registered = self.registered.lock().take();
        for (_, cleanup) in registered.into_iter().flatten() {
            cleanup.call();
        }
    }
}

impl Reloader {
    /// Call [`listen`](Reloader::listen) on every module below `root`, now and
    /// as new ones are added.
    ///
    /// Existing descendants are registered in pre-order before this returns.
    /// While the host is live-editing, modules added later are registered when
    /// their `DescendantAdded` event is dispatched. Clones made by this
    /// reloader, and anything inside them, are never registered. Each module
    /// is registered at most once per scan.
    ///
    /// The returned handle stops discovery and unsubscribes every module the
    /// scan registered.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hot_reloader::prelude::*;
    ///
    /// let host = Host::new();
    /// let shared = host.create_folder("Shared", Some(host.root())).unwrap();
    /// host.create_module("Weapons", Some(shared), "v1").unwrap();
    ///
    /// let reloader = Reloader::with_configuration(host.clone(), Configuration::new());
    /// let stop = reloader.scan(shared, |_, _| {}, |_, _| {});
    ///
    /// host.create_module("Armor", Some(shared), "v1").unwrap();
    /// host.dispatch_pending();
    /// assert_eq!(reloader.subscription_count(), 2);
    ///
    /// stop.call();
    /// assert_eq!(reloader.subscription_count(), 0);
    /// ```
    pub fn scan<R, C>(&self, root: ResourceId, on_ready: R, on_cleanup: C) -> CleanupFunction
    where
        R: Fn(ResourceId, &Context) + Send + Sync + 'static,
        C: Fn(ResourceId, &Context) + Send + Sync + 'static,
    {
        let host = self.host();
        let discovery = Arc::new(Discovery {
            shared: Arc::clone(self.shared()),
            on_ready: Arc::new(on_ready),
            on_cleanup: Arc::new(on_cleanup),
            registered: Mutex::new(Some(HashMap::new())),
        });

        let token = if host.is_live_editing() {
            let weak = host.downgrade();
            let handler_discovery = Arc::clone(&discovery);
            let connection = host.connect_descendant_added(root, move |event| {
                if let (TreeEvent::DescendantAdded { descendant, .. }, Some(host)) =
                    (event, weak.upgrade())
                {
                    handler_discovery.consider(&host, *descendant);
                }
            });
            let mut state = self.shared().state.lock();
            let token = state.next_token();
            state.scans.insert(token, connection);
            Some(token)
        } else {
            None
        };

        let existing = host.descendants(root).unwrap_or_default();
        tracing::debug!(%root, existing = existing.len(), "scanning for modules");
        for resource in existing {
            discovery.consider(host, resource);
        }

        let shared = Arc::clone(self.shared());
        CleanupFunction::new(move || {
            if let Some(token) = token {
                let connection = shared.state.lock().scans.remove(&token);
                if let Some(connection) = connection {
                    connection.disconnect();
                }
            }
            discovery.teardown();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Configuration;

    #[test]
    fn test_skips_non_modules_and_clones() {
        let host = Host::new();
        let folder = host.create_folder("Shared", Some(host.root())).unwrap();
        let module = host.create_module("Weapons", Some(folder), "v1").unwrap();
        host.create_folder("Assets", Some(folder)).unwrap();
        host.dispatch_pending();

        let reloader = Reloader::with_configuration(host.clone(), Configuration::new());
        let _stop = reloader.scan(folder, |_, _| {}, |_, _| {});
        assert_eq!(reloader.subscription_count(), 1);

        host.set_source(module, "v2").unwrap();
        host.dispatch_pending();
        assert!(reloader.live_clone(module).is_some());
        assert_eq!(reloader.subscription_count(), 1);
    }

    #[test]
    fn test_teardown_after_destroy_is_noop() {
        let host = Host::new();
        let folder = host.create_folder("Shared", Some(host.root())).unwrap();
        host.create_module("Weapons", Some(folder), "v1").unwrap();

        let reloader = Reloader::with_configuration(host.clone(), Configuration::new());
        let stop = reloader.scan(folder, |_, _| {}, |_, _| {});
        reloader.destroy();
        stop.call();
        stop.call();
        assert_eq!(reloader.subscription_count(), 0);
        assert_eq!(host.connection_count(), 0);
    }
}
