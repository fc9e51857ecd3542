//! The reload controller.

use super::{CleanupFunction, Context};
use crate::settings::{Configuration, get_global_configuration};
use crate::tree::{Connection, Host, ResourceId, TreeResult, WeakHost};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Callback receiving the live instance and its context.
pub(super) type Callback = Arc<dyn Fn(ResourceId, &Context) + Send + Sync>;

struct Subscription {
    token: u64,
    connection: Connection,
}

#[derive(Default)]
pub(super) struct ReloaderState {
    /// Original resource -> its active change subscription.
    listeners: HashMap<ResourceId, Subscription>,
    /// Original resource -> its current live clone.
    cloned: HashMap<ResourceId, ResourceId>,
    /// Discovery connections installed by `scan`.
    pub(super) scans: HashMap<u64, Connection>,
    next_token: u64,
}

impl ReloaderState {
    pub(super) fn next_token(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        token
    }

    fn is_active(&self, resource: ResourceId, token: u64) -> bool {
        self.listeners
            .get(&resource)
            .is_some_and(|subscription| subscription.token == token)
    }
}

/// State shared between a reloader and the handlers it installs.
pub(super) struct Shared {
    pub(super) configuration: Arc<Configuration>,
    pub(super) state: Mutex<ReloaderState>,
}

/// Watches module resources and swaps in fresh clones when they change.
///
/// Clones of a `Reloader` share its registrations. Dropping a reloader does
/// not stop its watches; call [`Reloader::destroy`].
///
/// # Examples
///
/// ```rust
/// use hot_reloader::prelude::*;
///
/// let host = Host::new();
/// let module = host.create_module("Inventory", Some(host.root()), "v1").unwrap();
/// let reloader = Reloader::with_configuration(host.clone(), Configuration::new());
///
/// let _cleanup = reloader.listen(
///     module,
///     |resource, context| println!("ready {resource} (reloading: {})", context.is_reloading),
///     |resource, _context| println!("stale {resource}"),
/// );
///
/// host.set_source(module, "v2").unwrap();
/// host.dispatch_pending();
/// assert!(reloader.live_clone(module).is_some());
/// ```
#[derive(Clone)]
pub struct Reloader {
    host: Host,
    shared: Arc<Shared>,
}

impl Reloader {
    /// Create a reloader using the process-wide configuration as it is right now.
    pub fn new(host: Host) -> Self {
        Self::with_configuration(host, get_global_configuration())
    }

    /// Create a reloader with an explicit configuration.
    pub fn with_configuration(host: Host, configuration: impl Into<Arc<Configuration>>) -> Self {
        Self {
            host,
            shared: Arc::new(Shared {
                configuration: configuration.into(),
                state: Mutex::new(ReloaderState::default()),
            }),
        }
    }

    /// The host this reloader watches.
    pub fn host(&self) -> &Host {
        &self.host
    }

    /// The configuration captured at construction.
    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.shared.configuration
    }

    pub(super) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Deliver `resource` now, then redeliver a fresh clone after every change.
    ///
    /// `on_ready` runs once before this returns with `is_reloading == false`.
    /// When the host is live-editing, every later change to `resource` runs
    /// `on_cleanup` for the current live instance (the latest clone, or the
    /// original before any reload), then, if the original is still in the
    /// tree, clones it, places the clone beside it and runs `on_ready` for the
    /// clone with `is_reloading == true`.
    ///
    /// Listening again to a resource this reloader already watches replaces
    /// the previous registration.
    ///
    /// The returned handle unsubscribes and destroys the live clone; calling
    /// it again is a no-op. Outside live editing nothing is watched and the
    /// handle is a no-op.
    pub fn listen<R, C>(&self, resource: ResourceId, on_ready: R, on_cleanup: C) -> CleanupFunction
    where
        R: Fn(ResourceId, &Context) + Send + Sync + 'static,
        C: Fn(ResourceId, &Context) + Send + Sync + 'static,
    {
        register(
            &self.host,
            &self.shared,
            resource,
            Arc::new(on_ready),
            Arc::new(on_cleanup),
        )
    }

    /// Disconnect every watch, destroy every live clone and forget both.
    ///
    /// Handles returned earlier by `listen` and `scan` become no-ops.
    pub fn destroy(&self) {
        let (connections, clones) = {
            let mut state = self.shared.state.lock();
            let mut connections: Vec<Connection> = state
                .listeners
                .drain()
                .map(|(_, subscription)| subscription.connection)
                .collect();
            connections.extend(state.scans.drain().map(|(_, connection)| connection));
            let clones: Vec<ResourceId> = state.cloned.drain().map(|(_, clone)| clone).collect();
            (connections, clones)
        };

        if connections.is_empty() && clones.is_empty() {
            return;
        }
        tracing::debug!(
            connections = connections.len(),
            clones = clones.len(),
            "destroying reloader"
        );

        for connection in connections {
            connection.disconnect();
        }
        for clone in clones {
            if let Err(err) = self.host.destroy(clone) {
                tracing::debug!(%clone, error = %err, "clone already gone");
            }
        }
    }

    /// Number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.shared.state.lock().listeners.len()
    }

    /// Number of live clones being tracked.
    pub fn clone_count(&self) -> usize {
        self.shared.state.lock().cloned.len()
    }

    /// The live clone of `original`, if it has been reloaded.
    pub fn live_clone(&self, original: ResourceId) -> Option<ResourceId> {
        self.shared.state.lock().cloned.get(&original).copied()
    }

    /// Whether this reloader is watching `resource`.
    pub fn is_listening(&self, resource: ResourceId) -> bool {
        self.shared.state.lock().listeners.contains_key(&resource)
    }
}

impl std::fmt::Debug for Reloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reloader")
            .field("subscriptions", &self.subscription_count())
            .field("clones", &self.clone_count())
            .finish()
    }
}

/// Register one resource. Shared by `listen` and `scan`.
pub(super) fn register(
    host: &Host,
    shared: &Arc<Shared>,
    resource: ResourceId,
    on_ready: Callback,
    on_cleanup: Callback,
) -> CleanupFunction {
    on_ready(resource, &Context::new(resource, false));

    if !host.is_live_editing() {
        return CleanupFunction::noop();
    }

    let (token, replaced) = {
        let mut state = shared.state.lock();
        let previous = state.listeners.remove(&resource);
        let replaced =
            previous.map(|subscription| (subscription.connection, state.cloned.remove(&resource)));
        (state.next_token(), replaced)
    };

    if let Some((connection, clone)) = replaced {
        tracing::warn!(%resource, "resource was already being watched, replacing registration");
        connection.disconnect();
        if let Some(clone) = clone {
            if let Err(err) = host.destroy(clone) {
                tracing::debug!(%clone, error = %err, "clone already gone");
            }
        }
    }

    let watch = Arc::new(Watch {
        resource,
        token,
        host: host.downgrade(),
        shared: Arc::clone(shared),
        on_ready,
        on_cleanup,
    });

    let handler_watch = Arc::clone(&watch);
    let connection = host.connect_changed(resource, move |_event| handler_watch.run_cycle());
    shared
        .state
        .lock()
        .listeners
        .insert(resource, Subscription { token, connection });
    tracing::debug!(%resource, token, "watching resource");

    CleanupFunction::new(move || watch.unsubscribe())
}

/// One registration: what a change handler and its unsubscribe need.
struct Watch {
    resource: ResourceId,
    token: u64,
    host: WeakHost,
    shared: Arc<Shared>,
    on_ready: Callback,
    on_cleanup: Callback,
}

impl Watch {
    fn is_active(&self) -> bool {
        self.shared.state.lock().is_active(self.resource, self.token)
    }

    fn run_cycle(&self) {
        let Some(host) = self.host.upgrade() else {
            return;
        };
        if !self.is_active() {
            return;
        }

        let still_exists = host.exists_in_tree(self.resource);
        let previous = self.shared.state.lock().cloned.get(&self.resource).copied();
        (self.on_cleanup)(
            previous.unwrap_or(self.resource),
            &Context::new(self.resource, still_exists),
        );

        if !self.is_active() {
            tracing::debug!(resource = %self.resource, "unsubscribed during cleanup");
            return;
        }
        if let Some(previous) = previous {
            self.retire(&host, previous);
        }
        if !still_exists {
            tracing::debug!(resource = %self.resource, "original left the tree, not reloading");
            return;
        }

        let clone = match self.spawn_clone(&host) {
            Ok(clone) => clone,
            Err(err) => {
                tracing::debug!(resource = %self.resource, error = %err, "original vanished before cloning");
                return;
            }
        };
        self.shared.state.lock().cloned.insert(self.resource, clone);

        (self.on_ready)(clone, &Context::new(self.resource, true));

        let name = host
            .full_name(self.resource)
            .unwrap_or_else(|_| self.resource.to_string());
        tracing::info!(resource = %self.resource, %clone, %name, "reload cycle complete");
        self.shared
            .configuration
            .print(&format!("HotReloaded {}", name));
    }

    fn retire(&self, host: &Host, previous: ResourceId) {
        {
            let mut state = self.shared.state.lock();
            if state.cloned.get(&self.resource) == Some(&previous) {
                state.cloned.remove(&self.resource);
            }
        }
        if let Err(err) = host.destroy(previous) {
            tracing::debug!(clone = %previous, error = %err, "clone already gone");
        }
    }

    fn spawn_clone(&self, host: &Host) -> TreeResult<ResourceId> {
        let parent = host.parent(self.resource)?;
        let clone = host.clone_resource(self.resource)?;
        let placed = host
            .add_tag(clone, self.shared.configuration.cloned_resource_tag_name())
            .and_then(|()| host.set_parent(clone, parent));
        if let Err(err) = placed {
            let _ = host.destroy(clone);
            return Err(err);
        }
        Ok(clone)
    }

    fn unsubscribe(&self) {
        let (connection, clone) = {
            let mut state = self.shared.state.lock();
            if !state.is_active(self.resource, self.token) {
                return;
            }
            let connection = state
                .listeners
                .remove(&self.resource)
                .map(|subscription| subscription.connection);
            (connection, state.cloned.remove(&self.resource))
        };

        tracing::debug!(resource = %self.resource, token = self.token, "unsubscribing");
        if let Some(connection) = connection {
            connection.disconnect();
        }
        if let (Some(clone), Some(host)) = (clone, self.host.upgrade()) {
            if let Err(err) = host.destroy(clone) {
                tracing::debug!(%clone, error = %err, "clone already gone");
            }
        }
    }
}
