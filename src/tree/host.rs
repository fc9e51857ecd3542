//! The host environment: resource table, event queue and dispatch loop.

use super::signal::{Handler, SignalTable};
use super::{Connection, ResourceId, ResourceKind, ResourceTree, SignalKind, TreeEvent, TreeResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

pub(crate) struct HostInner {
    tree: ResourceTree,
    queue: VecDeque<(u64, TreeEvent)>,
    next_seq: u64,
    pub(crate) signals: SignalTable,
    live_editing: bool,
    dispatching: bool,
}

/// Shared handle to a live resource tree.
///
/// Mutations queue [`TreeEvent`]s; nothing is delivered until
/// [`Host::dispatch_pending`] runs. The lock is never held while a handler
/// runs, so handlers may freely call back into the host.
///
/// # Examples
///
/// ```rust
/// use hot_reloader::tree::Host;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let host = Host::new();
/// let module = host.create_module("Inventory", Some(host.root()), "v1").unwrap();
///
/// let seen = Arc::new(AtomicUsize::new(0));
/// let seen_clone = Arc::clone(&seen);
/// let connection = host.connect_changed(module, move |_event| {
///     seen_clone.fetch_add(1, Ordering::SeqCst);
/// });
///
/// host.set_source(module, "v2").unwrap();
/// assert_eq!(seen.load(Ordering::SeqCst), 0);
///
/// host.dispatch_pending();
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// connection.disconnect();
/// ```
#[derive(Clone)]
pub struct Host {
    inner: Arc<Mutex<HostInner>>,
}

/// Non-owning reference to a [`Host`], held by event handlers.
#[derive(Clone)]
pub struct WeakHost {
    inner: Weak<Mutex<HostInner>>,
}

impl WeakHost {
    /// Get the host back if it is still alive.
    pub fn upgrade(&self) -> Option<Host> {
        self.inner.upgrade().map(|inner| Host { inner })
    }
}

struct DispatchGuard<'a>(&'a Mutex<HostInner>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().dispatching = false;
    }
}

impl Host {
    /// Create a live-editing host with an empty tree.
    pub fn new() -> Self {
        Self::with_live_editing(true)
    }

    /// Create a host, choosing whether it is a live-editing environment.
    ///
    /// Outside live editing, reloaders deliver each resource once and never watch.
    pub fn with_live_editing(live_editing: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HostInner {
                tree: ResourceTree::new(),
                queue: VecDeque::new(),
                next_seq: 0,
                signals: SignalTable::default(),
                live_editing,
                dispatching: false,
            })),
        }
    }

    /// Get a weak reference to this host.
    pub fn downgrade(&self) -> WeakHost {
        WeakHost {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether this host is a live-editing environment.
    pub fn is_live_editing(&self) -> bool {
        self.inner.lock().live_editing
    }

    /// Switch the live-editing predicate. Affects only later registrations.
    pub fn set_live_editing(&self, live_editing: bool) {
        self.inner.lock().live_editing = live_editing;
    }

    /// Run `f` against a read-only view of the tree.
    pub fn read<R>(&self, f: impl FnOnce(&ResourceTree) -> R) -> R {
        f(&self.inner.lock().tree)
    }

    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut ResourceTree) -> TreeResult<(T, Vec<TreeEvent>)>,
    ) -> TreeResult<T> {
        let mut inner = self.inner.lock();
        let (value, events) = f(&mut inner.tree)?;
        for event in events {
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.queue.push_back((seq, event));
        }
        Ok(value)
    }

    /// The fixed root resource.
    pub fn root(&self) -> ResourceId {
        self.read(ResourceTree::root)
    }

    /// Create a resource of any non-root kind.
    pub fn create(
        &self,
        name: impl Into<String>,
        kind: ResourceKind,
        parent: Option<ResourceId>,
    ) -> TreeResult<ResourceId> {
        self.mutate(|tree| tree.create(name, kind, parent))
    }

    /// Create a folder.
    pub fn create_folder(
        &self,
        name: impl Into<String>,
        parent: Option<ResourceId>,
    ) -> TreeResult<ResourceId> {
        self.create(name, ResourceKind::Folder, parent)
    }

    /// Create a module with initial content.
    ///
    /// The content is set before the module is placed, so creation raises no
    /// `Changed(Source)` event.
    pub fn create_module(
        &self,
        name: impl Into<String>,
        parent: Option<ResourceId>,
        source: impl Into<String>,
    ) -> TreeResult<ResourceId> {
        self.mutate(|tree| {
            let (id, _) = tree.create(name, ResourceKind::Module, None)?;
            tree.set_source(id, source)?;
            let events = match parent {
                Some(parent) => tree.set_parent(id, Some(parent))?,
                None => Vec::new(),
            };
            Ok((id, events))
        })
    }

    /// Replace the content of a resource.
    pub fn set_source(&self, id: ResourceId, source: impl Into<String>) -> TreeResult<()> {
        self.mutate(|tree| Ok(((), tree.set_source(id, source)?)))
    }

    /// Rename a resource.
    pub fn rename(&self, id: ResourceId, name: impl Into<String>) -> TreeResult<()> {
        self.mutate(|tree| Ok(((), tree.rename(id, name)?)))
    }

    /// Move a resource, or detach it with `None`.
    pub fn set_parent(&self, id: ResourceId, parent: Option<ResourceId>) -> TreeResult<()> {
        self.mutate(|tree| Ok(((), tree.set_parent(id, parent)?)))
    }

    /// Destroy a resource and its subtree.
    pub fn destroy(&self, id: ResourceId) -> TreeResult<()> {
        self.mutate(|tree| Ok(((), tree.destroy(id)?)))
    }

    /// Deep-copy a resource under a new identity. The copy is detached.
    pub fn clone_resource(&self, id: ResourceId) -> TreeResult<ResourceId> {
        self.mutate(|tree| Ok((tree.clone_subtree(id)?, Vec::new())))
    }

    /// Mark a resource with a tag.
    pub fn add_tag(&self, id: ResourceId, tag: impl Into<String>) -> TreeResult<()> {
        self.inner.lock().tree.add_tag(id, tag)
    }

    /// Whether the resource carries `tag`.
    pub fn has_tag(&self, id: ResourceId, tag: &str) -> bool {
        self.read(|tree| tree.has_tag(id, tag))
    }

    /// Whether the resource or one of its ancestors carries `tag`.
    pub fn has_tagged_ancestor(&self, id: ResourceId, tag: &str) -> bool {
        self.read(|tree| tree.has_tagged_ancestor(id, tag))
    }

    /// Whether the resource exists and has not been destroyed.
    pub fn exists(&self, id: ResourceId) -> bool {
        self.read(|tree| tree.exists(id))
    }

    /// Whether the resource is reachable from the root.
    pub fn exists_in_tree(&self, id: ResourceId) -> bool {
        self.read(|tree| tree.exists_in_tree(id))
    }

    /// Whether `ancestor` is a strict ancestor of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: ResourceId, descendant: ResourceId) -> bool {
        self.read(|tree| tree.is_ancestor_of(ancestor, descendant))
    }

    /// Current parent of a resource.
    pub fn parent(&self, id: ResourceId) -> TreeResult<Option<ResourceId>> {
        self.read(|tree| tree.parent(id))
    }

    /// Kind of a resource.
    pub fn kind(&self, id: ResourceId) -> TreeResult<ResourceKind> {
        self.read(|tree| tree.kind(id))
    }

    /// Name of a resource.
    pub fn name(&self, id: ResourceId) -> TreeResult<String> {
        self.read(|tree| tree.name(id).map(str::to_owned))
    }

    /// Content of a resource.
    pub fn source(&self, id: ResourceId) -> TreeResult<String> {
        self.read(|tree| tree.source(id).map(str::to_owned))
    }

    /// Dot-joined path of a resource.
    pub fn full_name(&self, id: ResourceId) -> TreeResult<String> {
        self.read(|tree| tree.full_name(id))
    }

    /// Direct children of a resource.
    pub fn children(&self, id: ResourceId) -> TreeResult<Vec<ResourceId>> {
        self.read(|tree| tree.children(id).map(<[ResourceId]>::to_vec))
    }

    /// All descendants of a resource, pre-order.
    pub fn descendants(&self, id: ResourceId) -> TreeResult<Vec<ResourceId>> {
        self.read(|tree| tree.descendants(id))
    }

    fn connect(&self, target: ResourceId, kind: SignalKind, handler: Handler) -> Connection {
        let mut inner = self.inner.lock();
        let since = inner.next_seq;
        let id = inner.signals.connect(target, kind, since, handler);
        Connection::new(id, Arc::downgrade(&self.inner))
    }

    /// Listen for property changes of `resource`.
    ///
    /// Like every connection, it only observes events raised after this call.
    pub fn connect_changed<F>(&self, resource: ResourceId, handler: F) -> Connection
    where
        F: Fn(&TreeEvent) + Send + Sync + 'static,
    {
        self.connect(resource, SignalKind::Changed, Arc::new(handler))
    }

    /// Listen for resources added anywhere below `ancestor`.
    pub fn connect_descendant_added<F>(&self, ancestor: ResourceId, handler: F) -> Connection
    where
        F: Fn(&TreeEvent) + Send + Sync + 'static,
    {
        self.connect(ancestor, SignalKind::DescendantAdded, Arc::new(handler))
    }

    /// Number of connected listeners.
    pub fn connection_count(&self) -> usize {
        self.inner.lock().signals.len()
    }

    /// Number of queued, undelivered events.
    pub fn pending_events(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Deliver queued events until the queue is empty.
    ///
    /// Events are delivered one at a time in the order they were raised; every
    /// handler for one event returns before the next event is taken. Events
    /// raised by handlers are queued behind the current one. A handler that
    /// was disconnected earlier in the same pass is skipped. Called from inside
    /// a handler, this returns 0 without delivering anything.
    ///
    /// Returns the number of events taken off the queue.
    pub fn dispatch_pending(&self) -> usize {
        {
            let mut inner = self.inner.lock();
            if inner.dispatching {
                return 0;
            }
            inner.dispatching = true;
        }
        let _guard = DispatchGuard(&*self.inner);

        let mut processed = 0;
        loop {
            let (event, handlers) = {
                let mut inner = self.inner.lock();
                let Some((seq, event)) = inner.queue.pop_front() else {
                    break;
                };
                let handlers = inner.signals.matching(&event, seq);
                (event, handlers)
            };
            tracing::trace!(?event, handlers = handlers.len(), "dispatching tree event");

            for (id, handler) in handlers {
                let connected = self.inner.lock().signals.is_connected(id);
                if connected {
                    handler(&event);
                }
            }
            processed += 1;
        }
        processed
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Host")
            .field("live_editing", &inner.live_editing)
            .field("pending_events", &inner.queue.len())
            .field("connections", &inner.signals.len())
            .finish()
    }
}
