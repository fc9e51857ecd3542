//! Listener connections for tree events.

use super::{ResourceId, TreeEvent};
use super::host::HostInner;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

/// Handler invoked for a delivered event.
pub(crate) type Handler = Arc<dyn Fn(&TreeEvent) + Send + Sync>;

/// The per-resource signal a connection listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// Property changes of the resource itself.
    Changed,
    /// Resources added anywhere below the resource.
    DescendantAdded,
}

struct Listener {
    target: ResourceId,
    kind: SignalKind,
    /// Sequence number of the first event this listener may observe.
    since: u64,
    handler: Handler,
}

/// Registry of connected listeners, keyed by connection id.
///
/// Listeners are kept in connection order, so handlers for one event run in
/// the order they were connected. A listener only observes events raised
/// after it was connected, even if older ones are still queued.
#[derive(Default)]
pub(crate) struct SignalTable {
    listeners: BTreeMap<u64, Listener>,
    next_id: u64,
}

impl SignalTable {
    pub(crate) fn connect(
        &mut self,
        target: ResourceId,
        kind: SignalKind,
        since: u64,
        handler: Handler,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.insert(
            id,
            Listener {
                target,
                kind,
                since,
                handler,
            },
        );
        id
    }

    pub(crate) fn disconnect(&mut self, id: u64) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub(crate) fn is_connected(&self, id: u64) -> bool {
        self.listeners.contains_key(&id)
    }

    /// Snapshot of the handlers that should observe `event`, raised as number `seq`.
    pub(crate) fn matching(&self, event: &TreeEvent, seq: u64) -> Vec<(u64, Handler)> {
        let target = event.target();
        let kind = event.kind();
        self.listeners
            .iter()
            .filter(|(_, listener)| {
                listener.target == target && listener.kind == kind && listener.since <= seq
            })
            .map(|(id, listener)| (*id, Arc::clone(&listener.handler)))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }
}

/// Handle to a connected listener.
///
/// Dropping the handle does not disconnect; call [`Connection::disconnect`].
/// Disconnecting twice, or after the host is gone, is a no-op.
#[derive(Clone)]
pub struct Connection {
    id: u64,
    host: Weak<Mutex<HostInner>>,
}

impl Connection {
    pub(crate) fn new(id: u64, host: Weak<Mutex<HostInner>>) -> Self {
        Self { id, host }
    }

    /// Stop delivering events to this listener.
    pub fn disconnect(&self) {
        if let Some(host) = self.host.upgrade() {
            host.lock().signals.disconnect(self.id);
        }
    }

    /// Whether the listener is still connected.
    pub fn is_connected(&self) -> bool {
        self.host
            .upgrade()
            .is_some_and(|host| host.lock().signals.is_connected(self.id))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Property;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn changed(resource: ResourceId) -> TreeEvent {
        TreeEvent::Changed {
            resource,
            property: Property::Source,
        }
    }

    #[test]
    fn test_matching_filters_by_target_and_kind() {
        let mut table = SignalTable::default();
        let a = ResourceId::new(1);
        let b = ResourceId::new(2);
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = Arc::clone(&counter);
        table.connect(
            a,
            SignalKind::Changed,
            0,
            Arc::new(move |_| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );
        table.connect(b, SignalKind::Changed, 0, Arc::new(|_| {}));
        table.connect(a, SignalKind::DescendantAdded, 0, Arc::new(|_| {}));

        let matches = table.matching(&changed(a), 0);
        assert_eq!(matches.len(), 1);
        (matches[0].1)(&changed(a));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disconnect() {
        let mut table = SignalTable::default();
        let a = ResourceId::new(1);
        let id = table.connect(a, SignalKind::Changed, 0, Arc::new(|_| {}));

        assert_eq!(table.len(), 1);
        assert!(table.disconnect(id));
        assert!(!table.disconnect(id));
        assert!(!table.is_connected(id));
        assert!(table.matching(&changed(a), 0).is_empty());
    }

    #[test]
    fn test_listener_ignores_events_raised_before_it_connected() {
        let mut table = SignalTable::default();
        let a = ResourceId::new(1);
        table.connect(a, SignalKind::Changed, 5, Arc::new(|_| {}));

        assert!(table.matching(&changed(a), 4).is_empty());
        assert_eq!(table.matching(&changed(a), 5).len(), 1);
    }
}
