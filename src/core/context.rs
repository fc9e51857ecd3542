//! Values handed to reload callbacks.

use crate::tree::ResourceId;
use parking_lot::Mutex;
use std::sync::Arc;

/// Delivered with every ready and cleanup invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    /// The resource originally passed to `listen`.
    pub original_resource: ResourceId,
    /// False only for the first delivery of a resource, and for the cleanup
    /// that follows its removal from the tree.
    pub is_reloading: bool,
}

impl Context {
    pub(crate) fn new(original_resource: ResourceId, is_reloading: bool) -> Self {
        Self {
            original_resource,
            is_reloading,
        }
    }
}

type Action = Box<dyn FnOnce() + Send>;

/// Unsubscribe handle returned by `listen` and `scan`.
///
/// Calling it runs the teardown the first time and does nothing afterwards.
/// It may be called from inside a callback. Dropping it does not unsubscribe.
#[derive(Clone)]
pub struct CleanupFunction {
    action: Arc<Mutex<Option<Action>>>,
}

impl CleanupFunction {
    pub(crate) fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            action: Arc::new(Mutex::new(Some(Box::new(action)))),
        }
    }

    /// A handle with nothing to tear down.
    pub fn noop() -> Self {
        Self {
            action: Arc::new(Mutex::new(None)),
        }
    }

    /// Run the teardown if it has not run yet.
    pub fn call(&self) {
        let action = self.action.lock().take();
        if let Some(action) = action {
            action();
        }
    }

    /// Whether there is nothing left to tear down.
    pub fn is_spent(&self) -> bool {
        self.action.lock().is_none()
    }
}

impl std::fmt::Debug for CleanupFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupFunction")
            .field("spent", &self.is_spent())
            .finish()
    }
}
