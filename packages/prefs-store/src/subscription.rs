//! Change subscriptions.
//!
//! A store hands out [`Subscription`] guards and keeps only weak references
//! to the handlers. Dropping or cancelling the guard removes the handler's
//! entry from the registry; entries still held alive by an in-flight
//! notification are pruned on the next notification for the key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::{Key, Primitive};

/// A change handler. Receives the new stored value, or `None` when the key
/// was cleared.
pub type Handler = dyn Fn(Option<&Primitive>) + Send + Sync;

type HandlerMap = HashMap<Key, Vec<Weak<Handler>>>;

/// Guard for a registered change handler.
///
/// The handler stays registered while the guard is alive and not cancelled.
pub struct Subscription {
    key: Key,
    handler: Option<Arc<Handler>>,
    registry: Weak<Mutex<HandlerMap>>,
}

impl Subscription {
    /// The key this subscription watches.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Whether the handler can still be invoked.
    pub fn is_active(&self) -> bool {
        self.handler.is_some()
    }

    /// Stop further invocations of the handler.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.handler.take().is_none() {
            return;
        }
        if let Some(handlers) = self.registry.upgrade() {
            prune(&mut lock(&handlers), &self.key);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Per-key list of change handlers, shared by the store implementations.
#[derive(Default)]
pub struct SubscriberRegistry {
    handlers: Arc<Mutex<HandlerMap>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for changes to `key`.
    pub fn register(
        &self,
        key: &Key,
        handler: impl Fn(Option<&Primitive>) + Send + Sync + 'static,
    ) -> Subscription {
        let strong: Arc<Handler> = Arc::new(handler);
        self.lock()
            .entry(key.clone())
            .or_default()
            .push(Arc::downgrade(&strong));

        Subscription {
            key: key.clone(),
            handler: Some(strong),
            registry: Arc::downgrade(&self.handlers),
        }
    }

    /// Invoke every live handler for `key`, in registration order.
    ///
    /// Handlers run after the registry lock is released, so they may
    /// subscribe, cancel, or write to the store themselves.
    pub fn notify(&self, key: &Key, value: Option<&Primitive>) {
        let live: Vec<Arc<Handler>> = {
            let mut handlers = self.lock();
            prune(&mut handlers, key);
            let Some(list) = handlers.get(key) else {
                return;
            };
            list.iter().filter_map(Weak::upgrade).collect()
        };

        log::trace!("notifying {} subscriber(s) of {}", live.len(), key);
        for handler in &live {
            handler(value);
        }
    }

    /// Number of handlers registered for `key`.
    pub fn subscriber_count(&self, key: &Key) -> usize {
        self.lock().get(key).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, HandlerMap> {
        lock(&self.handlers)
    }
}

fn lock(handlers: &Mutex<HandlerMap>) -> MutexGuard<'_, HandlerMap> {
    handlers.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drop dead handlers for `key`, and the key itself once none are left.
fn prune(handlers: &mut HandlerMap, key: &Key) {
    if let Some(list) = handlers.get_mut(key) {
        list.retain(|w| w.strong_count() > 0);
        if list.is_empty() {
            handlers.remove(key);
        }
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("keys", &self.lock().len())
            .finish()
    }
}
