//! `StoredValue`: a typed, observable mirror of one store entry.
//!
//! # Design
//!
//! The binding owns a decoded cache of the entry and keeps it in step with
//! the store in both directions:
//!
//! - `set` encodes and writes through to the store, then updates the cache
//!   and notifies observers.
//! - The store's change subscription decodes every new primitive for the key
//!   (falling back to the default when it is absent or unreadable), updates
//!   the cache and notifies observers.
//!
//! A local write therefore refreshes the cache twice: once through the store
//! notification and once directly. Both produce the same value.
//!
//! # Failure Modes
//!
//! Nothing here returns an error. Decode failures become the default value
//! silently; store read and write errors are logged and otherwise ignored.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use prefs_store::{
    default_store, Key, Observe, Primitive, Reader, SharedStore, Subscription, Writer,
};

use crate::codec::{BaseStorable, Codec, OptionalCodec, Storable};

type ObserverRc<V> = Arc<dyn Fn(&V) + Send + Sync>;
type ObserverWeak<V> = Weak<dyn Fn(&V) + Send + Sync>;

struct State<V> {
    value: V,
    version: u64,
    /// Observers as weak references. Dead entries are pruned on notify.
    observers: Vec<ObserverWeak<V>>,
}

/// The part of a binding the store subscription can reach.
struct Shared<V> {
    key: Key,
    store: SharedStore,
    default_value: V,
    codec: Box<dyn Codec<V>>,
    state: Mutex<State<V>>,
}

impl<V: Clone + Send + Sync + 'static> Shared<V> {
    fn resolve(&self, stored: Option<&Primitive>) -> V {
        self.codec
            .decode(stored)
            .unwrap_or_else(|| self.default_value.clone())
    }

    /// Replace the cached value and notify observers outside the lock.
    fn replace(&self, value: V) {
        let (observers, value) = {
            let mut state = self.state();
            state.value = value;
            state.version += 1;
            state.observers.retain(|w| w.strong_count() > 0);
            let live: Vec<ObserverRc<V>> =
                state.observers.iter().filter_map(Weak::upgrade).collect();
            (live, state.value.clone())
        };

        for observer in &observers {
            observer(&value);
        }
    }

    fn state(&self) -> MutexGuard<'_, State<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A value of type `V` bound to one key of a store.
///
/// Reads come from the cache and never touch the store. Writes go through to
/// the store. Changes to the entry made by anyone else, for example another
/// binding on the same key or a reload of a file store, update the cache and
/// reach every observer.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use prefbind::{key, InMemoryStore, Primitive, Reader, StoredValue, Writer};
///
/// let store = Arc::new(InMemoryStore::new());
/// let name = StoredValue::with_store(key!("name"), "anon".to_string(), store.clone());
/// assert_eq!(name.get(), "anon");
///
/// name.set("alice".to_string());
/// assert_eq!(store.read(&key!("name")).unwrap(), Some(Primitive::from("alice")));
///
/// store.write(&key!("name"), Some(Primitive::from("bob"))).unwrap();
/// assert_eq!(name.get(), "bob");
/// ```
pub struct StoredValue<V> {
    shared: Arc<Shared<V>>,
    subscription: Mutex<Option<Subscription>>,
}

impl<V: Storable> StoredValue<V> {
    /// Bind `key` in the process-wide default store.
    pub fn new(key: Key, default_value: V) -> Self {
        Self::with_store(key, default_value, default_store())
    }

    /// Bind `key` in `store`.
    pub fn with_store(key: Key, default_value: V, store: SharedStore) -> Self {
        Self::with_codec(key, default_value, store, V::Codec::default())
    }
}

impl<T: BaseStorable> StoredValue<Option<T>> {
    /// Bind an optional value in the default store; an absent entry is `None`.
    pub fn optional(key: Key) -> Self {
        Self::optional_with_store(key, default_store())
    }

    /// Bind an optional value in `store`; an absent entry is `None`.
    pub fn optional_with_store(key: Key, store: SharedStore) -> Self {
        Self::with_codec(key, None, store, OptionalCodec(T::Codec::default()))
    }
}

impl<V: Clone + Send + Sync + 'static> StoredValue<V> {
    /// Bind `key` in `store` using an explicit codec.
    ///
    /// Subscribes to the entry's changes, then reads it once. Nothing is
    /// written. A change that lands between the two is not lost: the read
    /// only fills the cache if no notification has done so already.
    pub fn with_codec(
        key: Key,
        default_value: V,
        store: SharedStore,
        codec: impl Codec<V> + 'static,
    ) -> Self {
        let shared = Arc::new(Shared {
            key: key.clone(),
            store: Arc::clone(&store),
            default_value: default_value.clone(),
            codec: Box::new(codec),
            state: Mutex::new(State {
                value: default_value,
                version: 0,
                observers: Vec::new(),
            }),
        });

        let weak = Arc::downgrade(&shared);
        let subscription = store.subscribe(
            &key,
            Box::new(move |stored: Option<&Primitive>| {
                if let Some(shared) = weak.upgrade() {
                    let value = shared.resolve(stored);
                    shared.replace(value);
                }
            }),
        );

        let stored = store.read(&key).unwrap_or_else(|e| {
            log::warn!("Failed to read {}, using default: {}", key, e);
            None
        });
        let value = shared.resolve(stored.as_ref());
        {
            let mut state = shared.state();
            if state.version == 0 {
                state.value = value;
            }
        }

        Self {
            shared,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    /// The cached value.
    #[must_use]
    pub fn get(&self) -> V {
        self.shared.state().value.clone()
    }

    /// Access the cached value by reference without cloning.
    ///
    /// Do not call back into this binding from `f`.
    pub fn with<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        f(&self.shared.state().value)
    }

    /// Write `value` through to the store, cache it and notify observers.
    ///
    /// A failed store write is logged; the cache is updated regardless.
    /// When another thread writes the same key concurrently, the cache ends
    /// up with whichever value was applied last here, which may not be the
    /// one the store kept.
    pub fn set(&self, value: V) {
        let encoded = self.shared.codec.encode(&value);
        if let Err(e) = self.shared.store.write(&self.shared.key, encoded) {
            log::warn!("Failed to write {}: {}", self.shared.key, e);
        }
        self.shared.replace(value);
    }

    /// Clear the entry in the store; the value returns to what an absent
    /// entry decodes to, normally the default.
    pub fn reset(&self) {
        if let Err(e) = self.shared.store.write(&self.shared.key, None) {
            log::warn!("Failed to clear {}: {}", self.shared.key, e);
        }
        self.shared.replace(self.shared.resolve(None));
    }

    /// Apply a new stored primitive for this key, as the store subscription
    /// does: decode it, or fall back to the default, then notify observers.
    pub fn on_external_change(&self, stored: Option<&Primitive>) {
        self.shared.replace(self.shared.resolve(stored));
    }

    /// Register `observer` to run with the new value after every change.
    ///
    /// Dropping the returned [`Observation`] unregisters it.
    pub fn subscribe(&self, observer: impl Fn(&V) + Send + Sync + 'static) -> Observation {
        let strong: ObserverRc<V> = Arc::new(observer);
        self.shared
            .state()
            .observers
            .push(Arc::downgrade(&strong));
        Observation {
            _guard: Box::new(strong),
        }
    }

    /// Stop following the store. Later changes to the entry no longer reach
    /// the cache; `get`, `set` and observers keep working. Idempotent.
    pub fn dispose(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            log::debug!("Disposing binding for {}", self.shared.key);
            subscription.cancel();
        }
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// The bound key.
    pub fn key(&self) -> &Key {
        &self.shared.key
    }

    /// The value used when the entry is absent or undecodable.
    pub fn default_value(&self) -> &V {
        &self.shared.default_value
    }

    /// The store this binding reads and writes.
    pub fn store(&self) -> &SharedStore {
        &self.shared.store
    }

    /// Number of cache updates so far. Useful for dirty-checking.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.state().version
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for StoredValue<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("StoredValue")
            .field("key", &self.shared.key)
            .field("value", &state.value)
            .field("version", &state.version)
            .finish_non_exhaustive()
    }
}

/// Guard for an observer registered with [`StoredValue::subscribe`].
pub struct Observation {
    /// Keeps the observer `Arc` alive; the binding only holds a `Weak`.
    _guard: Box<dyn Any + Send + Sync>,
}

impl Observation {
    /// Unregister the observer.
    pub fn cancel(self) {}
}

impl std::fmt::Debug for Observation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observation").finish_non_exhaustive()
    }
}
