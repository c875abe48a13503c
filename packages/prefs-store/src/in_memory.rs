//! In-memory store with change notification.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{Error, Key, Observe, Primitive, Reader, SubscriberRegistry, Subscription, Writer};

/// A process-local store keeping primitives in a map.
///
/// This is the store behind [`default_store`](crate::default_store) unless
/// another one is installed, and the natural store for tests.
///
/// # Example
///
/// ```rust
/// use prefs_store::{key, InMemoryStore, Primitive, Reader, Writer};
///
/// let store = InMemoryStore::new();
///
/// store.write(&key!("name"), Some(Primitive::from("alice"))).unwrap();
/// assert_eq!(store.read(&key!("name")).unwrap(), Some(Primitive::from("alice")));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<Key, Primitive>>,
    subscribers: SubscriberRegistry,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with initial entries.
    pub fn with_entries(entries: impl IntoIterator<Item = (Key, Primitive)>) -> Self {
        Self {
            entries: RwLock::new(entries.into_iter().collect()),
            subscribers: SubscriberRegistry::new(),
        }
    }

    /// Clear `key`, notifying subscribers. Returns the removed value.
    pub fn remove(&self, key: &Key) -> Option<Primitive> {
        let old = self.entries_mut().remove(key);
        self.subscribers.notify(key, None);
        old
    }

    /// All keys that currently have an entry, in no particular order.
    pub fn keys(&self) -> Vec<Key> {
        self.entries().keys().cloned().collect()
    }

    /// A copy of every entry.
    pub fn snapshot(&self) -> HashMap<Key, Primitive> {
        self.entries().clone()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Number of handlers registered for `key`.
    pub fn subscriber_count(&self, key: &Key) -> usize {
        self.subscribers.subscriber_count(key)
    }

    fn entries(&self) -> RwLockReadGuard<'_, HashMap<Key, Primitive>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn entries_mut(&self) -> RwLockWriteGuard<'_, HashMap<Key, Primitive>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Reader for InMemoryStore {
    fn read(&self, key: &Key) -> Result<Option<Primitive>, Error> {
        Ok(self.entries().get(key).cloned())
    }
}

impl Writer for InMemoryStore {
    fn write(&self, key: &Key, value: Option<Primitive>) -> Result<(), Error> {
        {
            let mut entries = self.entries_mut();
            match &value {
                Some(v) => {
                    entries.insert(key.clone(), v.clone());
                }
                None => {
                    entries.remove(key);
                }
            }
        }
        self.subscribers.notify(key, value.as_ref());
        Ok(())
    }
}

impl Observe for InMemoryStore {
    fn subscribe(
        &self,
        key: &Key,
        handler: Box<dyn Fn(Option<&Primitive>) + Send + Sync>,
    ) -> Subscription {
        self.subscribers.register(key, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key;
    use std::sync::{Arc, Mutex};

    #[test]
    fn basic_write_read() {
        let store = InMemoryStore::new();

        store
            .write(&key!("foo"), Some(Primitive::from("bar")))
            .unwrap();

        assert_eq!(
            store.read(&key!("foo")).unwrap(),
            Some(Primitive::from("bar"))
        );
    }

    #[test]
    fn read_nonexistent_returns_none() {
        let store = InMemoryStore::new();
        assert!(store.read(&key!("nonexistent")).unwrap().is_none());
    }

    #[test]
    fn overwrite_works() {
        let store = InMemoryStore::new();

        store
            .write(&key!("value"), Some(Primitive::from("first")))
            .unwrap();
        store
            .write(&key!("value"), Some(Primitive::from("second")))
            .unwrap();

        assert_eq!(
            store.read(&key!("value")).unwrap(),
            Some(Primitive::from("second"))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn writing_none_clears() {
        let store = InMemoryStore::with_entries([(key!("k"), Primitive::Bool(true))]);
        store.write(&key!("k"), None).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn subscribers_see_writes_and_removals() {
        let store = InMemoryStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = store.subscribe(
            &key!("k"),
            Box::new(move |v: Option<&Primitive>| s.lock().unwrap().push(v.cloned())),
        );

        store.write(&key!("k"), Some(Primitive::from(1i64))).unwrap();
        store.write(&key!("other"), Some(Primitive::from(2i64))).unwrap();
        assert_eq!(store.remove(&key!("k")), Some(Primitive::from(1i64)));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some(Primitive::Integer(1)), None]
        );
    }

    #[test]
    fn handler_can_read_store_during_notify() {
        let store = Arc::new(InMemoryStore::new());
        let seen = Arc::new(Mutex::new(None));
        let (st, s) = (Arc::downgrade(&store), Arc::clone(&seen));
        let _sub = store.subscribe(
            &key!("k"),
            Box::new(move |_: Option<&Primitive>| {
                if let Some(store) = st.upgrade() {
                    *s.lock().unwrap() = store.read(&key!("k")).unwrap();
                }
            }),
        );

        store.write(&key!("k"), Some(Primitive::from("v"))).unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(Primitive::from("v")));
    }

    #[test]
    fn snapshot_and_keys() {
        let store = InMemoryStore::with_entries([
            (key!("a"), Primitive::from(1i64)),
            (key!("b"), Primitive::from(2i64)),
        ]);

        let mut keys = store.keys();
        keys.sort();
        assert_eq!(keys, vec![key!("a"), key!("b")]);
        assert_eq!(store.snapshot().get(&key!("b")), Some(&Primitive::Integer(2)));
    }
}
