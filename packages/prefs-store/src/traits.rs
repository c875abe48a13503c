//! Core traits: Reader, Writer, Observe.

use std::sync::Arc;

use crate::{Error, Key, Primitive, Subscription};

/// Read primitives from keys.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn Reader>`.
pub trait Reader: Send + Sync {
    /// Read the value stored under a key.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - The key has no entry.
    /// * `Ok(Some(primitive))` - The stored value.
    /// * `Err(Error)` - An error occurred.
    fn read(&self, key: &Key) -> Result<Option<Primitive>, Error>;
}

/// Write primitives to keys.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn Writer>`.
pub trait Writer: Send + Sync {
    /// Store `value` under `key`. Writing `None` clears the entry.
    ///
    /// Subscribers of `key` are notified after the write, including when the
    /// new value equals the old one.
    fn write(&self, key: &Key, value: Option<Primitive>) -> Result<(), Error>;
}

/// Watch keys for changes.
pub trait Observe: Send + Sync {
    /// Register `handler` to run whenever the value under `key` changes, for
    /// any reason, including writes made by the subscriber itself.
    ///
    /// The handler runs synchronously on the thread that caused the change,
    /// after the store has released its own locks.
    fn subscribe(
        &self,
        key: &Key,
        handler: Box<dyn Fn(Option<&Primitive>) + Send + Sync>,
    ) -> Subscription;
}

/// A complete key-value store: read, write and change subscription.
pub trait Store: Reader + Writer + Observe {}
impl<T: Reader + Writer + Observe> Store for T {}

/// A store shared between bindings.
pub type SharedStore = Arc<dyn Store>;

// Blanket implementations for references, boxes and arcs

impl<T: Reader + ?Sized> Reader for &T {
    fn read(&self, key: &Key) -> Result<Option<Primitive>, Error> {
        (**self).read(key)
    }
}

impl<T: Writer + ?Sized> Writer for &T {
    fn write(&self, key: &Key, value: Option<Primitive>) -> Result<(), Error> {
        (**self).write(key, value)
    }
}

impl<T: Observe + ?Sized> Observe for &T {
    fn subscribe(
        &self,
        key: &Key,
        handler: Box<dyn Fn(Option<&Primitive>) + Send + Sync>,
    ) -> Subscription {
        (**self).subscribe(key, handler)
    }
}

impl<T: Reader + ?Sized> Reader for Box<T> {
    fn read(&self, key: &Key) -> Result<Option<Primitive>, Error> {
        self.as_ref().read(key)
    }
}

impl<T: Writer + ?Sized> Writer for Box<T> {
    fn write(&self, key: &Key, value: Option<Primitive>) -> Result<(), Error> {
        self.as_ref().write(key, value)
    }
}

impl<T: Observe + ?Sized> Observe for Box<T> {
    fn subscribe(
        &self,
        key: &Key,
        handler: Box<dyn Fn(Option<&Primitive>) + Send + Sync>,
    ) -> Subscription {
        self.as_ref().subscribe(key, handler)
    }
}

impl<T: Reader + ?Sized> Reader for Arc<T> {
    fn read(&self, key: &Key) -> Result<Option<Primitive>, Error> {
        self.as_ref().read(key)
    }
}

impl<T: Writer + ?Sized> Writer for Arc<T> {
    fn write(&self, key: &Key, value: Option<Primitive>) -> Result<(), Error> {
        self.as_ref().write(key, value)
    }
}

impl<T: Observe + ?Sized> Observe for Arc<T> {
    fn subscribe(
        &self,
        key: &Key,
        handler: Box<dyn Fn(Option<&Primitive>) + Send + Sync>,
    ) -> Subscription {
        self.as_ref().subscribe(key, handler)
    }
}
