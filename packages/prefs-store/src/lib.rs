//! Key-value stores with change subscription.
//!
//! This is the bottom layer of prefbind. It knows nothing about typed values:
//! - `Primitive`: the closed set of values a store holds directly
//! - `Key`: a validated entry identifier
//! - `Reader` / `Writer` / `Observe`: the store contract, combined as `Store`
//! - `Subscription`: guard for a change handler; cancel or drop to stop it
//!
//! Implementations:
//! - `InMemoryStore`: process-local map, the default store
//! - `JsonFileStore`: one JSON document on disk, with `reload` to pick up
//!   changes made by other processes
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use prefs_store::{key, InMemoryStore, Observe, Primitive, Writer};
//!
//! let store = InMemoryStore::new();
//! let last = Arc::new(Mutex::new(None));
//! let seen = Arc::clone(&last);
//!
//! let _sub = store.subscribe(
//!     &key!("name"),
//!     Box::new(move |v: Option<&Primitive>| *seen.lock().unwrap() = v.cloned()),
//! );
//!
//! store.write(&key!("name"), Some(Primitive::from("bob"))).unwrap();
//! assert_eq!(*last.lock().unwrap(), Some(Primitive::from("bob")));
//! ```

pub use bytes::Bytes;

mod config;
mod default_store;
mod error;
mod in_memory;
mod json_file;
mod keys;
mod primitive;
mod subscription;
mod traits;

pub use config::{FileStoreConfig, STORE_PATH_ENV};
pub use default_store::{default_store, install_default_store};
pub use error::Error;
pub use in_memory::InMemoryStore;
pub use json_file::JsonFileStore;
pub use keys::{Key, KeyError};
pub use primitive::Primitive;
pub use subscription::{Handler, SubscriberRegistry, Subscription};
pub use traits::{Observe, Reader, SharedStore, Store, Writer};
