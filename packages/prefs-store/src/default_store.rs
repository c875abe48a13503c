//! The process-wide default store.
//!
//! Initialized once, on first use or by [`install_default_store`], and never
//! torn down for the lifetime of the process.

use std::sync::{Arc, OnceLock};

use crate::{Error, InMemoryStore, SharedStore};

static DEFAULT_STORE: OnceLock<SharedStore> = OnceLock::new();

/// The store bindings use when none is given explicitly.
///
/// Unless [`install_default_store`] ran first, this is an empty
/// [`InMemoryStore`] created on the first call.
pub fn default_store() -> SharedStore {
    Arc::clone(DEFAULT_STORE.get_or_init(|| {
        log::debug!("Initializing default in-memory store");
        Arc::new(InMemoryStore::new())
    }))
}

/// Make `store` the process-wide default.
///
/// Must happen before anything calls [`default_store`]; afterwards the
/// default is fixed and this returns [`Error::DefaultStoreInstalled`].
pub fn install_default_store(store: SharedStore) -> Result<(), Error> {
    DEFAULT_STORE
        .set(store)
        .map_err(|_| Error::DefaultStoreInstalled)
}
