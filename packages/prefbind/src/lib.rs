//! prefbind: typed values bound to key-value store entries.
//!
//! A [`StoredValue<V>`] keeps a decoded copy of one store entry and keeps it
//! in sync in both directions: `set` writes through to the store, and any
//! change to the entry made elsewhere refreshes the value and notifies the
//! binding's observers.
//!
//! Values are converted with a [`Codec`], chosen at compile time through
//! [`Storable`]:
//! - `bool`, integers, floats, `String`, `Vec<u8>`, `Bytes`, `Url`
//! - `Option` of any of those (absent entry is `None`)
//! - enums with string or integer raw values, see [`raw_value_enum!`]
//!
//! A stored entry that is missing or cannot be decoded reads as the binding's
//! default value. No operation on a binding returns an error.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use prefbind::{key, raw_value_enum, InMemoryStore, StoredValue};
//!
//! #[derive(Clone, Copy, Debug, PartialEq)]
//! enum Theme {
//!     Light,
//!     Dark,
//! }
//!
//! raw_value_enum!(Theme: String {
//!     Light => "light",
//!     Dark => "dark",
//! });
//!
//! let store = Arc::new(InMemoryStore::new());
//! let theme = StoredValue::with_store(key!("theme"), Theme::Light, store);
//!
//! let _observation = theme.subscribe(|t| println!("theme is now {:?}", t));
//! theme.set(Theme::Dark);
//! assert_eq!(theme.get(), Theme::Dark);
//! ```

mod codec;
mod stored_value;

pub use codec::{
    BaseStorable, BoolCodec, BytesCodec, Codec, FloatCodec, FloatValue, FnCodec, IntegerCodec,
    IntegerEnumCodec, IntegerRawValue, IntegerValue, OptionalCodec, Storable, StringCodec,
    StringEnumCodec, StringRawValue, UrlCodec,
};
pub use stored_value::{Observation, StoredValue};

// Re-export store types for convenience
pub use prefs_store::{
    default_store, install_default_store, key, Bytes, Error, FileStoreConfig, InMemoryStore,
    JsonFileStore, Key, KeyError, Observe, Primitive, Reader, SharedStore, Store, Subscription,
    Writer,
};
pub use url::Url;
