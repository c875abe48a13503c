//! Error types for the store layer.

use std::path::PathBuf;

use crate::Key;

/// Errors returned by stores.
///
/// Bindings never surface these to their consumers; they are for code that
/// talks to a store directly.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Reading or writing the backing file failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing document could not be parsed or serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The value has no representation in the backing document. JSON has
    /// no infinities or NaN.
    #[error("cannot store non-finite float {value} under {key}")]
    NonFiniteFloat { key: Key, value: f64 },

    /// `install_default_store` was called after the default store was set up.
    #[error("the default store is already initialized")]
    DefaultStoreInstalled,
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
