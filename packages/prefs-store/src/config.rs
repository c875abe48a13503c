//! Configuration for the JSON file store.

use std::env;
use std::path::PathBuf;

/// Environment variable that overrides the store file location.
pub const STORE_PATH_ENV: &str = "PREFBIND_STORE_PATH";

const FILE_NAME: &str = "prefs.json";

/// Where a [`JsonFileStore`](crate::JsonFileStore) keeps its document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileStoreConfig {
    /// Path of the JSON document.
    pub path: PathBuf,
    /// Create missing parent directories when opening.
    pub create_dirs: bool,
}

impl FileStoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_dirs: true,
        }
    }

    /// `<config dir>/<app_name>/prefs.json`, using the platform config
    /// directory, or the working directory when the platform has none.
    pub fn for_app(app_name: &str) -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join(app_name).join(FILE_NAME))
    }

    /// Like [`for_app`](Self::for_app), but `PREFBIND_STORE_PATH` wins when
    /// it is set to a non-empty value.
    pub fn from_env(app_name: &str) -> Self {
        match env::var_os(STORE_PATH_ENV) {
            Some(path) if !path.is_empty() => {
                log::debug!("store path taken from {}", STORE_PATH_ENV);
                Self::new(path)
            }
            _ => Self::for_app(app_name),
        }
    }

    pub fn create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }
}
