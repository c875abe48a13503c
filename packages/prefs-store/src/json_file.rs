//! A store persisted as a single JSON document on local disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value as JsonValue;

use crate::{
    Error, FileStoreConfig, Key, Observe, Primitive, Reader, SubscriberRegistry, Subscription,
    Writer,
};

/// A store whose entries live in one JSON file.
///
/// The whole document is rewritten on every write (temp file, then rename).
/// Changes made to the file by other processes are picked up by
/// [`reload`](Self::reload), which notifies subscribers of every key whose
/// value differs from what this store last saw.
///
/// # Document format
///
/// ```json
/// { "name": { "string": "alice" }, "count": { "integer": 3 } }
/// ```
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<Key, Primitive>>,
    subscribers: SubscriberRegistry,
}

impl JsonFileStore {
    /// Open the store described by `config`, loading the document if it
    /// exists. A missing file is an empty store; it is created on first write.
    pub fn open(config: FileStoreConfig) -> Result<Self, Error> {
        let FileStoreConfig { path, create_dirs } = config;

        if create_dirs {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
        }

        let entries = Self::load(&path)?;
        log::debug!("Opened {} with {} entries", path.display(), entries.len());

        Ok(Self {
            path,
            entries: RwLock::new(entries),
            subscribers: SubscriberRegistry::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the document from disk and notify subscribers of every key
    /// that was added, changed, or removed since the last load or write.
    ///
    /// Returns the keys that changed.
    pub fn reload(&self) -> Result<Vec<Key>, Error> {
        let fresh = Self::load(&self.path)?;

        let changed: Vec<(Key, Option<Primitive>)> = {
            let mut entries = self.entries_mut();
            let changed: Vec<(Key, Option<Primitive>)> = entries
                .keys()
                .chain(fresh.keys())
                .filter(|k| entries.get(*k) != fresh.get(*k))
                .map(|k| (k.clone(), fresh.get(k).cloned()))
                .collect::<BTreeMap<_, _>>()
                .into_iter()
                .collect();
            *entries = fresh;
            changed
        };

        log::debug!(
            "Reloaded {}: {} key(s) changed",
            self.path.display(),
            changed.len()
        );
        for (key, value) in &changed {
            self.subscribers.notify(key, value.as_ref());
        }

        Ok(changed.into_iter().map(|(k, _)| k).collect())
    }

    /// Number of handlers registered for `key`.
    pub fn subscriber_count(&self, key: &Key) -> usize {
        self.subscribers.subscriber_count(key)
    }

    fn load(path: &Path) -> Result<BTreeMap<Key, Primitive>, Error> {
        log::debug!("Reading {}...", path.display());
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let raw = fs::read(path).map_err(|e| Error::io(path, e))?;
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }

        let document: serde_json::Map<String, JsonValue> = serde_json::from_slice(&raw)?;
        let mut entries = BTreeMap::new();
        for (name, value) in document {
            let key = match Key::parse(&name) {
                Ok(key) => key,
                Err(e) => {
                    log::warn!("Skipping entry in {}: {}", path.display(), e);
                    continue;
                }
            };
            match serde_json::from_value::<Primitive>(value) {
                Ok(primitive) => {
                    entries.insert(key, primitive);
                }
                Err(e) => {
                    log::warn!(
                        "Skipping entry {:?} in {}: {}",
                        name,
                        path.display(),
                        e
                    );
                }
            }
        }
        Ok(entries)
    }

    fn persist(&self, entries: &BTreeMap<Key, Primitive>) -> Result<(), Error> {
        log::debug!("Writing {}...", self.path.display());

        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|e| Error::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| Error::io(&self.path, e))?;
        Ok(())
    }

    fn entries(&self) -> RwLockReadGuard<'_, BTreeMap<Key, Primitive>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn entries_mut(&self) -> RwLockWriteGuard<'_, BTreeMap<Key, Primitive>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Reader for JsonFileStore {
    fn read(&self, key: &Key) -> Result<Option<Primitive>, Error> {
        Ok(self.entries().get(key).cloned())
    }
}

impl Writer for JsonFileStore {
    fn write(&self, key: &Key, value: Option<Primitive>) -> Result<(), Error> {
        if let Some(Primitive::Float(f)) = &value {
            if !f.is_finite() {
                return Err(Error::NonFiniteFloat {
                    key: key.clone(),
                    value: *f,
                });
            }
        }

        {
            let mut entries = self.entries_mut();
            let previous = match &value {
                Some(v) => entries.insert(key.clone(), v.clone()),
                None => entries.remove(key),
            };

            // Memory must not run ahead of the document.
            if let Err(e) = self.persist(&entries) {
                match previous {
                    Some(old) => entries.insert(key.clone(), old),
                    None => entries.remove(key),
                };
                return Err(e);
            }
        }
        self.subscribers.notify(key, value.as_ref());
        Ok(())
    }
}

impl Observe for JsonFileStore {
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
    use tempfile::TempDir;

    fn open_in(dir: &TempDir) -> JsonFileStore {
        JsonFileStore::open(FileStoreConfig::new(dir.path().join("prefs.json"))).unwrap()
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        assert_eq!(store.read(&key!("anything")).unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_in(&dir);
            store.write(&key!("name"), Some(Primitive::from("alice"))).unwrap();
            store.write(&key!("count"), Some(Primitive::from(3i64))).unwrap();
            store
                .write(&key!("blob"), Some(Primitive::from(vec![0u8, 1, 2])))
                .unwrap();
        }

        let store = open_in(&dir);
        assert_eq!(store.read(&key!("name")).unwrap(), Some(Primitive::from("alice")));
        assert_eq!(store.read(&key!("count")).unwrap(), Some(Primitive::Integer(3)));
        assert_eq!(
            store.read(&key!("blob")).unwrap(),
            Some(Primitive::from(vec![0u8, 1, 2]))
        );
    }

    #[test]
    fn document_format_is_tagged_json() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        store.write(&key!("name"), Some(Primitive::from("alice"))).unwrap();

        let json: JsonValue =
            serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"name": {"string": "alice"}}));
    }

    #[test]
    fn clearing_removes_from_document() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        store.write(&key!("k"), Some(Primitive::Bool(true))).unwrap();
        store.write(&key!("k"), None).unwrap();

        let reopened = open_in(&dir);
        assert_eq!(reopened.read(&key!("k")).unwrap(), None);
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        store.write(&key!("limit"), Some(Primitive::Float(1.5))).unwrap();

        let notified = Arc::new(Mutex::new(0));
        let n = Arc::clone(&notified);
        let _sub = store.subscribe(
            &key!("limit"),
            Box::new(move |_: Option<&Primitive>| *n.lock().unwrap() += 1),
        );

        for f in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let result = store.write(&key!("limit"), Some(Primitive::Float(f)));
            assert!(matches!(result, Err(Error::NonFiniteFloat { .. })));
        }
        assert_eq!(*notified.lock().unwrap(), 0);
        assert_eq!(store.read(&key!("limit")).unwrap(), Some(Primitive::Float(1.5)));

        let reopened = open_in(&dir);
        assert_eq!(reopened.read(&key!("limit")).unwrap(), Some(Primitive::Float(1.5)));
        assert!(reopened.reload().unwrap().is_empty());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("prefs.json");
        let store = JsonFileStore::open(FileStoreConfig::new(&path)).unwrap();
        store.write(&key!("k"), Some(Primitive::Bool(false))).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(
            &path,
            r#"{"good": {"integer": 1}, "bad": {"unknown": 1}, "": {"bool": true}}"#,
        )
        .unwrap();

        let store = JsonFileStore::open(FileStoreConfig::new(&path)).unwrap();
        assert_eq!(store.read(&key!("good")).unwrap(), Some(Primitive::Integer(1)));
        assert_eq!(store.read(&key!("bad")).unwrap(), None);
    }

    #[test]
    fn malformed_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "not json").unwrap();

        let result = JsonFileStore::open(FileStoreConfig::new(&path));
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn reload_notifies_changed_keys_only() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        store.write(&key!("same"), Some(Primitive::from(1i64))).unwrap();
        store.write(&key!("edited"), Some(Primitive::from("old"))).unwrap();
        store.write(&key!("dropped"), Some(Primitive::Bool(true))).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut subs = Vec::new();
        for name in ["same", "edited", "dropped", "added"] {
            let s = Arc::clone(&seen);
            subs.push(store.subscribe(
                &key!(name),
                Box::new(move |v: Option<&Primitive>| {
                    s.lock().unwrap().push((name, v.cloned()))
                }),
            ));
        }

        // Another process rewrites the document.
        fs::write(
            store.path(),
            r#"{"same": {"integer": 1}, "edited": {"string": "new"}, "added": {"float": 2.5}}"#,
        )
        .unwrap();

        let changed = store.reload().unwrap();
        assert_eq!(changed, vec![key!("added"), key!("dropped"), key!("edited")]);

        let mut seen = seen.lock().unwrap().clone();
        seen.sort_by_key(|(name, _)| *name);
        assert_eq!(
            seen,
            vec![
                ("added", Some(Primitive::Float(2.5))),
                ("dropped", None),
                ("edited", Some(Primitive::from("new"))),
            ]
        );
        assert_eq!(store.read(&key!("edited")).unwrap(), Some(Primitive::from("new")));
    }

    #[test]
    fn reload_of_deleted_file_clears_everything() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        store.write(&key!("k"), Some(Primitive::from("v"))).unwrap();
        fs::remove_file(store.path()).unwrap();

        assert_eq!(store.reload().unwrap(), vec![key!("k")]);
        assert_eq!(store.read(&key!("k")).unwrap(), None);
    }
}
