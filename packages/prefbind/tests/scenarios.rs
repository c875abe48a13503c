//! End-to-end behavior of bindings over real stores.

use std::fs;
use std::sync::{Arc, Mutex};

use prefbind::{
    key, raw_value_enum, FileStoreConfig, InMemoryStore, JsonFileStore, Primitive, Reader,
    SharedStore, StoredValue, Url, Writer,
};
use tempfile::TempDir;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Theme {
    Light,
    Dark,
}

raw_value_enum!(Theme: String {
    Light => "light",
    Dark => "dark",
});

fn memory() -> (Arc<InMemoryStore>, SharedStore) {
    let store = Arc::new(InMemoryStore::new());
    let shared: SharedStore = store.clone();
    (store, shared)
}

#[test]
fn name_binding_follows_local_and_external_writes() {
    let (store, shared) = memory();
    let name = StoredValue::with_store(key!("name"), "anon".to_string(), shared);
    assert_eq!(name.get(), "anon");

    name.set("alice".to_string());
    assert_eq!(store.read(&key!("name")).unwrap(), Some(Primitive::from("alice")));
    assert_eq!(name.get(), "alice");

    store.write(&key!("name"), Some(Primitive::from("bob"))).unwrap();
    assert_eq!(name.get(), "bob");
}

#[test]
fn wrong_primitive_type_reads_as_default() {
    let (store, shared) = memory();
    store.write(&key!("count"), Some(Primitive::from("oops"))).unwrap();

    let count = StoredValue::with_store(key!("count"), 0i64, shared);
    assert_eq!(count.get(), 0);
}

#[test]
fn theme_enum_uses_string_raw_values() {
    let (store, shared) = memory();
    store.write(&key!("theme"), Some(Primitive::from("dark"))).unwrap();

    let theme = StoredValue::with_store(key!("theme"), Theme::Light, shared);
    assert_eq!(theme.get(), Theme::Dark);

    theme.set(Theme::Light);
    assert_eq!(store.read(&key!("theme")).unwrap(), Some(Primitive::from("light")));
}

#[test]
fn url_binding() {
    let (store, shared) = memory();
    let home = Url::parse("https://example.com/").unwrap();
    let v = StoredValue::with_store(key!("home"), home.clone(), shared);
    assert_eq!(v.get(), home);

    store
        .write(&key!("home"), Some(Primitive::from("https://rust-lang.org/")))
        .unwrap();
    assert_eq!(v.get().as_str(), "https://rust-lang.org/");

    store.write(&key!("home"), Some(Primitive::from("::nope"))).unwrap();
    assert_eq!(v.get(), home);
}

#[test]
fn bindings_on_same_key_converge() {
    let (_store, shared) = memory();
    let a = StoredValue::with_store(key!("volume"), 0.5f64, Arc::clone(&shared));
    let b = StoredValue::with_store(key!("volume"), 0.5f64, shared);

    a.set(0.8);
    assert_eq!(b.get(), 0.8);

    b.reset();
    assert_eq!(a.get(), 0.5);
}

#[test]
fn observers_fire_for_external_changes_only_through_live_bindings() {
    let (store, shared) = memory();
    let flag = StoredValue::with_store(key!("enabled"), false, shared);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let _obs = flag.subscribe(move |v: &bool| s.lock().unwrap().push(*v));

    store.write(&key!("enabled"), Some(Primitive::Bool(true))).unwrap();
    flag.dispose();
    store.write(&key!("enabled"), Some(Primitive::Bool(false))).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![true]);
    assert!(flag.get());
}

#[test]
fn file_store_reload_reaches_bindings() {
    let dir = TempDir::new().unwrap();
    let file = Arc::new(
        JsonFileStore::open(FileStoreConfig::new(dir.path().join("prefs.json"))).unwrap(),
    );
    let shared: SharedStore = file.clone();

    let name = StoredValue::with_store(key!("name"), "anon".to_string(), Arc::clone(&shared));
    let count = StoredValue::with_store(key!("count"), 0i32, shared);
    name.set("alice".to_string());
    count.set(2);

    // Another process edits the document.
    fs::write(
        file.path(),
        r#"{"name": {"string": "carol"}, "count": {"string": "two"}}"#,
    )
    .unwrap();
    file.reload().unwrap();

    assert_eq!(name.get(), "carol");
    assert_eq!(count.get(), 0);
}

#[test]
fn file_store_values_survive_restart() {
    let dir = TempDir::new().unwrap();
    let config = FileStoreConfig::new(dir.path().join("prefs.json"));

    {
        let shared: SharedStore = Arc::new(JsonFileStore::open(config.clone()).unwrap());
        let avatar = StoredValue::with_store(key!("avatar"), Vec::<u8>::new(), shared);
        avatar.set(vec![0xde, 0xad, 0xbe, 0xef]);
    }

    let shared: SharedStore = Arc::new(JsonFileStore::open(config).unwrap());
    let avatar = StoredValue::with_store(key!("avatar"), Vec::<u8>::new(), shared);
    assert_eq!(avatar.get(), vec![0xde, 0xad, 0xbe, 0xef]);
}

#[test]
fn infinite_float_is_not_persisted_to_file() {
    let dir = TempDir::new().unwrap();
    let config = FileStoreConfig::new(dir.path().join("prefs.json"));

    {
        let shared: SharedStore = Arc::new(JsonFileStore::open(config.clone()).unwrap());
        let limit = StoredValue::with_store(key!("limit"), 1.0f64, shared);
        limit.set(2.5);
        limit.set(f64::INFINITY);
        // The failed write is logged; the cache still takes the value.
        assert_eq!(limit.get(), f64::INFINITY);
    }

    let shared: SharedStore = Arc::new(JsonFileStore::open(config).unwrap());
    let limit = StoredValue::with_store(key!("limit"), 1.0f64, shared);
    assert_eq!(limit.get(), 2.5);
}

#[test]
fn default_store_binding() {
    let a = StoredValue::new(key!("scenarios.default_store"), 1i64);
    let b = StoredValue::new(key!("scenarios.default_store"), 1i64);

    a.set(10);
    assert_eq!(b.get(), 10);
    assert_eq!(
        prefbind::default_store()
            .read(&key!("scenarios.default_store"))
            .unwrap(),
        Some(Primitive::Integer(10))
    );
}

#[test]
fn optional_binding_in_default_store() {
    let nick: StoredValue<Option<String>> = StoredValue::optional(key!("scenarios.nick"));
    assert_eq!(nick.get(), None);

    nick.set(Some("al".to_string()));
    assert_eq!(nick.get().as_deref(), Some("al"));

    nick.set(None);
    assert_eq!(
        prefbind::default_store()
            .read(&key!("scenarios.nick"))
            .unwrap(),
        None
    );
}
