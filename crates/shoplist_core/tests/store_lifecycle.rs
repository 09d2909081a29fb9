use shoplist_core::db::DB_FILE_NAME;
use shoplist_core::store::{self, StoreError};
use shoplist_core::{CoreConfig, Item, ItemService};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

// The process-wide slot is shared by every test in this binary.
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[test]
fn init_is_idempotent_for_the_same_path() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DB_FILE_NAME);

    let first = store::init(&path).unwrap();
    let second = store::init(&path).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &store::global().unwrap()));

    store::close(first).unwrap();
    assert!(store::global().is_none());
    assert!(second.is_closed());
}

#[test]
fn init_with_a_different_path_is_rejected() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let active = store::init(dir.path().join("one.db")).unwrap();

    let err = store::init(dir.path().join("two.db")).unwrap_err();
    assert!(matches!(err, StoreError::AlreadyInitialized { .. }));
    assert_eq!(err.kind(), "store_already_initialized");

    store::close(active).unwrap();
}

#[test]
fn concurrent_init_constructs_one_store() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DB_FILE_NAME);

    let handles = (0..8)
        .map(|_| {
            let path = path.clone();
            thread::spawn(move || store::init(path).unwrap())
        })
        .collect::<Vec<_>>();
    let stores = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect::<Vec<_>>();

    assert!(stores.iter().all(|store| Arc::ptr_eq(store, &stores[0])));
    store::close(Arc::clone(&stores[0])).unwrap();
}

#[test]
fn data_survives_close_and_reopen() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();

    let store = store::init_in_dir(dir.path().join("app")).unwrap();
    assert_eq!(
        store.path(),
        Some(dir.path().join("app").join(DB_FILE_NAME).as_path())
    );
    {
        let service = ItemService::new(Arc::clone(&store)).unwrap();
        service.insert_named("Milk", Some(2));
        assert!(service.flush());
    }
    store::close(store).unwrap();

    let reopened = store::init_in_dir(dir.path().join("app")).unwrap();
    let items = reopened.query_all().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Milk");
    assert_eq!(items[0].quantity, 2);
    store::close(reopened).unwrap();
}

#[test]
fn config_db_path_matches_init_in_dir() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig::new(dir.path());

    let from_dir = store::init_in_dir(&config.data_dir).unwrap();
    let from_path = store::init(config.db_path()).unwrap();
    assert!(Arc::ptr_eq(&from_dir, &from_path));

    store::close(from_dir).unwrap();
}

#[test]
fn closing_a_non_global_store_leaves_the_slot_alone() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let global = store::init(dir.path().join("global.db")).unwrap();

    let private = Arc::new(store::Store::open(dir.path().join("private.db")).unwrap());
    private.insert(&Item::new("Milk")).unwrap();
    store::close(private).unwrap();

    assert!(Arc::ptr_eq(&global, &store::global().unwrap()));
    store::close(global).unwrap();
}
