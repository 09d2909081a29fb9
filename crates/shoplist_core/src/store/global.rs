//! Process-wide item store lifecycle.
//!
//! # Responsibility
//! - Open the application's store once per process and share the handle.
//! - Provide an explicit `close` so the handle can be torn down deliberately.
//!
//! # Invariants
//! - At most one process-wide store is open at a time.
//! - `init` opens the database while holding the slot lock, so concurrent
//!   callers never construct two stores.
//! - `init` with the active path is idempotent; a different path is rejected.
//! - After `close`, `init` may open a store again.

use super::{Store, StoreError, StoreResult};
use crate::db::DB_FILE_NAME;
use log::info;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

static ACTIVE_STORE: Mutex<Option<Arc<Store>>> = Mutex::new(None);

/// Opens the process-wide store at `path`, or returns the already open one.
///
/// # Errors
/// - `AlreadyInitialized` when a store is open on another path.
/// - `Init` when the database cannot be opened or migrated.
pub fn init(path: impl AsRef<Path>) -> StoreResult<Arc<Store>> {
    let requested = path.as_ref();
    let mut slot = lock_slot()?;

    if let Some(active) = slot.as_ref() {
        if active.path() == Some(requested) {
            return Ok(Arc::clone(active));
        }
        return Err(StoreError::AlreadyInitialized {
            active: active.path().map(Path::to_path_buf).unwrap_or_default(),
            requested: requested.to_path_buf(),
        });
    }

    let store = Arc::new(Store::open(requested)?);
    *slot = Some(Arc::clone(&store));
    info!(
        "event=store_init module=store status=ok path={}",
        requested.display()
    );
    Ok(store)
}

/// Opens the process-wide store in `data_dir`, creating the directory if needed.
///
/// The database file is named [`DB_FILE_NAME`].
pub fn init_in_dir(data_dir: impl AsRef<Path>) -> StoreResult<Arc<Store>> {
    let data_dir = data_dir.as_ref();
    std::fs::create_dir_all(data_dir).map_err(StoreError::DataDir)?;
    init(data_dir.join(DB_FILE_NAME))
}

/// Returns the process-wide store when one is open.
pub fn global() -> Option<Arc<Store>> {
    lock_slot().ok().and_then(|slot| slot.as_ref().map(Arc::clone))
}

/// Closes `store`, releasing the process-wide slot if it holds this store.
///
/// Other clones of the handle stay valid as objects but every operation on
/// them returns `StoreError::Closed`.
pub fn close(store: Arc<Store>) -> StoreResult<()> {
    {
        let mut slot = lock_slot()?;
        if slot
            .as_ref()
            .is_some_and(|active| Arc::ptr_eq(active, &store))
        {
            *slot = None;
        }
    }
    store.close()
}

fn lock_slot() -> StoreResult<MutexGuard<'static, Option<Arc<Store>>>> {
    ACTIVE_STORE.lock().map_err(|_| StoreError::Poisoned)
}
