//! Item store: the persistence boundary with live queries.
//!
//! # Responsibility
//! - Own the SQLite connection for the `items` table.
//! - Run CRUD operations and publish a fresh snapshot after each committed change.
//! - Hand out live `query_all` subscriptions.
//! - Provide the process-wide `init`/`close` lifecycle (see [`global`]).
//!
//! # Invariants
//! - Mutations and their follow-up snapshot query run under one connection lock,
//!   so subscribers observe snapshots in commit order.
//! - A write that matches no row is not a change and publishes nothing.
//! - A closed store rejects every operation with `StoreError::Closed`.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::item::{Item, ItemId, ItemValidationError};
use crate::repo::item_repo::{ItemRepository, RepoError, RepoResult, SqliteItemRepository};
use log::{debug, error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

pub mod global;
mod live;

pub use global::{close, global, init, init_in_dir};
pub use live::{LiveEvent, MutationKind, Subscription, SubscriptionId};

use live::SubscriberRegistry;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by store operations and lifecycle calls.
#[derive(Debug)]
pub enum StoreError {
    /// Database file could not be opened, created or migrated.
    Init(DbError),
    /// Application data directory could not be prepared.
    DataDir(std::io::Error),
    /// Insert/update/delete failed in storage.
    Write { op: MutationKind, source: RepoError },
    /// Item rejected before reaching storage.
    Validation(ItemValidationError),
    /// Snapshot query failed.
    Query(RepoError),
    /// Connection could not be closed cleanly.
    Close(DbError),
    /// Store was closed.
    Closed,
    /// Process-wide store is already open on a different path.
    AlreadyInitialized { active: PathBuf, requested: PathBuf },
    /// A thread panicked while holding the connection lock.
    Poisoned,
}

impl StoreError {
    /// Stable machine-readable code for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init(_) => "storage_init_failed",
            Self::DataDir(_) => "data_dir_unavailable",
            Self::Write { .. } => "storage_write_failed",
            Self::Validation(_) => "validation_failed",
            Self::Query(_) => "storage_query_failed",
            Self::Close(_) => "storage_close_failed",
            Self::Closed => "store_closed",
            Self::AlreadyInitialized { .. } => "store_already_initialized",
            Self::Poisoned => "store_poisoned",
        }
    }

    fn from_write(op: MutationKind, err: RepoError) -> Self {
        match err {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Write { op, source: other },
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init(err) => write!(f, "failed to open item store: {err}"),
            Self::DataDir(err) => write!(f, "failed to prepare data directory: {err}"),
            Self::Write { op, source } => write!(f, "{} failed: {source}", op.as_str()),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Query(err) => write!(f, "item query failed: {err}"),
            Self::Close(err) => write!(f, "failed to close item store: {err}"),
            Self::Closed => write!(f, "item store is closed"),
            Self::AlreadyInitialized { active, requested } => write!(
                f,
                "item store already initialized at `{}`; refusing to open `{}`",
                active.display(),
                requested.display()
            ),
            Self::Poisoned => write!(f, "item store lock poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Init(err) | Self::Close(err) => Some(err),
            Self::DataDir(err) => Some(err),
            Self::Write { source, .. } => Some(source),
            Self::Validation(err) => Some(err),
            Self::Query(err) => Some(err),
            Self::Closed | Self::AlreadyInitialized { .. } | Self::Poisoned => None,
        }
    }
}

/// SQLite-backed item store with live query support.
#[derive(Debug)]
pub struct Store {
    path: Option<PathBuf>,
    conn: Mutex<Option<Connection>>,
    subscribers: Arc<SubscriberRegistry>,
}

impl Store {
    /// Opens (or creates) the store at `path` and applies migrations.
    ///
    /// Prefer [`init`] for the process-wide handle; this constructor is for
    /// callers that manage the store's lifetime themselves.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = open_db(&path).map_err(StoreError::Init)?;
        Ok(Self::with_connection(Some(path), conn))
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = open_db_in_memory().map_err(StoreError::Init)?;
        Ok(Self::with_connection(None, conn))
    }

    fn with_connection(path: Option<PathBuf>, conn: Connection) -> Self {
        Self {
            path,
            conn: Mutex::new(Some(conn)),
            subscribers: Arc::new(SubscriberRegistry::new()),
        }
    }

    /// Database file path; `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Inserts `item` and returns the id assigned by storage.
    ///
    /// The id carried by `item` is ignored.
    pub fn insert(&self, item: &Item) -> StoreResult<ItemId> {
        self.write(MutationKind::Insert, item.id, |repo| {
            repo.insert_item(item).map(|id| (id, true))
        })
    }

    /// Replaces the row matching `item.id`.
    ///
    /// Returns `Ok(false)` without publishing when no row matches.
    pub fn update(&self, item: &Item) -> StoreResult<bool> {
        self.write(MutationKind::Update, item.id, |repo| {
            repo.update_item(item).map(|changed| (changed, changed))
        })
    }

    /// Removes the row matching `item.id`.
    ///
    /// Deleting an id that does not exist returns `Ok(false)` and leaves other
    /// rows untouched.
    pub fn delete(&self, item: &Item) -> StoreResult<bool> {
        self.delete_by_id(item.id)
    }

    pub fn delete_by_id(&self, id: ItemId) -> StoreResult<bool> {
        self.write(MutationKind::Delete, id, |repo| {
            repo.delete_item(id).map(|changed| (changed, changed))
        })
    }

    pub fn get(&self, id: ItemId) -> StoreResult<Option<Item>> {
        self.read(|repo| repo.get_item(id))
    }

    pub fn count(&self) -> StoreResult<usize> {
        self.read(|repo| repo.count_items())
    }

    /// Returns every item ordered by name (binary collation), then id.
    pub fn query_all(&self) -> StoreResult<Vec<Item>> {
        self.read(|repo| repo.list_items())
    }

    /// Subscribes to the live `query_all` result.
    ///
    /// The current snapshot is queued immediately; later snapshots follow each
    /// committed mutation.
    pub fn subscribe(&self) -> StoreResult<Subscription> {
        let guard = self.lock_conn()?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        let items = SqliteItemRepository::new(conn)
            .list_items()
            .map_err(StoreError::Query)?;
        // Registering under the connection lock keeps writers from slipping a
        // change in between the initial snapshot and the registration.
        let subscription = self.subscribers.register(LiveEvent::Snapshot(items));
        debug!(
            "event=live_subscribe module=store status=ok subscription_id={} subscribers={}",
            subscription.id(),
            self.subscribers.len()
        );
        Ok(subscription)
    }

    /// Number of active live-query subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Reports a failed background write to live subscribers.
    pub fn publish_write_failure(&self, op: MutationKind, item: Item, message: String) {
        self.subscribers
            .publish(&LiveEvent::WriteFailed { op, item, message });
    }

    pub fn is_closed(&self) -> bool {
        match self.conn.lock() {
            Ok(guard) => guard.is_none(),
            Err(_) => true,
        }
    }

    /// Closes the connection and disconnects all subscribers.
    ///
    /// Closing an already closed store is a no-op.
    pub fn close(&self) -> StoreResult<()> {
        let mut guard = self.lock_conn()?;
        let Some(conn) = guard.take() else {
            return Ok(());
        };
        self.subscribers.clear();

        conn.close().map_err(|(_, err)| {
            error!(
                "event=store_close module=store status=error error_code=storage_close_failed error={}",
                err
            );
            StoreError::Close(DbError::Sqlite(err))
        })?;

        info!("event=store_close module=store status=ok");
        Ok(())
    }

    fn read<T>(
        &self,
        query: impl FnOnce(&SqliteItemRepository<'_>) -> RepoResult<T>,
    ) -> StoreResult<T> {
        let guard = self.lock_conn()?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        query(&SqliteItemRepository::new(conn)).map_err(StoreError::Query)
    }

    fn write<T>(
        &self,
        op: MutationKind,
        item_id: ItemId,
        apply: impl FnOnce(&SqliteItemRepository<'_>) -> RepoResult<(T, bool)>,
    ) -> StoreResult<T> {
        let started_at = Instant::now();
        let guard = self.lock_conn()?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        let repo = SqliteItemRepository::new(conn);

        let (value, changed) = match apply(&repo) {
            Ok(outcome) => outcome,
            Err(err) => {
                let err = StoreError::from_write(op, err);
                error!(
                    "event=store_write module=store status=error op={} item_id={} duration_ms={} error_code={} error={}",
                    op.as_str(),
                    item_id,
                    started_at.elapsed().as_millis(),
                    err.kind(),
                    err
                );
                return Err(err);
            }
        };

        if changed {
            self.publish_snapshot(&repo);
        }

        debug!(
            "event=store_write module=store status=ok op={} item_id={} changed={} duration_ms={}",
            op.as_str(),
            item_id,
            changed,
            started_at.elapsed().as_millis()
        );
        Ok(value)
    }

    fn publish_snapshot(&self, repo: &SqliteItemRepository<'_>) {
        if self.subscribers.is_empty() {
            return;
        }

        match repo.list_items() {
            Ok(items) => {
                let count = items.len();
                let delivered = self.subscribers.publish(&LiveEvent::Snapshot(items));
                debug!(
                    "event=live_publish module=store status=ok items={} subscribers={}",
                    count, delivered
                );
            }
            Err(err) => {
                // The write is already committed; only the notification is lost.
                error!(
                    "event=live_publish module=store status=error error_code=storage_query_failed error={}",
                    err
                );
            }
        }
    }

    fn lock_conn(&self) -> StoreResult<MutexGuard<'_, Option<Connection>>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::{MutationKind, Store, StoreError};
    use crate::db::DbError;
    use crate::model::item::ItemValidationError;
    use crate::repo::item_repo::RepoError;

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(StoreError::Closed.kind(), "store_closed");
        assert_eq!(
            StoreError::Validation(ItemValidationError::EmptyName).kind(),
            "validation_failed"
        );
        let write = StoreError::Write {
            op: MutationKind::Insert,
            source: RepoError::InvalidData("x".to_string()),
        };
        assert_eq!(write.kind(), "storage_write_failed");
        assert_eq!(
            StoreError::Init(DbError::UnsupportedSchemaVersion {
                db_version: 9,
                latest_supported: 1,
            })
            .kind(),
            "storage_init_failed"
        );
    }

    #[test]
    fn from_write_splits_validation_from_storage_failures() {
        let validation =
            StoreError::from_write(MutationKind::Update, ItemValidationError::EmptyName.into());
        assert!(matches!(validation, StoreError::Validation(_)));

        let storage = StoreError::from_write(
            MutationKind::Delete,
            RepoError::InvalidData("bad".to_string()),
        );
        assert!(matches!(
            storage,
            StoreError::Write {
                op: MutationKind::Delete,
                ..
            }
        ));
    }

    #[test]
    fn in_memory_store_has_no_path() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.path().is_none());
        assert!(!store.is_closed());
    }
}
