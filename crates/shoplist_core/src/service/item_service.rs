//! Shopping-list mutation façade.
//!
//! # Responsibility
//! - Expose the live item collection to observers.
//! - Queue insert/update/delete requests onto one background writer thread.
//!
//! # Invariants
//! - Mutation calls never block on storage I/O; they only enqueue.
//! - One writer thread applies mutations in submission order.
//! - Write failures are logged and published as `LiveEvent::WriteFailed`;
//!   they are never retried.
//! - After `shutdown`, new mutations are dropped with a warning.

use crate::model::item::Item;
use crate::store::{MutationKind, Store, StoreError, Subscription};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

const WRITER_THREAD_NAME: &str = "shoplist-writer";

/// Errors raised while setting up or observing the service.
#[derive(Debug)]
pub enum ServiceError {
    /// Writer thread could not be started.
    Spawn(std::io::Error),
    /// Store-level failure (for example, subscribing to a closed store).
    Store(StoreError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn(err) => write!(f, "failed to start writer thread: {err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Spawn(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

enum WriteCommand {
    Mutate { op: MutationKind, item: Item },
    Flush(SyncSender<()>),
}

/// Fire-and-forget mutation façade backed by a single writer thread.
pub struct ItemService {
    store: Arc<Store>,
    sender: Option<Sender<WriteCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl ItemService {
    /// Starts the writer thread for `store`.
    pub fn new(store: Arc<Store>) -> Result<Self, ServiceError> {
        let (sender, receiver) = mpsc::channel();
        let worker_store = Arc::clone(&store);
        let worker = thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || run_writer(worker_store, receiver))
            .map_err(ServiceError::Spawn)?;

        Ok(Self {
            store,
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Subscribes to the live, name-ordered item collection.
    pub fn items(&self) -> Result<Subscription, ServiceError> {
        Ok(self.store.subscribe()?)
    }

    /// Queues insertion of `item`; the store assigns its id.
    pub fn insert(&self, item: Item) {
        self.submit(MutationKind::Insert, item);
    }

    /// Queues insertion of a new item by name; `quantity` defaults to 1.
    pub fn insert_named(&self, name: impl Into<String>, quantity: Option<i64>) {
        let item = Item::with_quantity(name, quantity.unwrap_or(Item::DEFAULT_QUANTITY));
        self.insert(item);
    }

    /// Queues a full-row replacement keyed by `item.id`.
    pub fn update(&self, item: Item) {
        self.submit(MutationKind::Update, item);
    }

    /// Queues removal of the row keyed by `item.id`.
    pub fn delete(&self, item: Item) {
        self.submit(MutationKind::Delete, item);
    }

    /// Queues an update that flips the purchased flag of `item`.
    pub fn set_purchased(&self, item: &Item, purchased: bool) {
        self.update(Item {
            purchased,
            ..item.clone()
        });
    }

    /// Queues an update that changes the quantity of `item`.
    pub fn set_quantity(&self, item: &Item, quantity: i64) {
        self.update(Item {
            quantity,
            ..item.clone()
        });
    }

    /// Blocks until every mutation submitted before this call has been applied.
    ///
    /// Returns `false` when the writer is no longer running.
    pub fn flush(&self) -> bool {
        let Some(sender) = self.sender.as_ref() else {
            return false;
        };
        let (ack_sender, ack_receiver) = mpsc::sync_channel(1);
        if sender.send(WriteCommand::Flush(ack_sender)).is_err() {
            return false;
        }
        ack_receiver.recv().is_ok()
    }

    /// Stops accepting mutations, drains the queue and joins the writer.
    ///
    /// Calling this more than once is a no-op.
    pub fn shutdown(&mut self) {
        // Dropping the only sender ends the writer loop once the queue drains.
        self.sender = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("event=writer_stop module=service status=error error_code=writer_panicked");
            }
        }
    }

    fn submit(&self, op: MutationKind, item: Item) {
        let item_id = item.id;
        let sent = match self.sender.as_ref() {
            Some(sender) => sender.send(WriteCommand::Mutate { op, item }).is_ok(),
            None => false,
        };

        if sent {
            debug!(
                "event=mutation_enqueue module=service status=ok op={} item_id={}",
                op.as_str(),
                item_id
            );
        } else {
            warn!(
                "event=mutation_enqueue module=service status=error op={} item_id={} error_code=writer_stopped",
                op.as_str(),
                item_id
            );
        }
    }
}

impl Drop for ItemService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_writer(store: Arc<Store>, receiver: Receiver<WriteCommand>) {
    info!("event=writer_start module=service status=ok");
    let mut applied = 0_u64;
    let mut failed = 0_u64;

    for command in receiver {
        match command {
            WriteCommand::Mutate { op, item } => {
                if apply_mutation(&store, op, item) {
                    applied += 1;
                } else {
                    failed += 1;
                }
            }
            WriteCommand::Flush(ack) => {
                // The caller may have given up waiting; nothing to do then.
                let _ = ack.send(());
            }
        }
    }

    info!(
        "event=writer_stop module=service status=ok applied={} failed={}",
        applied, failed
    );
}

fn apply_mutation(store: &Store, op: MutationKind, item: Item) -> bool {
    let result = match op {
        MutationKind::Insert => store.insert(&item).map(|_| true),
        MutationKind::Update => store.update(&item),
        MutationKind::Delete => store.delete(&item),
    };

    match result {
        Ok(changed) => {
            if !changed {
                debug!(
                    "event=mutation_apply module=service status=noop op={} item_id={}",
                    op.as_str(),
                    item.id
                );
            }
            true
        }
        Err(err) => {
            warn!(
                "event=mutation_apply module=service status=error op={} item_id={} error_code={}",
                op.as_str(),
                item.id,
                err.kind()
            );
            store.publish_write_failure(op, item, err.to_string());
            false
        }
    }
}
