//! Publish-subscribe plumbing for live item queries.
//!
//! # Responsibility
//! - Track active subscribers and hand each one its own channel.
//! - Fan out snapshots and write failures after store mutations.
//!
//! # Invariants
//! - Each subscriber receives events in publish order.
//! - Subscribers whose receiving side is gone are pruned on the next publish.
//! - Dropping a `Subscription` unsubscribes it.

use crate::model::item::Item;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

/// Identifier handed out per subscription, unique within one store.
pub type SubscriptionId = u64;

/// Kind of mutation applied to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl MutationKind {
    /// Stable lowercase name used in log lines and messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Event delivered to live-query subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// Full result set of `query_all` after a committed change.
    Snapshot(Vec<Item>),
    /// A background write failed; the table is unchanged by it.
    WriteFailed {
        op: MutationKind,
        item: Item,
        message: String,
    },
}

impl LiveEvent {
    /// Returns the items carried by a snapshot event.
    pub fn as_snapshot(&self) -> Option<&[Item]> {
        match self {
            Self::Snapshot(items) => Some(items.as_slice()),
            Self::WriteFailed { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: Mutex<BTreeMap<SubscriptionId, Sender<LiveEvent>>>,
}

impl SubscriberRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber and queues `initial` as its first event.
    pub(crate) fn register(self: &Arc<Self>, initial: LiveEvent) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (sender, receiver) = mpsc::channel();
        // Receiver is alive here, so the send cannot fail.
        let _ = sender.send(initial);
        self.lock().insert(id, sender);

        Subscription {
            id,
            receiver,
            registry: Arc::downgrade(self),
        }
    }

    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Sends `event` to every live subscriber and returns how many received it.
    pub(crate) fn publish(&self, event: &LiveEvent) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|_, sender| sender.send(event.clone()).is_ok());
        subscribers.len()
    }

    /// Drops every sender so receivers observe a disconnect.
    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<SubscriptionId, Sender<LiveEvent>>> {
        // The map holds no cross-entry invariant, so a poisoned guard is still usable.
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a live `query_all` subscription.
///
/// Events are consumed on whichever thread owns this handle. `recv*` methods
/// return `None` once the store is closed and all queued events are drained.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: Receiver<LiveEvent>,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Blocks until the next event arrives.
    pub fn recv(&self) -> Option<LiveEvent> {
        self.receiver.recv().ok()
    }

    /// Returns the next queued event without blocking.
    pub fn try_recv(&self) -> Option<LiveEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Waits up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<LiveEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Drains every queued event without blocking.
    pub fn drain(&self) -> Vec<LiveEvent> {
        self.receiver.try_iter().collect()
    }

    /// Drains queued events and returns the most recent snapshot among them.
    pub fn latest_snapshot(&self) -> Option<Vec<Item>> {
        self.drain()
            .into_iter()
            .filter_map(|event| match event {
                LiveEvent::Snapshot(items) => Some(items),
                LiveEvent::WriteFailed { .. } => None,
            })
            .last()
    }

    /// Stops delivery to this subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}
