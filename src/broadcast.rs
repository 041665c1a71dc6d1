//! Snapshot broadcaster
//!
//! Owns the set of live observers, each backed by a bounded channel. A
//! broadcast serializes the snapshot once and attempts a non-blocking send
//! to every observer; any observer whose channel is full or closed is
//! dropped from the set on the spot. Delivery is best-effort with no retry
//! or acknowledgment — a reconnecting observer gets a fresh full snapshot
//! on registration instead of any replay.

use crate::snapshot::Snapshot;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-observer buffer depth. An observer that falls this far behind is
/// treated as stalled and pruned.
const OBSERVER_CHANNEL_CAPACITY: usize = 32;

pub type ObserverId = Uuid;

/// Serialized snapshot payload shared across observers
pub type Payload = Arc<String>;

/// Live observer registry with fan-out delivery
pub struct Broadcaster {
    observers: Mutex<HashMap<ObserverId, mpsc::Sender<Payload>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(HashMap::new()),
        }
    }

    /// Create the bounded channel an observer connection reads from
    pub fn channel() -> (mpsc::Sender<Payload>, mpsc::Receiver<Payload>) {
        mpsc::channel(OBSERVER_CHANNEL_CAPACITY)
    }

    /// Register an observer, delivering `initial` as its first payload
    ///
    /// The caller must hold the mutation lock, which keeps any concurrent
    /// broadcast from slipping in ahead of the initial snapshot. If the
    /// initial delivery fails the observer is not registered.
    pub fn register(&self, tx: mpsc::Sender<Payload>, initial: &Snapshot) -> ObserverId {
        let id = Uuid::new_v4();
        let payload = match serialize(initial) {
            Some(payload) => payload,
            None => return id,
        };
        if tx.try_send(payload).is_err() {
            debug!("observer {} gone before initial snapshot", id);
            return id;
        }

        let mut observers = self.observers.lock().unwrap();
        observers.insert(id, tx);
        debug!("observer {} registered ({} live)", id, observers.len());
        id
    }

    /// Remove an observer; removing an unknown id is a no-op
    pub fn unregister(&self, id: ObserverId) {
        let mut observers = self.observers.lock().unwrap();
        if observers.remove(&id).is_some() {
            debug!("observer {} unregistered ({} live)", id, observers.len());
        }
    }

    /// Serialize once and push to every live observer, pruning failures
    pub fn broadcast(&self, snapshot: &Snapshot) {
        let payload = match serialize(snapshot) {
            Some(payload) => payload,
            None => return,
        };

        let mut observers = self.observers.lock().unwrap();
        observers.retain(|id, tx| match tx.try_send(payload.clone()) {
            Ok(()) => true,
            Err(e) => {
                debug!("pruning observer {}: {}", id, e);
                false
            }
        });
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().unwrap().len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize(snapshot: &Snapshot) -> Option<Payload> {
    match serde_json::to_string(snapshot) {
        Ok(json) => Some(Arc::new(json)),
        Err(e) => {
            warn!("failed to serialize snapshot: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::PlaybackState;

    fn empty_snapshot() -> Snapshot {
        Snapshot {
            queue: Vec::new(),
            playback: PlaybackState::default(),
        }
    }

    #[tokio::test]
    async fn test_register_delivers_initial_snapshot() {
        let broadcaster = Broadcaster::new();
        let (tx, mut rx) = Broadcaster::channel();

        broadcaster.register(tx, &empty_snapshot());
        assert_eq!(broadcaster.observer_count(), 1);

        let payload = rx.recv().await.unwrap();
        assert!(payload.contains("\"queue\":[]"));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_observers() {
        let broadcaster = Broadcaster::new();
        let (tx1, mut rx1) = Broadcaster::channel();
        let (tx2, mut rx2) = Broadcaster::channel();
        broadcaster.register(tx1, &empty_snapshot());
        broadcaster.register(tx2, &empty_snapshot());

        broadcaster.broadcast(&empty_snapshot());

        // Each observer sees its initial snapshot then the broadcast
        rx1.recv().await.unwrap();
        rx1.recv().await.unwrap();
        rx2.recv().await.unwrap();
        rx2.recv().await.unwrap();
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let broadcaster = Broadcaster::new();
        let (tx, _rx) = Broadcaster::channel();
        let id = broadcaster.register(tx, &empty_snapshot());

        broadcaster.unregister(id);
        broadcaster.unregister(id);
        assert_eq!(broadcaster.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_observer_pruned_on_broadcast() {
        let broadcaster = Broadcaster::new();
        let (tx, rx) = Broadcaster::channel();
        broadcaster.register(tx, &empty_snapshot());
        drop(rx);

        broadcaster.broadcast(&empty_snapshot());
        assert_eq!(broadcaster.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_stalled_observer_pruned_without_blocking() {
        let broadcaster = Broadcaster::new();
        let (tx, _rx) = Broadcaster::channel();
        let (live_tx, mut live_rx) = Broadcaster::channel();
        broadcaster.register(tx, &empty_snapshot());
        broadcaster.register(live_tx, &empty_snapshot());

        // Fill the stalled observer's buffer; the broadcast after it must
        // still reach the live observer and prune the stalled one.
        for _ in 0..OBSERVER_CHANNEL_CAPACITY {
            broadcaster.broadcast(&empty_snapshot());
            while live_rx.try_recv().is_ok() {}
        }
        broadcaster.broadcast(&empty_snapshot());

        assert_eq!(broadcaster.observer_count(), 1);
        assert!(live_rx.try_recv().is_ok());
    }
}
