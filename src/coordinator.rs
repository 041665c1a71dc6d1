//! Mutation coordinator
//!
//! Single entry point for every state mutation. One async mutex guards the
//! queue and playback stores together; each operation commits under that
//! lock, composes a snapshot from the same locked view, and broadcasts it
//! before releasing the lock. That gives every observer the broadcasts in
//! commit order. Broadcast delivery failures never surface here — the
//! broadcaster prunes dead observers silently.

use crate::broadcast::{Broadcaster, ObserverId, Payload};
use crate::config::RateLimitConfig;
use crate::db::tracks;
use crate::error::{Error, Result};
use crate::playback::{PlaybackStore, PlaybackUpdate};
use crate::queue::QueueStore;
use crate::ratelimit::RateLimiter;
use crate::snapshot::{self, Snapshot};
use sqlx::{Pool, Sqlite};
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tracing::info;
use uuid::Uuid;

/// State guarded by the mutation lock
struct CoreState {
    queue: QueueStore,
    playback: PlaybackStore,
}

/// Coordinates all mutations, snapshot composition, and fan-out
pub struct Coordinator {
    db: Pool<Sqlite>,
    core: Mutex<CoreState>,
    limiter: RateLimiter,
    broadcaster: Broadcaster,
}

impl Coordinator {
    /// Load stores from the database and build the coordinator
    pub async fn new(db: Pool<Sqlite>, rate_limit: RateLimitConfig) -> Result<Self> {
        let queue = QueueStore::load(db.clone()).await?;
        let playback = PlaybackStore::load(db.clone()).await?;
        info!(
            "Coordinator ready: {} queued entries, playback {:?}",
            queue.len(),
            playback.get()
        );
        Ok(Self {
            db,
            core: Mutex::new(CoreState { queue, playback }),
            limiter: RateLimiter::new(rate_limit),
            broadcaster: Broadcaster::new(),
        })
    }

    /// Enqueue a track at the tail of the queue
    ///
    /// Rate-limited per actor; the limiter is consulted before any state is
    /// touched so a denied request records nothing.
    pub async fn enqueue(&self, track_id: Uuid, actor: &str) -> Result<Snapshot> {
        if !self.limiter.allow(actor, Instant::now()) {
            return Err(Error::RateLimited);
        }

        let mut core = self.core.lock().await;
        let track = tracks::get(&self.db, track_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("track {}", track_id)))?;
        core.queue.append(track.id, actor).await?;
        self.commit_broadcast(&core).await
    }

    /// Remove a queue entry by id
    pub async fn remove_entry(&self, entry_id: Uuid) -> Result<Snapshot> {
        let mut core = self.core.lock().await;
        core.queue.remove(entry_id).await?;
        self.commit_broadcast(&core).await
    }

    /// Move a queue entry to a target position (clamped into range)
    pub async fn reorder_entry(&self, entry_id: Uuid, to_position: i64) -> Result<Snapshot> {
        let mut core = self.core.lock().await;
        core.queue.move_to(entry_id, to_position).await?;
        self.commit_broadcast(&core).await
    }

    /// Apply a partial playback update
    pub async fn update_playback(&self, update: PlaybackUpdate) -> Result<Snapshot> {
        let mut core = self.core.lock().await;
        core.playback.apply(&update).await?;
        self.commit_broadcast(&core).await
    }

    /// Delete a track from the catalog, cascading through the queue
    pub async fn remove_track(&self, track_id: Uuid) -> Result<Snapshot> {
        let mut core = self.core.lock().await;
        if !tracks::delete(&self.db, track_id).await? {
            return Err(Error::NotFound(format!("track {}", track_id)));
        }
        core.queue.remove_track_entries(track_id).await?;
        self.commit_broadcast(&core).await
    }

    /// Read-only snapshot of the current state
    pub async fn current_snapshot(&self) -> Result<Snapshot> {
        let core = self.core.lock().await;
        self.snapshot_locked(&core).await
    }

    /// Register an observer, sending it its initial snapshot first
    ///
    /// Runs under the mutation lock so no broadcast can land on this
    /// observer ahead of its initial snapshot.
    pub async fn register_observer(&self, tx: mpsc::Sender<Payload>) -> Result<ObserverId> {
        let core = self.core.lock().await;
        let snapshot = self.snapshot_locked(&core).await?;
        Ok(self.broadcaster.register(tx, &snapshot))
    }

    /// Drop an observer; unknown ids are a no-op
    pub fn unregister_observer(&self, id: ObserverId) {
        self.broadcaster.unregister(id);
    }

    pub fn observer_count(&self) -> usize {
        self.broadcaster.observer_count()
    }

    async fn snapshot_locked(&self, core: &CoreState) -> Result<Snapshot> {
        snapshot::build(&self.db, core.queue.entries(), core.playback.get()).await
    }

    /// Compose the post-commit snapshot and fan it out while still holding
    /// the mutation lock
    async fn commit_broadcast(&self, core: &CoreState) -> Result<Snapshot> {
        let snapshot = self.snapshot_locked(core).await?;
        self.broadcaster.broadcast(&snapshot);
        Ok(snapshot)
    }
}
