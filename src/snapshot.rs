//! Full-state snapshot composition
//!
//! A snapshot is the complete transmissible state: the queue (with resolved
//! track metadata) plus the playback record. It is built while the caller
//! holds the mutation lock, so both halves come from one consistent view,
//! and is immutable once built.

use crate::db::tracks::{self, Track};
use crate::error::Result;
use crate::playback::PlaybackState;
use crate::queue::QueueEntry;
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::warn;
use uuid::Uuid;

/// One queue entry with its resolved track
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotEntry {
    pub id: Uuid,
    pub position: usize,
    pub added_by: String,
    pub track: Track,
}

/// Complete current state as a single value
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub queue: Vec<SnapshotEntry>,
    pub playback: PlaybackState,
}

/// Compose a snapshot from the queue entries and playback state,
/// resolving track metadata through the catalog
pub async fn build(
    pool: &Pool<Sqlite>,
    entries: &[QueueEntry],
    playback: PlaybackState,
) -> Result<Snapshot> {
    let mut queue = Vec::with_capacity(entries.len());
    for entry in entries {
        match tracks::get(pool, entry.track_id).await? {
            Some(track) => queue.push(SnapshotEntry {
                id: entry.id,
                position: entry.position,
                added_by: entry.added_by.clone(),
                track,
            }),
            None => {
                // Track deletion cascades through the queue under the same
                // lock, so this only happens if the database was edited
                // out-of-band. Skip the entry rather than fail the snapshot.
                warn!("queue entry {} references missing track {}", entry.id, entry.track_id);
            }
        }
    }

    Ok(Snapshot { queue, playback })
}
