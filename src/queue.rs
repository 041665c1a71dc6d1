//! Queue store with gapless position invariant
//!
//! Entries are cached in memory in play order and written through to the
//! `queue` table. Positions always form the contiguous sequence `0..N-1`;
//! every removal or move re-derives them from the resulting order. Database
//! writes commit before the cache changes, so a failed operation leaves the
//! observable queue untouched. The store is not internally locked; the
//! coordinator serializes all access.

use crate::error::{Error, Result};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::debug;
use uuid::Uuid;

/// One queued track
#[derive(Debug, Clone, Serialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub track_id: Uuid,
    pub added_by: String,
    pub position: usize,
}

/// Database-backed ordered queue
pub struct QueueStore {
    db: Pool<Sqlite>,
    entries: Vec<QueueEntry>,
}

impl QueueStore {
    /// Load the queue from the database in position order
    ///
    /// Positions are re-derived from the loaded order, which also repairs
    /// any gaps a crash mid-write could have left behind.
    pub async fn load(db: Pool<Sqlite>) -> Result<Self> {
        let rows: Vec<(String, String, String, i64)> = sqlx::query_as(
            "SELECT id, track_id, added_by, position FROM queue ORDER BY position ASC",
        )
        .fetch_all(&db)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for (position, (id, track_id, added_by, _)) in rows.into_iter().enumerate() {
            entries.push(QueueEntry {
                id: parse_uuid(&id)?,
                track_id: parse_uuid(&track_id)?,
                added_by,
                position,
            });
        }

        let store = Self { db, entries };
        debug!("Loaded {} queue entries", store.entries.len());
        Ok(store)
    }

    /// Current entries, ascending by position
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a new entry at the tail
    pub async fn append(&mut self, track_id: Uuid, added_by: &str) -> Result<QueueEntry> {
        let entry = QueueEntry {
            id: Uuid::new_v4(),
            track_id,
            added_by: added_by.to_string(),
            position: self.entries.len(),
        };

        sqlx::query("INSERT INTO queue (id, track_id, added_by, position) VALUES (?, ?, ?, ?)")
            .bind(entry.id.to_string())
            .bind(entry.track_id.to_string())
            .bind(&entry.added_by)
            .bind(entry.position as i64)
            .execute(&self.db)
            .await?;

        self.entries.push(entry.clone());
        debug!("Enqueued {} at position {}", entry.id, entry.position);
        Ok(entry)
    }

    /// Remove an entry by id and re-derive all remaining positions
    pub async fn remove(&mut self, id: Uuid) -> Result<()> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::NotFound(format!("queue entry {}", id)))?;

        let mut next = self.entries.clone();
        next.remove(index);
        reindex(&mut next);

        self.persist(&next, Some(id)).await?;
        self.entries = next;
        debug!("Removed queue entry {}", id);
        Ok(())
    }

    /// Move an entry to a target position and re-derive all positions
    ///
    /// Out-of-range targets are clamped into `[0, len]` (length after the
    /// entry is lifted out), so a huge target lands the entry at the tail
    /// and a negative one at the head.
    pub async fn move_to(&mut self, id: Uuid, target: i64) -> Result<()> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::NotFound(format!("queue entry {}", id)))?;

        let mut next = self.entries.clone();
        let moving = next.remove(index);
        let clamped = target.clamp(0, next.len() as i64) as usize;
        next.insert(clamped, moving);
        reindex(&mut next);

        self.persist(&next, None).await?;
        self.entries = next;
        debug!("Moved queue entry {} to position {}", id, clamped);
        Ok(())
    }

    /// Remove every entry referencing `track_id`, re-deriving positions
    ///
    /// Used when a track is deleted from the catalog. Returns the number of
    /// entries removed; zero is not an error.
    pub async fn remove_track_entries(&mut self, track_id: Uuid) -> Result<usize> {
        let mut next: Vec<QueueEntry> = self
            .entries
            .iter()
            .filter(|e| e.track_id != track_id)
            .cloned()
            .collect();
        let removed = self.entries.len() - next.len();
        if removed == 0 {
            return Ok(0);
        }
        reindex(&mut next);

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM queue WHERE track_id = ?")
            .bind(track_id.to_string())
            .execute(&mut *tx)
            .await?;
        for entry in &next {
            sqlx::query("UPDATE queue SET position = ? WHERE id = ?")
                .bind(entry.position as i64)
                .bind(entry.id.to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        self.entries = next;
        debug!("Removed {} queue entries for track {}", removed, track_id);
        Ok(removed)
    }

    /// Write the new ordering (and an optional single deletion) atomically
    async fn persist(&self, next: &[QueueEntry], delete_id: Option<Uuid>) -> Result<()> {
        let mut tx = self.db.begin().await?;
        if let Some(id) = delete_id {
            sqlx::query("DELETE FROM queue WHERE id = ?")
                .bind(id.to_string())
                .execute(&mut *tx)
                .await?;
        }
        for entry in next {
            sqlx::query("UPDATE queue SET position = ? WHERE id = ?")
                .bind(entry.position as i64)
                .bind(entry.id.to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Re-derive positions as 0..N-1 from the current order
fn reindex(entries: &mut [QueueEntry]) {
    for (position, entry) in entries.iter_mut().enumerate() {
        entry.position = position;
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Internal(format!("invalid UUID in database: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_memory, init};

    async fn setup() -> QueueStore {
        let pool = connect_memory().await.unwrap();
        init::create_schema(&pool).await.unwrap();
        QueueStore::load(pool).await.unwrap()
    }

    fn assert_gapless(store: &QueueStore) {
        for (i, entry) in store.entries().iter().enumerate() {
            assert_eq!(entry.position, i, "position gap at index {}", i);
        }
    }

    #[tokio::test]
    async fn test_append_assigns_tail_positions() {
        let mut store = setup().await;

        let a = store.append(Uuid::new_v4(), "host").await.unwrap();
        let b = store.append(Uuid::new_v4(), "user").await.unwrap();
        assert_eq!(a.position, 0);
        assert_eq!(b.position, 1);
        assert_gapless(&store);
    }

    #[tokio::test]
    async fn test_remove_reindexes() {
        let mut store = setup().await;
        let a = store.append(Uuid::new_v4(), "host").await.unwrap();
        let b = store.append(Uuid::new_v4(), "host").await.unwrap();
        let c = store.append(Uuid::new_v4(), "host").await.unwrap();

        store.remove(b.id).await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.entries()[0].id, a.id);
        assert_eq!(store.entries()[1].id, c.id);
        assert_gapless(&store);
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let mut store = setup().await;
        store.append(Uuid::new_v4(), "host").await.unwrap();

        let err = store.remove(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_move_within_range() {
        let mut store = setup().await;
        let a = store.append(Uuid::new_v4(), "host").await.unwrap();
        let b = store.append(Uuid::new_v4(), "host").await.unwrap();
        let c = store.append(Uuid::new_v4(), "host").await.unwrap();

        store.move_to(c.id, 0).await.unwrap();
        let order: Vec<Uuid> = store.entries().iter().map(|e| e.id).collect();
        assert_eq!(order, vec![c.id, a.id, b.id]);
        assert_gapless(&store);
    }

    #[tokio::test]
    async fn test_move_clamps_negative_to_head() {
        let mut store = setup().await;
        let a = store.append(Uuid::new_v4(), "host").await.unwrap();
        let b = store.append(Uuid::new_v4(), "host").await.unwrap();

        store.move_to(b.id, -5).await.unwrap();
        assert_eq!(store.entries()[0].id, b.id);
        assert_eq!(store.entries()[1].id, a.id);
        assert_gapless(&store);
    }

    #[tokio::test]
    async fn test_move_clamps_large_to_tail() {
        let mut store = setup().await;
        let a = store.append(Uuid::new_v4(), "host").await.unwrap();
        let ids: Vec<Uuid> = {
            let mut v = vec![a.id];
            for _ in 0..3 {
                v.push(store.append(Uuid::new_v4(), "host").await.unwrap().id);
            }
            v
        };

        store.move_to(ids[0], 9999).await.unwrap();
        assert_eq!(store.entries().last().unwrap().id, ids[0]);
        assert_eq!(store.entries().last().unwrap().position, 3);
        assert_gapless(&store);
    }

    #[tokio::test]
    async fn test_move_missing_is_not_found() {
        let mut store = setup().await;
        let err = store.move_to(Uuid::new_v4(), 0).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_track_entries_cascades() {
        let mut store = setup().await;
        let track = Uuid::new_v4();
        let other = Uuid::new_v4();
        store.append(track, "host").await.unwrap();
        store.append(other, "host").await.unwrap();
        store.append(track, "user").await.unwrap();

        let removed = store.remove_track_entries(track).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.entries()[0].track_id, other);
        assert_gapless(&store);

        assert_eq!(store.remove_track_entries(track).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_positions_survive_reload() {
        let pool = connect_memory().await.unwrap();
        init::create_schema(&pool).await.unwrap();

        let mut store = QueueStore::load(pool.clone()).await.unwrap();
        let a = store.append(Uuid::new_v4(), "host").await.unwrap();
        let b = store.append(Uuid::new_v4(), "host").await.unwrap();
        store.append(Uuid::new_v4(), "host").await.unwrap();
        store.remove(a.id).await.unwrap();

        let reloaded = QueueStore::load(pool).await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.entries()[0].id, b.id);
        assert_gapless(&reloaded);
    }

    #[tokio::test]
    async fn test_mutation_sequences_keep_invariant() {
        let mut store = setup().await;
        let mut ids = Vec::new();
        for _ in 0..6 {
            ids.push(store.append(Uuid::new_v4(), "host").await.unwrap().id);
        }

        store.remove(ids[2]).await.unwrap();
        store.move_to(ids[5], 1).await.unwrap();
        store.remove(ids[0]).await.unwrap();
        store.move_to(ids[1], 100).await.unwrap();
        store.move_to(ids[4], -1).await.unwrap();

        assert_eq!(store.len(), 4);
        assert_gapless(&store);
    }
}
