//! Playback state store
//!
//! A single process-wide playback record, cached in memory and written
//! through to the `playback_state` row on every update. Updates are partial:
//! absent fields are left untouched. The store is not internally locked;
//! the coordinator serializes all access.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::debug;
use uuid::Uuid;

/// Current playback state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_track_id: Option<Uuid>,
    pub position_seconds: f64,
    pub volume: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_track_id: None,
            position_seconds: 0.0,
            volume: 1.0,
        }
    }
}

/// Partial update request; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaybackUpdate {
    pub is_playing: Option<bool>,
    pub current_track_id: Option<Uuid>,
    pub position_seconds: Option<f64>,
    pub volume: Option<f64>,
}

/// Database-backed playback store
pub struct PlaybackStore {
    db: Pool<Sqlite>,
    state: PlaybackState,
}

impl PlaybackStore {
    /// Load the singleton row, which `db::init` guarantees exists
    pub async fn load(db: Pool<Sqlite>) -> Result<Self> {
        let row: (bool, Option<String>, f64, f64) = sqlx::query_as(
            "SELECT is_playing, current_track_id, position_seconds, volume \
             FROM playback_state WHERE id = 1",
        )
        .fetch_one(&db)
        .await?;

        let current_track_id = row
            .1
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| Error::Internal(format!("invalid track UUID in database: {}", e)))?;

        let state = PlaybackState {
            is_playing: row.0,
            current_track_id,
            position_seconds: row.2,
            volume: row.3,
        };
        Ok(Self { db, state })
    }

    /// Snapshot read of the current state
    pub fn get(&self) -> PlaybackState {
        self.state.clone()
    }

    /// Apply a partial update, persisting before mutating the cache
    ///
    /// Validation happens first so a rejected update leaves both the row and
    /// the cache exactly as they were.
    pub async fn apply(&mut self, update: &PlaybackUpdate) -> Result<PlaybackState> {
        if let Some(volume) = update.volume {
            if !(0.0..=1.0).contains(&volume) {
                return Err(Error::InvalidArgument(format!(
                    "volume must be within [0, 1], got {}",
                    volume
                )));
            }
        }
        if let Some(position) = update.position_seconds {
            if !position.is_finite() || position < 0.0 {
                return Err(Error::InvalidArgument(format!(
                    "position_seconds must be non-negative, got {}",
                    position
                )));
            }
        }

        let mut next = self.state.clone();
        if let Some(is_playing) = update.is_playing {
            next.is_playing = is_playing;
        }
        if let Some(track_id) = update.current_track_id {
            next.current_track_id = Some(track_id);
        }
        if let Some(position) = update.position_seconds {
            next.position_seconds = position;
        }
        if let Some(volume) = update.volume {
            next.volume = volume;
        }

        sqlx::query(
            "UPDATE playback_state \
             SET is_playing = ?, current_track_id = ?, position_seconds = ?, volume = ?, \
                 updated_at = CURRENT_TIMESTAMP \
             WHERE id = 1",
        )
        .bind(next.is_playing)
        .bind(next.current_track_id.map(|id| id.to_string()))
        .bind(next.position_seconds)
        .bind(next.volume)
        .execute(&self.db)
        .await?;

        debug!("Playback state updated: {:?}", next);
        self.state = next.clone();
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_memory, init};

    async fn setup() -> PlaybackStore {
        let pool = connect_memory().await.unwrap();
        init::create_schema(&pool).await.unwrap();
        init::seed_playback_state(&pool).await.unwrap();
        PlaybackStore::load(pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_defaults() {
        let store = setup().await;
        assert_eq!(store.get(), PlaybackState::default());
    }

    #[tokio::test]
    async fn test_partial_update_leaves_other_fields() {
        let mut store = setup().await;

        let state = store
            .apply(&PlaybackUpdate {
                is_playing: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(state.is_playing);
        assert_eq!(state.volume, 1.0);
        assert_eq!(state.position_seconds, 0.0);
    }

    #[tokio::test]
    async fn test_volume_out_of_range_rejected() {
        let mut store = setup().await;
        let before = store.get();

        let err = store
            .apply(&PlaybackUpdate {
                volume: Some(1.5),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        // State unchanged after rejection
        assert_eq!(store.get(), before);
    }

    #[tokio::test]
    async fn test_negative_position_rejected() {
        let mut store = setup().await;
        let err = store
            .apply(&PlaybackUpdate {
                position_seconds: Some(-2.0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_update_persists() {
        let pool = connect_memory().await.unwrap();
        init::create_schema(&pool).await.unwrap();
        init::seed_playback_state(&pool).await.unwrap();

        let mut store = PlaybackStore::load(pool.clone()).await.unwrap();
        store
            .apply(&PlaybackUpdate {
                volume: Some(0.25),
                position_seconds: Some(12.5),
                ..Default::default()
            })
            .await
            .unwrap();

        // A fresh load sees the committed values
        let reloaded = PlaybackStore::load(pool).await.unwrap();
        assert_eq!(reloaded.get().volume, 0.25);
        assert_eq!(reloaded.get().position_seconds, 12.5);
    }
}
