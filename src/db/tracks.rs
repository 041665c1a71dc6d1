//! Track catalog persistence
//!
//! Tracks are externally-managed metadata rows; the queue only references
//! them by id. Media storage is not handled here.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

/// Track metadata row
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
    pub filename: String,
    pub mime_type: String,
    pub uploaded_at: Option<DateTime<Utc>>,
}

type TrackRow = (String, String, String, String, String, Option<DateTime<Utc>>);

fn from_row(row: TrackRow) -> Result<Track> {
    let id = Uuid::parse_str(&row.0)
        .map_err(|e| Error::Internal(format!("invalid track UUID in database: {}", e)))?;
    Ok(Track {
        id,
        title: row.1,
        artist: row.2,
        filename: row.3,
        mime_type: row.4,
        uploaded_at: row.5,
    })
}

const SELECT_COLUMNS: &str = "id, title, artist, filename, mime_type, uploaded_at";

/// Insert a new track and return it
pub async fn insert(
    pool: &Pool<Sqlite>,
    title: &str,
    artist: &str,
    filename: &str,
    mime_type: &str,
) -> Result<Track> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO tracks (id, title, artist, filename, mime_type) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(title)
    .bind(artist)
    .bind(filename)
    .bind(mime_type)
    .execute(pool)
    .await?;

    get(pool, id)
        .await?
        .ok_or_else(|| Error::Internal("track vanished after insert".to_string()))
}

/// Fetch a track by id
pub async fn get(pool: &Pool<Sqlite>, id: Uuid) -> Result<Option<Track>> {
    let row: Option<TrackRow> = sqlx::query_as(&format!(
        "SELECT {} FROM tracks WHERE id = ?",
        SELECT_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(from_row).transpose()
}

/// List tracks, newest first, optionally filtered by a case-insensitive
/// title/artist substring search
pub async fn list(pool: &Pool<Sqlite>, search: Option<&str>) -> Result<Vec<Track>> {
    let rows: Vec<TrackRow> = match search.filter(|q| !q.is_empty()) {
        Some(q) => {
            let like = format!("%{}%", q.to_lowercase());
            sqlx::query_as(&format!(
                "SELECT {} FROM tracks \
                 WHERE lower(title) LIKE ? OR lower(artist) LIKE ? \
                 ORDER BY uploaded_at DESC",
                SELECT_COLUMNS
            ))
            .bind(&like)
            .bind(&like)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as(&format!(
                "SELECT {} FROM tracks ORDER BY uploaded_at DESC",
                SELECT_COLUMNS
            ))
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter().map(from_row).collect()
}

/// Delete a track row, returning whether it existed
pub async fn delete(pool: &Pool<Sqlite>, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tracks WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
