//! Database initialization
//!
//! Creates the schema on startup and seeds the rows the service expects:
//! the singleton playback row and the configured admin account. All steps
//! are idempotent so restarts are safe.

use crate::auth::Role;
use crate::config::AuthConfig;
use crate::error::Result;
use sqlx::{Pool, Sqlite};
use tracing::info;
use uuid::Uuid;

/// Create all tables if they do not exist
pub async fn create_schema(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT NOT NULL DEFAULT 'Unknown',
            filename TEXT UNIQUE NOT NULL,
            mime_type TEXT NOT NULL,
            uploaded_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queue (
            id TEXT PRIMARY KEY,
            track_id TEXT NOT NULL,
            added_by TEXT NOT NULL,
            position INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playback_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            is_playing INTEGER NOT NULL DEFAULT 0,
            current_track_id TEXT,
            position_seconds REAL NOT NULL DEFAULT 0,
            volume REAL NOT NULL DEFAULT 1,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed the admin account if missing
pub async fn seed_admin(pool: &Pool<Sqlite>, auth: &AuthConfig) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
        .bind(&auth.admin_username)
        .fetch_one(pool)
        .await?;

    if !exists {
        let password_hash = bcrypt::hash(&auth.admin_password, bcrypt::DEFAULT_COST)
            .map_err(|e| crate::error::Error::Internal(format!("bcrypt failure: {}", e)))?;
        super::users::insert(pool, Uuid::new_v4(), &auth.admin_username, &password_hash, Role::Admin)
            .await?;
        info!("Seeded admin account '{}'", auth.admin_username);
    }

    Ok(())
}

/// Seed the singleton playback row with default values if missing
pub async fn seed_playback_state(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO playback_state (id) VALUES (1)")
        .execute(pool)
        .await?;
    Ok(())
}

/// Complete startup initialization: schema plus seed rows
pub async fn initialize_database(pool: &Pool<Sqlite>, auth: &AuthConfig) -> Result<()> {
    info!("Initializing database structures");
    create_schema(pool).await?;
    seed_admin(pool, auth).await?;
    seed_playback_state(pool).await?;
    info!("Database initialization complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::db::connect_memory;

    #[tokio::test]
    async fn test_initialize_idempotent() {
        let pool = connect_memory().await.unwrap();
        let auth = AuthConfig::default();

        initialize_database(&pool, &auth).await.unwrap();
        initialize_database(&pool, &auth).await.unwrap();

        let admin_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = 'admin'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(admin_count, 1);

        let playback_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM playback_state")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(playback_count, 1);
    }

    #[tokio::test]
    async fn test_playback_row_defaults() {
        let pool = connect_memory().await.unwrap();
        create_schema(&pool).await.unwrap();
        seed_playback_state(&pool).await.unwrap();

        let (is_playing, volume): (bool, f64) =
            sqlx::query_as("SELECT is_playing, volume FROM playback_state WHERE id = 1")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(!is_playing);
        assert_eq!(volume, 1.0);
    }
}
