//! Database access layer
//!
//! SQLite via sqlx. Schema creation and seeding live in [`init`]; row-level
//! helpers for the track catalog and user accounts live in their own modules.
//! Queue and playback persistence is owned by the stores that cache them.

pub mod init;
pub mod tracks;
pub mod users;

use crate::error::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Open the SQLite database, creating the file if needed
pub async fn connect(database_path: &Path) -> Result<SqlitePool> {
    let db_url = format!("sqlite:{}?mode=rwc", database_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&db_url)
        .await?;

    info!("Connected to database: {:?}", database_path);
    Ok(pool)
}

/// In-memory pool, used by tests
///
/// Single connection: each SQLite `:memory:` connection is its own database.
pub async fn connect_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    Ok(pool)
}
