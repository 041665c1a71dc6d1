//! User account persistence

use crate::auth::Role;
use crate::error::{Error, Result};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

/// Stored user account
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// Look up a user by username
pub async fn find_by_username(pool: &Pool<Sqlite>, username: &str) -> Result<Option<User>> {
    let row: Option<(String, String, String, String)> = sqlx::query_as(
        "SELECT id, username, password_hash, role FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    row.map(|(id, username, password_hash, role)| {
        let id = Uuid::parse_str(&id)
            .map_err(|e| Error::Internal(format!("invalid user UUID in database: {}", e)))?;
        Ok(User {
            id,
            username,
            password_hash,
            role: Role::from_str_lossy(&role),
        })
    })
    .transpose()
}

/// Insert a user account
pub async fn insert(
    pool: &Pool<Sqlite>,
    id: Uuid,
    username: &str,
    password_hash: &str,
    role: Role,
) -> Result<()> {
    sqlx::query("INSERT INTO users (id, username, password_hash, role) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_memory, init};

    #[tokio::test]
    async fn test_insert_and_find() {
        let pool = connect_memory().await.unwrap();
        init::create_schema(&pool).await.unwrap();

        insert(&pool, Uuid::new_v4(), "alice", "hash", Role::Host)
            .await
            .unwrap();

        let user = find_by_username(&pool, "alice").await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, Role::Host);

        assert!(find_by_username(&pool, "bob").await.unwrap().is_none());
    }
}
