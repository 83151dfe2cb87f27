//! User registry operations

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;

/// One registry row. Timestamps are stored as RFC 3339 text.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_seen: String,
    pub last_seen: String,
}

/// User registry repository
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record that a user was seen. Returns `true` when this is the first
    /// time the user id appears; existing users get their `last_seen`
    /// touched (and username refreshed, when one is supplied).
    pub async fn mark_seen(&self, user_id: i64, username: Option<&str>) -> Result<bool> {
        let now = Utc::now().to_rfc3339();

        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT user_id FROM users WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;

        if existing.is_some() {
            sqlx::query(
                r#"
                UPDATE users
                SET last_seen = ?, username = COALESCE(?, username)
                WHERE user_id = ?
                "#,
            )
            .bind(&now)
            .bind(username)
            .bind(user_id)
            .execute(self.pool)
            .await?;

            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, first_seen, last_seen)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        tracing::info!(user_id = user_id, "New user registered");

        Ok(true)
    }

    /// Total number of unique users seen so far
    pub async fn total_count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// All registry rows, oldest first. This is the export payload.
    pub async fn list_all(&self) -> Result<Vec<UserRecord>> {
        let users = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT user_id, username, first_seen, last_seen
            FROM users
            ORDER BY first_seen, user_id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }
}
