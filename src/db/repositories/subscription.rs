//! Subscription repository
//!
//! Follower → author rows. The followed authors are returned as `User`s so
//! the service can build subscription projections from them.

use super::user::{row_to_user_mysql, row_to_user_sqlite};
use crate::db::pool::{backend, Backend};
use crate::db::DynDatabasePool;
use crate::models::{ListParams, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Subscription repository trait
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Subscribe `user_id` to `author_id`. Returns false when already subscribed.
    async fn add(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Unsubscribe. Returns false when there was no subscription.
    async fn remove(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Check whether `user_id` follows `author_id`
    async fn exists(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Authors followed by `user_id`, ordered by id, with the total count
    async fn list_authors(&self, user_id: i64, params: &ListParams) -> Result<(Vec<User>, i64)>;
}

/// SQLx-based subscription repository implementation
pub struct SqlxSubscriptionRepository {
    pool: DynDatabasePool,
}

impl SqlxSubscriptionRepository {
    /// Create a new SQLx subscription repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubscriptionRepository> {
        Arc::new(Self::new(pool))
    }
}

const LIST_AUTHORS_SQL: &str = r#"
    SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.password_hash, u.created_at
    FROM subscriptions s
    INNER JOIN users u ON u.id = s.author_id
    WHERE s.user_id = ?
    ORDER BY u.id
    LIMIT ? OFFSET ?
"#;

const COUNT_AUTHORS_SQL: &str = "SELECT COUNT(*) AS count FROM subscriptions WHERE user_id = ?";

#[async_trait]
impl SubscriptionRepository for SqlxSubscriptionRepository {
    async fn add(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let affected = match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                sqlx::query("INSERT OR IGNORE INTO subscriptions (user_id, author_id) VALUES (?, ?)")
                    .bind(user_id)
                    .bind(author_id)
                    .execute(pool)
                    .await
                    .context("Failed to create subscription")?
                    .rows_affected()
            }
            Backend::Mysql(pool) => {
                sqlx::query("INSERT IGNORE INTO subscriptions (user_id, author_id) VALUES (?, ?)")
                    .bind(user_id)
                    .bind(author_id)
                    .execute(pool)
                    .await
                    .context("Failed to create subscription")?
                    .rows_affected()
            }
        };
        Ok(affected > 0)
    }

    async fn remove(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let sql = "DELETE FROM subscriptions WHERE user_id = ? AND author_id = ?";
        let affected = match backend(&self.pool)? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(user_id)
                .bind(author_id)
                .execute(pool)
                .await
                .context("Failed to delete subscription")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(user_id)
                .bind(author_id)
                .execute(pool)
                .await
                .context("Failed to delete subscription")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn exists(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM subscriptions WHERE user_id = ? AND author_id = ?";
        let count: i64 = match backend(&self.pool)? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(user_id)
                .bind(author_id)
                .fetch_one(pool)
                .await
                .context("Failed to check subscription")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(user_id)
                .bind(author_id)
                .fetch_one(pool)
                .await
                .context("Failed to check subscription")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn list_authors(&self, user_id: i64, params: &ListParams) -> Result<(Vec<User>, i64)> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(LIST_AUTHORS_SQL)
                    .bind(user_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list subscriptions")?;
                let total: i64 = sqlx::query(COUNT_AUTHORS_SQL)
                    .bind(user_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count subscriptions")?
                    .get("count");
                Ok((rows.iter().map(row_to_user_sqlite).collect(), total))
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(LIST_AUTHORS_SQL)
                    .bind(user_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list subscriptions")?;
                let total: i64 = sqlx::query(COUNT_AUTHORS_SQL)
                    .bind(user_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count subscriptions")?
                    .get("count");
                Ok((rows.iter().map(row_to_user_mysql).collect(), total))
            }
        }
    }
}
