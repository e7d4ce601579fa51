//! Favorites and shopping cart repository
//!
//! Both relations are (user, recipe) presence rows with a unique pair, so
//! one repository serves them, parameterized by `RecipeListKind`.

use crate::db::pool::{backend, Backend};
use crate::db::DynDatabasePool;
use crate::models::RecipeListKind;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Favorites / shopping cart repository trait
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    /// Add a recipe to the user's list. Returns false when it was already there.
    async fn add(&self, kind: RecipeListKind, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Remove a recipe from the user's list. Returns false when it was absent.
    async fn remove(&self, kind: RecipeListKind, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Check whether the recipe is in the user's list
    async fn contains(&self, kind: RecipeListKind, user_id: i64, recipe_id: i64) -> Result<bool>;
}

/// SQLx-based collection repository implementation
pub struct SqlxCollectionRepository {
    pool: DynDatabasePool,
}

impl SqlxCollectionRepository {
    /// Create a new SQLx collection repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CollectionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CollectionRepository for SqlxCollectionRepository {
    async fn add(&self, kind: RecipeListKind, user_id: i64, recipe_id: i64) -> Result<bool> {
        let affected = match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                let sql = format!(
                    "INSERT OR IGNORE INTO {} (user_id, recipe_id) VALUES (?, ?)",
                    kind.table()
                );
                sqlx::query(&sql)
                    .bind(user_id)
                    .bind(recipe_id)
                    .execute(pool)
                    .await
                    .with_context(|| format!("Failed to add recipe to {}", kind.table()))?
                    .rows_affected()
            }
            Backend::Mysql(pool) => {
                let sql = format!(
                    "INSERT IGNORE INTO {} (user_id, recipe_id) VALUES (?, ?)",
                    kind.table()
                );
                sqlx::query(&sql)
                    .bind(user_id)
                    .bind(recipe_id)
                    .execute(pool)
                    .await
                    .with_context(|| format!("Failed to add recipe to {}", kind.table()))?
                    .rows_affected()
            }
        };
        Ok(affected > 0)
    }

    async fn remove(&self, kind: RecipeListKind, user_id: i64, recipe_id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE user_id = ? AND recipe_id = ?", kind.table());
        let affected = match backend(&self.pool)? {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(user_id)
                .bind(recipe_id)
                .execute(pool)
                .await
                .with_context(|| format!("Failed to remove recipe from {}", kind.table()))?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(user_id)
                .bind(recipe_id)
                .execute(pool)
                .await
                .with_context(|| format!("Failed to remove recipe from {}", kind.table()))?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn contains(&self, kind: RecipeListKind, user_id: i64, recipe_id: i64) -> Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) AS count FROM {} WHERE user_id = ? AND recipe_id = ?",
            kind.table()
        );
        let count: i64 = match backend(&self.pool)? {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(user_id)
                .bind(recipe_id)
                .fetch_one(pool)
                .await
                .with_context(|| format!("Failed to check {}", kind.table()))?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(user_id)
                .bind(recipe_id)
                .fetch_one(pool)
                .await
                .with_context(|| format!("Failed to check {}", kind.table()))?
                .get("count"),
        };
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (SqlxCollectionRepository, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap();

        let user = sqlx::query("INSERT INTO users (email, username, first_name, last_name, password_hash) VALUES ('a@b.c', 'cook', 'A', 'B', 'h')")
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();
        let recipe = sqlx::query("INSERT INTO recipes (name, author_id, image, text, cooking_time) VALUES ('Омлет', ?, 'img', 'text', 10)")
            .bind(user)
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();

        (SqlxCollectionRepository::new(pool.clone()), user, recipe)
    }

    #[tokio::test]
    async fn test_add_is_unique_per_pair() {
        let (repo, user, recipe) = setup().await;

        assert!(repo.add(RecipeListKind::Favorites, user, recipe).await.unwrap());
        assert!(!repo.add(RecipeListKind::Favorites, user, recipe).await.unwrap());
        assert!(repo.contains(RecipeListKind::Favorites, user, recipe).await.unwrap());
    }

    #[tokio::test]
    async fn test_lists_are_independent() {
        let (repo, user, recipe) = setup().await;

        repo.add(RecipeListKind::ShoppingCart, user, recipe).await.unwrap();

        assert!(repo.contains(RecipeListKind::ShoppingCart, user, recipe).await.unwrap());
        assert!(!repo.contains(RecipeListKind::Favorites, user, recipe).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove() {
        let (repo, user, recipe) = setup().await;
        repo.add(RecipeListKind::ShoppingCart, user, recipe).await.unwrap();

        assert!(repo.remove(RecipeListKind::ShoppingCart, user, recipe).await.unwrap());
        assert!(!repo.remove(RecipeListKind::ShoppingCart, user, recipe).await.unwrap());
        assert!(!repo.contains(RecipeListKind::ShoppingCart, user, recipe).await.unwrap());
    }
}
