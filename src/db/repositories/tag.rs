//! Tag repository
//!
//! Read access to the tag catalogue, recipe tag sets and the bulk import
//! used by `import_data`. Recipe tag rows themselves are written by the
//! recipe repository inside its write transaction.

use crate::db::pool::{backend, Backend};
use crate::db::DynDatabasePool;
use crate::models::{NewTag, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row, Sqlite, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Tags attached to a recipe, ordered by name
    async fn list_by_recipe(&self, recipe_id: i64) -> Result<Vec<Tag>>;

    /// Which of the given ids exist
    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;

    /// Insert tags, skipping ones that collide with an existing row.
    /// Returns the number of inserted rows.
    async fn import(&self, tags: &[NewTag]) -> Result<u64>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn list(&self) -> Result<Vec<Tag>> {
        let sql = "SELECT id, name, slug, color FROM tags ORDER BY name";
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list tags")?;
                Ok(rows.iter().map(row_to_tag_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list tags")?;
                Ok(rows.iter().map(row_to_tag_mysql).collect())
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let sql = "SELECT id, name, slug, color FROM tags WHERE id = ?";
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get tag by ID")?;
                Ok(row.as_ref().map(row_to_tag_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get tag by ID")?;
                Ok(row.as_ref().map(row_to_tag_mysql))
            }
        }
    }

    async fn list_by_recipe(&self, recipe_id: i64) -> Result<Vec<Tag>> {
        let sql = r#"
            SELECT t.id, t.name, t.slug, t.color
            FROM tags t
            INNER JOIN recipe_tags rt ON t.id = rt.tag_id
            WHERE rt.recipe_id = ?
            ORDER BY t.name
        "#;
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .bind(recipe_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get tags by recipe")?;
                Ok(rows.iter().map(row_to_tag_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .bind(recipe_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get tags by recipe")?;
                Ok(rows.iter().map(row_to_tag_mysql).collect())
            }
        }
    }

    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => existing_tag_ids_sqlite(pool, ids).await,
            Backend::Mysql(pool) => existing_tag_ids_mysql(pool, ids).await,
        }
    }

    async fn import(&self, tags: &[NewTag]) -> Result<u64> {
        let mut inserted = 0;
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                for tag in tags {
                    inserted += sqlx::query(
                        "INSERT OR IGNORE INTO tags (name, slug, color) VALUES (?, ?, ?)",
                    )
                    .bind(&tag.name)
                    .bind(&tag.slug)
                    .bind(&tag.color)
                    .execute(pool)
                    .await
                    .with_context(|| format!("Failed to import tag: {}", tag.slug))?
                    .rows_affected();
                }
            }
            Backend::Mysql(pool) => {
                for tag in tags {
                    inserted += sqlx::query(
                        "INSERT IGNORE INTO tags (name, slug, color) VALUES (?, ?, ?)",
                    )
                    .bind(&tag.name)
                    .bind(&tag.slug)
                    .bind(&tag.color)
                    .execute(pool)
                    .await
                    .with_context(|| format!("Failed to import tag: {}", tag.slug))?
                    .rows_affected();
                }
            }
        }
        Ok(inserted)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn existing_tag_ids_sqlite(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<i64>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT id FROM tags WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let rows = builder
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to check tag ids")?;
    Ok(rows.iter().map(|row| row.get("id")).collect())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        color: row.get("color"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn existing_tag_ids_mysql(pool: &MySqlPool, ids: &[i64]) -> Result<Vec<i64>> {
    let mut builder: QueryBuilder<MySql> = QueryBuilder::new("SELECT id FROM tags WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let rows = builder
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to check tag ids")?;
    Ok(rows.iter().map(|row| row.get("id")).collect())
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        color: row.get("color"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxTagRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxTagRepository::new(pool.clone());
        (pool, repo)
    }

    fn new_tag(name: &str, slug: &str, color: &str) -> NewTag {
        NewTag {
            name: name.to_string(),
            slug: slug.to_string(),
            color: color.to_string(),
        }
    }

    fn catalogue() -> Vec<NewTag> {
        vec![
            new_tag("Завтрак", "breakfast", "#E26C2D"),
            new_tag("Обед", "lunch", "#49B64E"),
            new_tag("Ужин", "dinner", "#8775D2"),
        ]
    }

    #[tokio::test]
    async fn test_import_and_list_tags() {
        let (_pool, repo) = setup_test_repo().await;

        let inserted = repo.import(&catalogue()).await.expect("Failed to import tags");
        assert_eq!(inserted, 3);

        let tags = repo.list().await.unwrap();
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Завтрак", "Обед", "Ужин"]);
    }

    #[tokio::test]
    async fn test_import_skips_existing() {
        let (_pool, repo) = setup_test_repo().await;
        repo.import(&catalogue()).await.unwrap();

        let mut again = catalogue();
        again.push(new_tag("Десерт", "dessert", "#FFD700"));
        let inserted = repo.import(&again).await.unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(repo.list().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_get_tag_by_id() {
        let (_pool, repo) = setup_test_repo().await;
        repo.import(&catalogue()).await.unwrap();
        let first = repo.list().await.unwrap().remove(0);

        let found = repo.get_by_id(first.id).await.unwrap();
        assert_eq!(found, Some(first));
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_existing_ids() {
        let (_pool, repo) = setup_test_repo().await;
        repo.import(&catalogue()).await.unwrap();
        let ids: Vec<i64> = repo.list().await.unwrap().iter().map(|t| t.id).collect();

        let mut found = repo.existing_ids(&[ids[0], ids[2], 999]).await.unwrap();
        found.sort();
        let mut expected = vec![ids[0], ids[2]];
        expected.sort();
        assert_eq!(found, expected);

        assert!(repo.existing_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_recipe() {
        let (pool, repo) = setup_test_repo().await;
        repo.import(&catalogue()).await.unwrap();
        let tags = repo.list().await.unwrap();
        let sqlite = pool.as_sqlite().unwrap();

        let author = sqlx::query("INSERT INTO users (email, username, first_name, last_name, password_hash) VALUES ('a@b.c', 'cook', 'A', 'B', 'h')")
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();
        let recipe = sqlx::query("INSERT INTO recipes (name, author_id, image, text, cooking_time) VALUES ('Омлет', ?, 'img', 'text', 10)")
            .bind(author)
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe)
            .bind(tags[2].id)
            .execute(sqlite)
            .await
            .unwrap();

        let attached = repo.list_by_recipe(recipe).await.unwrap();
        assert_eq!(attached, vec![tags[2].clone()]);
    }
}
