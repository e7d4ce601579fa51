//! Ingredient repository
//!
//! Read access to the ingredient catalogue plus the bulk import used by
//! `import_data`.

use crate::db::pool::{backend, Backend};
use crate::db::DynDatabasePool;
use crate::models::{Ingredient, NewIngredient};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row, Sqlite, SqlitePool};
use std::sync::Arc;

/// Ingredient repository trait
#[async_trait]
pub trait IngredientRepository: Send + Sync {
    /// List ingredients ordered by name, optionally filtered by a
    /// case-insensitive name prefix
    async fn list(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>>;

    /// Get ingredient by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Ingredient>>;

    /// Which of the given ids exist
    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;

    /// Insert ingredients, skipping (name, unit) pairs that already exist.
    /// Returns the number of inserted rows.
    async fn import(&self, ingredients: &[NewIngredient]) -> Result<u64>;
}

/// SQLx-based ingredient repository implementation
pub struct SqlxIngredientRepository {
    pool: DynDatabasePool,
}

impl SqlxIngredientRepository {
    /// Create a new SQLx ingredient repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn IngredientRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl IngredientRepository for SqlxIngredientRepository {
    async fn list(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => list_ingredients_sqlite(pool, name_prefix).await,
            Backend::Mysql(pool) => list_ingredients_mysql(pool, name_prefix).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Ingredient>> {
        let sql = "SELECT id, name, measurement_unit FROM ingredients WHERE id = ?";
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get ingredient by ID")?;
                Ok(row.as_ref().map(row_to_ingredient_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get ingredient by ID")?;
                Ok(row.as_ref().map(row_to_ingredient_mysql))
            }
        }
    }

    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                let mut builder: QueryBuilder<Sqlite> =
                    QueryBuilder::new("SELECT id FROM ingredients WHERE id IN (");
                let mut separated = builder.separated(", ");
                for id in ids {
                    separated.push_bind(*id);
                }
                separated.push_unseparated(")");

                let rows = builder
                    .build()
                    .fetch_all(pool)
                    .await
                    .context("Failed to check ingredient ids")?;
                Ok(rows.iter().map(|row| row.get("id")).collect())
            }
            Backend::Mysql(pool) => {
                let mut builder: QueryBuilder<MySql> =
                    QueryBuilder::new("SELECT id FROM ingredients WHERE id IN (");
                let mut separated = builder.separated(", ");
                for id in ids {
                    separated.push_bind(*id);
                }
                separated.push_unseparated(")");

                let rows = builder
                    .build()
                    .fetch_all(pool)
                    .await
                    .context("Failed to check ingredient ids")?;
                Ok(rows.iter().map(|row| row.get("id")).collect())
            }
        }
    }

    async fn import(&self, ingredients: &[NewIngredient]) -> Result<u64> {
        let mut inserted = 0;
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                let mut tx = pool.begin().await.context("Failed to start transaction")?;
                for ingredient in ingredients {
                    inserted += sqlx::query(
                        "INSERT OR IGNORE INTO ingredients (name, measurement_unit) VALUES (?, ?)",
                    )
                    .bind(&ingredient.name)
                    .bind(&ingredient.measurement_unit)
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("Failed to import ingredient: {}", ingredient.name))?
                    .rows_affected();
                }
                tx.commit().await.context("Failed to commit ingredient import")?;
            }
            Backend::Mysql(pool) => {
                let mut tx = pool.begin().await.context("Failed to start transaction")?;
                for ingredient in ingredients {
                    inserted += sqlx::query(
                        "INSERT IGNORE INTO ingredients (name, measurement_unit) VALUES (?, ?)",
                    )
                    .bind(&ingredient.name)
                    .bind(&ingredient.measurement_unit)
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("Failed to import ingredient: {}", ingredient.name))?
                    .rows_affected();
                }
                tx.commit().await.context("Failed to commit ingredient import")?;
            }
        }
        Ok(inserted)
    }
}

/// Case-insensitive prefix test that also folds non-ASCII letters
fn has_prefix(name: &str, prefix_lower: &str) -> bool {
    name.to_lowercase().starts_with(prefix_lower)
}

/// Escape LIKE wildcards so the prefix matches literally
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_ingredients_sqlite(
    pool: &SqlitePool,
    name_prefix: Option<&str>,
) -> Result<Vec<Ingredient>> {
    let rows = sqlx::query("SELECT id, name, measurement_unit FROM ingredients ORDER BY name, measurement_unit")
        .fetch_all(pool)
        .await
        .context("Failed to list ingredients")?;

    let ingredients = rows.iter().map(row_to_ingredient_sqlite);

    // SQLite's LIKE and LOWER only fold ASCII, so Cyrillic names are
    // filtered here.
    Ok(match name_prefix {
        Some(prefix) => {
            let prefix = prefix.to_lowercase();
            ingredients.filter(|i| has_prefix(&i.name, &prefix)).collect()
        }
        None => ingredients.collect(),
    })
}

fn row_to_ingredient_sqlite(row: &sqlx::sqlite::SqliteRow) -> Ingredient {
    Ingredient {
        id: row.get("id"),
        name: row.get("name"),
        measurement_unit: row.get("measurement_unit"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_ingredients_mysql(
    pool: &MySqlPool,
    name_prefix: Option<&str>,
) -> Result<Vec<Ingredient>> {
    let rows = match name_prefix {
        Some(prefix) => {
            sqlx::query(
                r#"
                SELECT id, name, measurement_unit FROM ingredients
                WHERE name LIKE ?
                ORDER BY name, measurement_unit
                "#,
            )
            .bind(format!("{}%", escape_like(prefix)))
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query("SELECT id, name, measurement_unit FROM ingredients ORDER BY name, measurement_unit")
                .fetch_all(pool)
                .await
        }
    }
    .context("Failed to list ingredients")?;

    Ok(rows.iter().map(row_to_ingredient_mysql).collect())
}

fn row_to_ingredient_mysql(row: &sqlx::mysql::MySqlRow) -> Ingredient {
    Ingredient {
        id: row.get("id"),
        name: row.get("name"),
        measurement_unit: row.get("measurement_unit"),
    }
}
