//! Recipe repository
//!
//! Owns the recipe write transaction: the recipe row, its ingredient
//! amounts and its tag set are written together or not at all. Also
//! serves the filtered recipe list and the shopping list aggregation.

use crate::db::pool::{backend, Backend};
use crate::db::DynDatabasePool;
use crate::models::{ListParams, Recipe, RecipeDraft, RecipeFilter, RecipeIngredient, ShoppingListItem};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, MySqlConnection, MySqlPool, QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use std::sync::Arc;

/// Recipe repository trait
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Insert a recipe with its ingredients and tags in one transaction
    async fn create(&self, author_id: i64, draft: &RecipeDraft) -> Result<Recipe>;

    /// Replace a recipe's fields, ingredients and tags in one transaction.
    /// `pub_date` is left untouched.
    async fn update(&self, id: i64, draft: &RecipeDraft) -> Result<Recipe>;

    /// Delete a recipe, returning whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Get recipe by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>>;

    /// Filtered list, newest first, with the total count of matches
    async fn list(&self, filter: &RecipeFilter, params: &ListParams) -> Result<(Vec<Recipe>, i64)>;

    /// An author's recipes, newest first, optionally truncated
    async fn list_by_author(&self, author_id: i64, limit: Option<i64>) -> Result<Vec<Recipe>>;

    /// Number of recipes written by an author
    async fn count_by_author(&self, author_id: i64) -> Result<i64>;

    /// Ingredient amounts of a recipe, ordered by ingredient name
    async fn list_ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>>;

    /// Sum of ingredient amounts over every recipe in the user's cart,
    /// grouped by (name, unit) and ordered by name then unit
    async fn shopping_list(&self, user_id: i64) -> Result<Vec<ShoppingListItem>>;
}

/// SQLx-based recipe repository implementation
pub struct SqlxRecipeRepository {
    pool: DynDatabasePool,
}

impl SqlxRecipeRepository {
    /// Create a new SQLx recipe repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RecipeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RecipeRepository for SqlxRecipeRepository {
    async fn create(&self, author_id: i64, draft: &RecipeDraft) -> Result<Recipe> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => create_recipe_sqlite(pool, author_id, draft).await,
            Backend::Mysql(pool) => create_recipe_mysql(pool, author_id, draft).await,
        }
    }

    async fn update(&self, id: i64, draft: &RecipeDraft) -> Result<Recipe> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => update_recipe_sqlite(pool, id, draft).await,
            Backend::Mysql(pool) => update_recipe_mysql(pool, id, draft).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match backend(&self.pool)? {
            Backend::Sqlite(pool) => sqlx::query("DELETE FROM recipes WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete recipe")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query("DELETE FROM recipes WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete recipe")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => get_recipe_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_recipe_mysql(pool, id).await,
        }
    }

    async fn list(&self, filter: &RecipeFilter, params: &ListParams) -> Result<(Vec<Recipe>, i64)> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => list_recipes_sqlite(pool, filter, params).await,
            Backend::Mysql(pool) => list_recipes_mysql(pool, filter, params).await,
        }
    }

    async fn list_by_author(&self, author_id: i64, limit: Option<i64>) -> Result<Vec<Recipe>> {
        let sql = format!(
            "SELECT {} FROM recipes r WHERE r.author_id = ? ORDER BY r.pub_date DESC, r.id DESC LIMIT ?",
            RECIPE_COLUMNS
        );
        let limit = limit.unwrap_or(i64::MAX).max(0);
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(author_id)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list recipes by author")?;
                Ok(rows.iter().map(row_to_recipe_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(author_id)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list recipes by author")?;
                Ok(rows.iter().map(row_to_recipe_mysql).collect())
            }
        }
    }

    async fn count_by_author(&self, author_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM recipes WHERE author_id = ?";
        let count = match backend(&self.pool)? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(author_id)
                .fetch_one(pool)
                .await
                .context("Failed to count recipes by author")?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(author_id)
                .fetch_one(pool)
                .await
                .context("Failed to count recipes by author")?
                .get("count"),
        };
        Ok(count)
    }

    async fn list_ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>> {
        let sql = r#"
            SELECT i.id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ?
            ORDER BY i.name, i.measurement_unit
        "#;
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .bind(recipe_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get recipe ingredients")?;
                Ok(rows
                    .iter()
                    .map(|row| RecipeIngredient {
                        id: row.get("id"),
                        name: row.get("name"),
                        measurement_unit: row.get("measurement_unit"),
                        amount: row.get("amount"),
                    })
                    .collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .bind(recipe_id)
                    .fetch_all(pool)
                    .await
                    .context("Failed to get recipe ingredients")?;
                Ok(rows
                    .iter()
                    .map(|row| RecipeIngredient {
                        id: row.get("id"),
                        name: row.get("name"),
                        measurement_unit: row.get("measurement_unit"),
                        amount: row.get("amount"),
                    })
                    .collect())
            }
        }
    }

    async fn shopping_list(&self, user_id: i64) -> Result<Vec<ShoppingListItem>> {
        match backend(&self.pool)? {
            Backend::Sqlite(pool) => shopping_list_sqlite(pool, user_id).await,
            Backend::Mysql(pool) => shopping_list_mysql(pool, user_id).await,
        }
    }
}

const RECIPE_COLUMNS: &str = "r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_recipe_sqlite(pool: &SqlitePool, author_id: i64, draft: &RecipeDraft) -> Result<Recipe> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let recipe_id = sqlx::query(
        r#"
        INSERT INTO recipes (name, author_id, image, text, cooking_time, pub_date)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&draft.name)
    .bind(author_id)
    .bind(&draft.image)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .context("Failed to create recipe")?
    .last_insert_rowid();

    insert_recipe_links_sqlite(&mut tx, recipe_id, draft).await?;

    tx.commit().await.context("Failed to commit recipe")?;

    get_recipe_sqlite(pool, recipe_id)
        .await?
        .ok_or_else(|| anyhow!("Recipe not found after insert"))
}

async fn update_recipe_sqlite(pool: &SqlitePool, id: i64, draft: &RecipeDraft) -> Result<Recipe> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    sqlx::query("UPDATE recipes SET name = ?, image = ?, text = ?, cooking_time = ? WHERE id = ?")
        .bind(&draft.name)
        .bind(&draft.image)
        .bind(&draft.text)
        .bind(draft.cooking_time)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update recipe")?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe ingredients")?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe tags")?;

    insert_recipe_links_sqlite(&mut tx, id, draft).await?;

    tx.commit().await.context("Failed to commit recipe update")?;

    get_recipe_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow!("Recipe not found after update"))
}

async fn insert_recipe_links_sqlite(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    draft: &RecipeDraft,
) -> Result<()> {
    if !draft.ingredients.is_empty() {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
        builder.push_values(draft.ingredients.iter(), |mut b, item| {
            b.push_bind(recipe_id).push_bind(item.id).push_bind(item.amount);
        });
        builder
            .build()
            .execute(&mut *conn)
            .await
            .context("Failed to insert recipe ingredients")?;
    }

    if !draft.tags.is_empty() {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        builder.push_values(draft.tags.iter(), |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });
        builder
            .build()
            .execute(&mut *conn)
            .await
            .context("Failed to insert recipe tags")?;
    }

    Ok(())
}

async fn get_recipe_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Recipe>> {
    let sql = format!("SELECT {} FROM recipes r WHERE r.id = ?", RECIPE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get recipe by ID")?;

    Ok(row.as_ref().map(row_to_recipe_sqlite))
}

fn push_filter_sqlite<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a RecipeFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(author_id) = filter.author_id {
        builder.push(" AND r.author_id = ").push_bind(author_id);
    }

    if !filter.tags.is_empty() {
        builder.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug IN (",
        );
        let mut separated = builder.separated(", ");
        for slug in &filter.tags {
            separated.push_bind(slug.as_str());
        }
        separated.push_unseparated("))");
    }

    if let Some(user_id) = filter.favorited_by {
        builder
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(user_id)
            .push(")");
    }

    if let Some(user_id) = filter.in_cart_of {
        builder
            .push(" AND EXISTS (SELECT 1 FROM carts c WHERE c.recipe_id = r.id AND c.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
}

async fn list_recipes_sqlite(
    pool: &SqlitePool,
    filter: &RecipeFilter,
    params: &ListParams,
) -> Result<(Vec<Recipe>, i64)> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM recipes r", RECIPE_COLUMNS));
    push_filter_sqlite(&mut builder, filter);
    builder
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(params.limit())
        .push(" OFFSET ")
        .push_bind(params.offset());

    let rows = builder
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to list recipes")?;

    let mut count_builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT COUNT(*) AS count FROM recipes r");
    push_filter_sqlite(&mut count_builder, filter);
    let total: i64 = count_builder
        .build()
        .fetch_one(pool)
        .await
        .context("Failed to count recipes")?
        .get("count");

    Ok((rows.iter().map(row_to_recipe_sqlite).collect(), total))
}

async fn shopping_list_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<ShoppingListItem>> {
    let rows = sqlx::query(
        r#"
        SELECT i.name, i.measurement_unit, SUM(ri.amount) AS total
        FROM carts c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = ?
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name, i.measurement_unit
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to aggregate shopping list")?;

    Ok(rows
        .iter()
        .map(|row| ShoppingListItem {
            name: row.get("name"),
            measurement_unit: row.get("measurement_unit"),
            total: row.get("total"),
        })
        .collect())
}

fn row_to_recipe_sqlite(row: &sqlx::sqlite::SqliteRow) -> Recipe {
    Recipe {
        id: row.get("id"),
        author_id: row.get("author_id"),
        name: row.get("name"),
        image: row.get("image"),
        text: row.get("text"),
        cooking_time: row.get("cooking_time"),
        pub_date: row.get("pub_date"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_recipe_mysql(pool: &MySqlPool, author_id: i64, draft: &RecipeDraft) -> Result<Recipe> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let recipe_id = sqlx::query(
        r#"
        INSERT INTO recipes (name, author_id, image, text, cooking_time, pub_date)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&draft.name)
    .bind(author_id)
    .bind(&draft.image)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .context("Failed to create recipe")?
    .last_insert_id() as i64;

    insert_recipe_links_mysql(&mut tx, recipe_id, draft).await?;

    tx.commit().await.context("Failed to commit recipe")?;

    get_recipe_mysql(pool, recipe_id)
        .await?
        .ok_or_else(|| anyhow!("Recipe not found after insert"))
}

async fn update_recipe_mysql(pool: &MySqlPool, id: i64, draft: &RecipeDraft) -> Result<Recipe> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    sqlx::query("UPDATE recipes SET name = ?, image = ?, text = ?, cooking_time = ? WHERE id = ?")
        .bind(&draft.name)
        .bind(&draft.image)
        .bind(&draft.text)
        .bind(draft.cooking_time)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update recipe")?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe ingredients")?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe tags")?;

    insert_recipe_links_mysql(&mut tx, id, draft).await?;

    tx.commit().await.context("Failed to commit recipe update")?;

    get_recipe_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow!("Recipe not found after update"))
}

async fn insert_recipe_links_mysql(
    conn: &mut MySqlConnection,
    recipe_id: i64,
    draft: &RecipeDraft,
) -> Result<()> {
    if !draft.ingredients.is_empty() {
        let mut builder: QueryBuilder<MySql> =
            QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
        builder.push_values(draft.ingredients.iter(), |mut b, item| {
            b.push_bind(recipe_id).push_bind(item.id).push_bind(item.amount);
        });
        builder
            .build()
            .execute(&mut *conn)
            .await
            .context("Failed to insert recipe ingredients")?;
    }

    if !draft.tags.is_empty() {
        let mut builder: QueryBuilder<MySql> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        builder.push_values(draft.tags.iter(), |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });
        builder
            .build()
            .execute(&mut *conn)
            .await
            .context("Failed to insert recipe tags")?;
    }

    Ok(())
}

async fn get_recipe_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Recipe>> {
    let sql = format!("SELECT {} FROM recipes r WHERE r.id = ?", RECIPE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get recipe by ID")?;

    Ok(row.as_ref().map(row_to_recipe_mysql))
}

fn push_filter_mysql<'a>(builder: &mut QueryBuilder<'a, MySql>, filter: &'a RecipeFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(author_id) = filter.author_id {
        builder.push(" AND r.author_id = ").push_bind(author_id);
    }

    if !filter.tags.is_empty() {
        builder.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug IN (",
        );
        let mut separated = builder.separated(", ");
        for slug in &filter.tags {
            separated.push_bind(slug.as_str());
        }
        separated.push_unseparated("))");
    }

    if let Some(user_id) = filter.favorited_by {
        builder
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(user_id)
            .push(")");
    }

    if let Some(user_id) = filter.in_cart_of {
        builder
            .push(" AND EXISTS (SELECT 1 FROM carts c WHERE c.recipe_id = r.id AND c.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
}

async fn list_recipes_mysql(
    pool: &MySqlPool,
    filter: &RecipeFilter,
    params: &ListParams,
) -> Result<(Vec<Recipe>, i64)> {
    let mut builder: QueryBuilder<MySql> =
        QueryBuilder::new(format!("SELECT {} FROM recipes r", RECIPE_COLUMNS));
    push_filter_mysql(&mut builder, filter);
    builder
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(params.limit())
        .push(" OFFSET ")
        .push_bind(params.offset());

    let rows = builder
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to list recipes")?;

    let mut count_builder: QueryBuilder<MySql> =
        QueryBuilder::new("SELECT COUNT(*) AS count FROM recipes r");
    push_filter_mysql(&mut count_builder, filter);
    let total: i64 = count_builder
        .build()
        .fetch_one(pool)
        .await
        .context("Failed to count recipes")?
        .get("count");

    Ok((rows.iter().map(row_to_recipe_mysql).collect(), total))
}

async fn shopping_list_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<ShoppingListItem>> {
    // SUM over INT yields DECIMAL in MySQL
    let rows = sqlx::query(
        r#"
        SELECT i.name, i.measurement_unit, CAST(SUM(ri.amount) AS SIGNED) AS total
        FROM carts c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = ?
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name, i.measurement_unit
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to aggregate shopping list")?;

    Ok(rows
        .iter()
        .map(|row| ShoppingListItem {
            name: row.get("name"),
            measurement_unit: row.get("measurement_unit"),
            total: row.get("total"),
        })
        .collect())
}

fn row_to_recipe_mysql(row: &sqlx::mysql::MySqlRow) -> Recipe {
    Recipe {
        id: row.get("id"),
        author_id: row.get("author_id"),
        name: row.get("name"),
        image: row.get("image"),
        text: row.get("text"),
        cooking_time: row.get("cooking_time"),
        pub_date: row.get("pub_date"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::IngredientAmount;

    struct Fixture {
        pool: DynDatabasePool,
        repo: SqlxRecipeRepository,
        author: i64,
        ingredients: Vec<i64>,
        tags: Vec<i64>,
    }

    async fn insert_user(pool: &SqlitePool, username: &str) -> i64 {
        sqlx::query(
            "INSERT INTO users (email, username, first_name, last_name, password_hash) VALUES (?, ?, 'A', 'B', 'h')",
        )
        .bind(format!("{}@example.com", username))
        .bind(username)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap();

        let author = insert_user(sqlite, "cook").await;

        let mut ingredients = Vec::new();
        for (name, unit) in [("Флора", "g"), ("мука", "г"), ("яйца", "шт.")] {
            let id = sqlx::query("INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?)")
                .bind(name)
                .bind(unit)
                .execute(sqlite)
                .await
                .unwrap()
                .last_insert_rowid();
            ingredients.push(id);
        }

        let mut tags = Vec::new();
        for (name, slug, color) in [
            ("Завтрак", "breakfast", "#E26C2D"),
            ("Обед", "lunch", "#49B64E"),
        ] {
            let id = sqlx::query("INSERT INTO tags (name, slug, color) VALUES (?, ?, ?)")
                .bind(name)
                .bind(slug)
                .bind(color)
                .execute(sqlite)
                .await
                .unwrap()
                .last_insert_rowid();
            tags.push(id);
        }

        let repo = SqlxRecipeRepository::new(pool.clone());
        Fixture {
            pool,
            repo,
            author,
            ingredients,
            tags,
        }
    }

    fn draft(name: &str, ingredients: Vec<(i64, i32)>, tags: Vec<i64>) -> RecipeDraft {
        RecipeDraft {
            name: name.to_string(),
            image: "data:image/png;base64,AAAA".to_string(),
            text: "Описание".to_string(),
            cooking_time: 15,
            ingredients: ingredients
                .into_iter()
                .map(|(id, amount)| IngredientAmount { id, amount })
                .collect(),
            tags,
        }
    }

    async fn tag_ids(pool: &DynDatabasePool, recipe_id: i64) -> Vec<i64> {
        sqlx::query("SELECT tag_id FROM recipe_tags WHERE recipe_id = ? ORDER BY tag_id")
            .bind(recipe_id)
            .fetch_all(pool.as_sqlite().unwrap())
            .await
            .unwrap()
            .iter()
            .map(|row| row.get("tag_id"))
            .collect()
    }

    #[tokio::test]
    async fn test_create_recipe_with_links() {
        let f = setup().await;
        let recipe = f
            .repo
            .create(
                f.author,
                &draft("Блины", vec![(f.ingredients[1], 200), (f.ingredients[2], 2)], vec![f.tags[0]]),
            )
            .await
            .expect("Failed to create recipe");

        assert!(recipe.id > 0);
        assert_eq!(recipe.author_id, f.author);
        assert_eq!(recipe.cooking_time, 15);

        let ingredients = f.repo.list_ingredients(recipe.id).await.unwrap();
        let amounts: Vec<(i64, i32)> = ingredients.iter().map(|i| (i.id, i.amount)).collect();
        assert_eq!(amounts, vec![(f.ingredients[1], 200), (f.ingredients[2], 2)]);
        assert_eq!(tag_ids(&f.pool, recipe.id).await, vec![f.tags[0]]);
    }

    #[tokio::test]
    async fn test_create_rolls_back_on_bad_reference() {
        let f = setup().await;

        let result = f
            .repo
            .create(f.author, &draft("Блины", vec![(9999, 1)], vec![f.tags[0]]))
            .await;
        assert!(result.is_err());

        let (recipes, total) = f
            .repo
            .list(&RecipeFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert!(recipes.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_update_replaces_links_and_keeps_pub_date() {
        let f = setup().await;
        let created = f
            .repo
            .create(
                f.author,
                &draft("Блины", vec![(f.ingredients[0], 100), (f.ingredients[1], 50)], vec![f.tags[0]]),
            )
            .await
            .unwrap();

        let mut next = draft("Оладьи", vec![(f.ingredients[2], 3)], vec![f.tags[1]]);
        next.cooking_time = 40;
        let updated = f.repo.update(created.id, &next).await.unwrap();

        assert_eq!(updated.name, "Оладьи");
        assert_eq!(updated.cooking_time, 40);
        assert_eq!(updated.pub_date, created.pub_date);

        let ingredients = f.repo.list_ingredients(created.id).await.unwrap();
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].id, f.ingredients[2]);
        assert_eq!(tag_ids(&f.pool, created.id).await, vec![f.tags[1]]);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_previous_links() {
        let f = setup().await;
        let created = f
            .repo
            .create(f.author, &draft("Блины", vec![(f.ingredients[0], 100)], vec![f.tags[0]]))
            .await
            .unwrap();

        let result = f
            .repo
            .update(created.id, &draft("Оладьи", vec![(9999, 3)], vec![f.tags[1]]))
            .await;
        assert!(result.is_err());

        let current = f.repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(current.name, "Блины");
        let ingredients = f.repo.list_ingredients(created.id).await.unwrap();
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].id, f.ingredients[0]);
        assert_eq!(tag_ids(&f.pool, created.id).await, vec![f.tags[0]]);
    }

    #[tokio::test]
    async fn test_delete_recipe() {
        let f = setup().await;
        let created = f
            .repo
            .create(f.author, &draft("Блины", vec![(f.ingredients[0], 100)], vec![f.tags[0]]))
            .await
            .unwrap();

        assert!(f.repo.delete(created.id).await.unwrap());
        assert!(!f.repo.delete(created.id).await.unwrap());
        assert!(f.repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(f.repo.list_ingredients(created.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let f = setup().await;
        let sqlite = f.pool.as_sqlite().unwrap();
        let other = insert_user(sqlite, "other").await;

        let breakfast = f
            .repo
            .create(f.author, &draft("Омлет", vec![(f.ingredients[2], 3)], vec![f.tags[0]]))
            .await
            .unwrap();
        let lunch = f
            .repo
            .create(f.author, &draft("Суп", vec![(f.ingredients[1], 30)], vec![f.tags[1]]))
            .await
            .unwrap();
        let foreign = f
            .repo
            .create(other, &draft("Каша", vec![(f.ingredients[1], 80)], vec![f.tags[0], f.tags[1]]))
            .await
            .unwrap();

        let (all, total) = f
            .repo
            .list(&RecipeFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 3);
        let ids: Vec<i64> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![foreign.id, lunch.id, breakfast.id]);

        let by_tag = RecipeFilter {
            tags: vec!["breakfast".to_string()],
            ..Default::default()
        };
        let (found, total) = f.repo.list(&by_tag, &ListParams::default()).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![foreign.id, breakfast.id]);

        let any_tag = RecipeFilter {
            tags: vec!["breakfast".to_string(), "lunch".to_string()],
            ..Default::default()
        };
        let (_, total) = f.repo.list(&any_tag, &ListParams::default()).await.unwrap();
        assert_eq!(total, 3);

        let by_author = RecipeFilter {
            author_id: Some(other),
            ..Default::default()
        };
        let (found, _) = f.repo.list(&by_author, &ListParams::default()).await.unwrap();
        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![foreign.id]);

        sqlx::query("INSERT INTO favorites (user_id, recipe_id) VALUES (?, ?)")
            .bind(other)
            .bind(lunch.id)
            .execute(sqlite)
            .await
            .unwrap();
        let favorited = RecipeFilter {
            favorited_by: Some(other),
            ..Default::default()
        };
        let (found, total) = f.repo.list(&favorited, &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].id, lunch.id);

        let in_cart = RecipeFilter {
            in_cart_of: Some(other),
            ..Default::default()
        };
        let (_, total) = f.repo.list(&in_cart, &ListParams::default()).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_list_by_author_with_limit() {
        let f = setup().await;
        for name in ["Первый", "Второй", "Третий"] {
            f.repo
                .create(f.author, &draft(name, vec![(f.ingredients[0], 1)], vec![f.tags[0]]))
                .await
                .unwrap();
        }

        assert_eq!(f.repo.count_by_author(f.author).await.unwrap(), 3);
        assert_eq!(f.repo.list_by_author(f.author, None).await.unwrap().len(), 3);

        let limited = f.repo.list_by_author(f.author, Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].name, "Третий");
    }

    #[tokio::test]
    async fn test_shopping_list_sums_across_cart() {
        let f = setup().await;
        let sqlite = f.pool.as_sqlite().unwrap();

        let first = f
            .repo
            .create(
                f.author,
                &draft("Пирог", vec![(f.ingredients[0], 100), (f.ingredients[1], 300)], vec![f.tags[0]]),
            )
            .await
            .unwrap();
        let second = f
            .repo
            .create(f.author, &draft("Торт", vec![(f.ingredients[0], 100)], vec![f.tags[1]]))
            .await
            .unwrap();
        f.repo
            .create(f.author, &draft("Не в корзине", vec![(f.ingredients[2], 5)], vec![f.tags[1]]))
            .await
            .unwrap();

        for recipe_id in [first.id, second.id] {
            sqlx::query("INSERT INTO carts (user_id, recipe_id) VALUES (?, ?)")
                .bind(f.author)
                .bind(recipe_id)
                .execute(sqlite)
                .await
                .unwrap();
        }

        let items = f.repo.shopping_list(f.author).await.unwrap();
        assert_eq!(
            items,
            vec![
                ShoppingListItem {
                    name: "Флора".to_string(),
                    measurement_unit: "g".to_string(),
                    total: 200,
                },
                ShoppingListItem {
                    name: "мука".to_string(),
                    measurement_unit: "г".to_string(),
                    total: 300,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_shopping_list_empty_cart() {
        let f = setup().await;
        assert!(f.repo.shopping_list(f.author).await.unwrap().is_empty());
    }
}
