//! Favorites and shopping cart service
//!
//! Adds and removes recipes from a user's favorites or cart and builds the
//! shopping list download from the cart.

use crate::db::repositories::{CollectionRepository, RecipeRepository};
use crate::models::{Recipe, RecipeListKind, ShoppingListItem, User};
use crate::services::shopping_list::render_shopping_list;
use anyhow::Context;
use std::sync::Arc;

/// Error types for favorites and cart operations
#[derive(Debug, thiserror::Error)]
pub enum CollectionServiceError {
    /// Duplicate add
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Missing recipe, or removing an absent entry
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

fn already_present(kind: RecipeListKind) -> &'static str {
    match kind {
        RecipeListKind::Favorites => "Рецепт уже в избранном",
        RecipeListKind::ShoppingCart => "Рецепт уже в корзине",
    }
}

fn not_present(kind: RecipeListKind) -> &'static str {
    match kind {
        RecipeListKind::Favorites => "Рецепта нет в избранном",
        RecipeListKind::ShoppingCart => "Рецепта нет в корзине",
    }
}

/// Favorites and shopping cart service
pub struct CollectionService {
    collections: Arc<dyn CollectionRepository>,
    recipes: Arc<dyn RecipeRepository>,
}

impl CollectionService {
    pub fn new(collections: Arc<dyn CollectionRepository>, recipes: Arc<dyn RecipeRepository>) -> Self {
        Self { collections, recipes }
    }

    /// Add a recipe to the user's list and return it
    pub async fn add(
        &self,
        user: &User,
        kind: RecipeListKind,
        recipe_id: i64,
    ) -> Result<Recipe, CollectionServiceError> {
        let recipe = self.find_recipe(recipe_id).await?;

        let added = self
            .collections
            .add(kind, user.id, recipe_id)
            .await
            .context("Failed to add recipe to list")?;
        if !added {
            return Err(CollectionServiceError::ValidationError(
                already_present(kind).to_string(),
            ));
        }

        tracing::debug!(user_id = user.id, recipe_id, list = kind.table(), "Recipe added");
        Ok(recipe)
    }

    /// Remove a recipe from the user's list
    pub async fn remove(
        &self,
        user: &User,
        kind: RecipeListKind,
        recipe_id: i64,
    ) -> Result<(), CollectionServiceError> {
        self.find_recipe(recipe_id).await?;

        let removed = self
            .collections
            .remove(kind, user.id, recipe_id)
            .await
            .context("Failed to remove recipe from list")?;
        if !removed {
            return Err(CollectionServiceError::NotFound(not_present(kind).to_string()));
        }

        tracing::debug!(user_id = user.id, recipe_id, list = kind.table(), "Recipe removed");
        Ok(())
    }

    /// Aggregated ingredient totals over the user's cart
    pub async fn shopping_list(&self, user: &User) -> Result<Vec<ShoppingListItem>, CollectionServiceError> {
        let items = self
            .recipes
            .shopping_list(user.id)
            .await
            .context("Failed to build shopping list")?;
        Ok(items)
    }

    /// The shopping list rendered as a plain-text attachment body
    pub async fn download_shopping_list(&self, user: &User) -> Result<String, CollectionServiceError> {
        let items = self.shopping_list(user).await?;
        Ok(render_shopping_list(&items))
    }

    async fn find_recipe(&self, id: i64) -> Result<Recipe, CollectionServiceError> {
        self.recipes
            .get_by_id(id)
            .await
            .context("Failed to get recipe")?
            .ok_or_else(|| CollectionServiceError::NotFound("Рецепт не найден".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxCollectionRepository, SqlxIngredientRepository, SqlxRecipeRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{IngredientAmount, NewIngredient, RecipeDraft};

    struct Fixture {
        service: CollectionService,
        recipes: Arc<dyn RecipeRepository>,
        user: User,
        flora: i64,
        flour: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::boxed(pool.clone());
        let user = users
            .create(&User::new(
                "cook@example.com".to_string(),
                "cook".to_string(),
                "Иван".to_string(),
                "Петров".to_string(),
                "hash".to_string(),
            ))
            .await
            .unwrap();

        let ingredients = SqlxIngredientRepository::boxed(pool.clone());
        ingredients
            .import(&[
                NewIngredient { name: "Флора".to_string(), measurement_unit: "g".to_string() },
                NewIngredient { name: "мука".to_string(), measurement_unit: "г".to_string() },
            ])
            .await
            .unwrap();
        let all = ingredients.list(None).await.unwrap();

        let recipes = SqlxRecipeRepository::boxed(pool.clone());
        Fixture {
            service: CollectionService::new(SqlxCollectionRepository::boxed(pool.clone()), recipes.clone()),
            recipes,
            user,
            flora: all[0].id,
            flour: all[1].id,
        }
    }

    async fn recipe(f: &Fixture, name: &str, ingredients: Vec<(i64, i32)>) -> Recipe {
        let draft = RecipeDraft {
            name: name.to_string(),
            image: "img".to_string(),
            text: "text".to_string(),
            cooking_time: 15,
            ingredients: ingredients
                .into_iter()
                .map(|(id, amount)| IngredientAmount { id, amount })
                .collect(),
            tags: vec![],
        };
        f.recipes.create(f.user.id, &draft).await.unwrap()
    }

    #[tokio::test]
    async fn test_add_twice_is_rejected() {
        let f = setup().await;
        let r = recipe(&f, "Оладьи", vec![(f.flour, 100)]).await;

        let added = f.service.add(&f.user, RecipeListKind::Favorites, r.id).await.unwrap();
        assert_eq!(added.id, r.id);

        match f.service.add(&f.user, RecipeListKind::Favorites, r.id).await {
            Err(CollectionServiceError::ValidationError(message)) => {
                assert_eq!(message, "Рецепт уже в избранном")
            }
            other => panic!("unexpected result: {:?}", other),
        }

        // The cart is a separate list
        assert!(f.service.add(&f.user, RecipeListKind::ShoppingCart, r.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_absent_and_missing_recipe() {
        let f = setup().await;
        let r = recipe(&f, "Оладьи", vec![(f.flour, 100)]).await;

        assert!(matches!(
            f.service.remove(&f.user, RecipeListKind::ShoppingCart, r.id).await,
            Err(CollectionServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.add(&f.user, RecipeListKind::ShoppingCart, 4242).await,
            Err(CollectionServiceError::NotFound(_))
        ));

        f.service.add(&f.user, RecipeListKind::ShoppingCart, r.id).await.unwrap();
        f.service.remove(&f.user, RecipeListKind::ShoppingCart, r.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_download_sums_cart() {
        let f = setup().await;
        let first = recipe(&f, "Пирог", vec![(f.flora, 100), (f.flour, 300)]).await;
        let second = recipe(&f, "Печенье", vec![(f.flora, 100)]).await;
        let skipped = recipe(&f, "Торт", vec![(f.flour, 1000)]).await;

        for r in [&first, &second] {
            f.service.add(&f.user, RecipeListKind::ShoppingCart, r.id).await.unwrap();
        }
        f.service.add(&f.user, RecipeListKind::Favorites, skipped.id).await.unwrap();

        let text = f.service.download_shopping_list(&f.user).await.unwrap();
        assert_eq!(text, "Флора - 200 g\nмука - 300 г");
    }

    #[tokio::test]
    async fn test_download_empty_cart() {
        let f = setup().await;
        assert_eq!(f.service.download_shopping_list(&f.user).await.unwrap(), "");
    }
}
