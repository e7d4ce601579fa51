//! Recipe service
//!
//! Validates recipe submissions against the configured bounds, enforces
//! ownership on writes and assembles the viewer-dependent recipe view
//! (author subscription flag, favorite and cart flags).

use crate::config::LimitsConfig;
use crate::db::repositories::{
    CollectionRepository, IngredientRepository, RecipeRepository, SubscriptionRepository,
    TagRepository, UserRepository,
};
use crate::models::{
    CreateRecipeInput, ListParams, PagedResult, Recipe, RecipeDraft, RecipeFilter,
    RecipeIngredient, RecipeListKind, Tag, UpdateRecipeInput, User, RECIPE_NAME_MAX_LEN,
};
use anyhow::{anyhow, Context};
use std::collections::HashSet;
use std::sync::Arc;

/// Error types for recipe service operations
#[derive(Debug, thiserror::Error)]
pub enum RecipeServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Recipe not found: {0}")]
    NotFound(String),

    /// The requester is not the recipe's author
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A user as seen by a (possibly anonymous) viewer
#[derive(Debug, Clone)]
pub struct AuthorView {
    pub user: User,
    pub is_subscribed: bool,
}

/// A recipe with its links and the viewer's flags
#[derive(Debug, Clone)]
pub struct RecipeView {
    pub recipe: Recipe,
    pub author: AuthorView,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Repositories the recipe service reads from
#[derive(Clone)]
pub struct RecipeRepositories {
    pub recipes: Arc<dyn RecipeRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub ingredients: Arc<dyn IngredientRepository>,
    pub users: Arc<dyn UserRepository>,
    pub collections: Arc<dyn CollectionRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
}

/// Recipe service
pub struct RecipeService {
    repos: RecipeRepositories,
    limits: LimitsConfig,
}

impl RecipeService {
    pub fn new(repos: RecipeRepositories, limits: LimitsConfig) -> Self {
        Self { repos, limits }
    }

    /// Create a recipe authored by `author`
    pub async fn create(
        &self,
        author: &User,
        input: CreateRecipeInput,
    ) -> Result<RecipeView, RecipeServiceError> {
        let draft = RecipeDraft::from(input);
        validate_draft(&draft, &self.limits)?;
        self.check_references(&draft).await?;

        let recipe = self
            .repos
            .recipes
            .create(author.id, &draft)
            .await
            .context("Failed to create recipe")?;

        tracing::info!(recipe_id = recipe.id, author_id = author.id, "Recipe created");
        self.view(Some(author), recipe).await
    }

    /// Replace a recipe's ingredients, tags and cooking time, and any scalar
    /// fields present in the input. Only the author may update.
    pub async fn update(
        &self,
        requester: &User,
        id: i64,
        input: UpdateRecipeInput,
    ) -> Result<RecipeView, RecipeServiceError> {
        let existing = self.get_owned(requester, id).await?;

        let draft = RecipeDraft::merge(&existing, input);
        validate_draft(&draft, &self.limits)?;
        self.check_references(&draft).await?;

        let recipe = self
            .repos
            .recipes
            .update(id, &draft)
            .await
            .context("Failed to update recipe")?;

        tracing::info!(recipe_id = id, "Recipe updated");
        self.view(Some(requester), recipe).await
    }

    /// Delete a recipe. Only the author may delete.
    pub async fn delete(&self, requester: &User, id: i64) -> Result<(), RecipeServiceError> {
        self.get_owned(requester, id).await?;

        self.repos
            .recipes
            .delete(id)
            .await
            .context("Failed to delete recipe")?;

        tracing::info!(recipe_id = id, "Recipe deleted");
        Ok(())
    }

    /// Get a single recipe view
    pub async fn get(&self, viewer: Option<&User>, id: i64) -> Result<RecipeView, RecipeServiceError> {
        let recipe = self.find(id).await?;
        self.view(viewer, recipe).await
    }

    /// Filtered, paginated recipe views, newest first
    pub async fn list(
        &self,
        viewer: Option<&User>,
        filter: &RecipeFilter,
        params: &ListParams,
    ) -> Result<PagedResult<RecipeView>, RecipeServiceError> {
        let (recipes, total) = self
            .repos
            .recipes
            .list(filter, params)
            .await
            .context("Failed to list recipes")?;

        let mut views = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            views.push(self.view(viewer, recipe).await?);
        }
        Ok(PagedResult::new(views, total, params))
    }

    async fn find(&self, id: i64) -> Result<Recipe, RecipeServiceError> {
        self.repos
            .recipes
            .get_by_id(id)
            .await
            .context("Failed to get recipe")?
            .ok_or_else(|| RecipeServiceError::NotFound("Рецепт не найден".to_string()))
    }

    async fn get_owned(&self, requester: &User, id: i64) -> Result<Recipe, RecipeServiceError> {
        let recipe = self.find(id).await?;
        if !requester.owns(recipe.author_id) {
            return Err(RecipeServiceError::PermissionDenied(
                "Изменять рецепт может только его автор".to_string(),
            ));
        }
        Ok(recipe)
    }

    /// Every referenced ingredient and tag must exist
    async fn check_references(&self, draft: &RecipeDraft) -> Result<(), RecipeServiceError> {
        let ingredient_ids: Vec<i64> = draft.ingredients.iter().map(|i| i.id).collect();
        let found: HashSet<i64> = self
            .repos
            .ingredients
            .existing_ids(&ingredient_ids)
            .await
            .context("Failed to check ingredients")?
            .into_iter()
            .collect();
        if let Some(missing) = ingredient_ids.iter().find(|id| !found.contains(id)) {
            return Err(RecipeServiceError::ValidationError(format!(
                "Ингредиент с id={} не существует",
                missing
            )));
        }

        let found: HashSet<i64> = self
            .repos
            .tags
            .existing_ids(&draft.tags)
            .await
            .context("Failed to check tags")?
            .into_iter()
            .collect();
        if let Some(missing) = draft.tags.iter().find(|id| !found.contains(id)) {
            return Err(RecipeServiceError::ValidationError(format!(
                "Тег с id={} не существует",
                missing
            )));
        }
        Ok(())
    }

    async fn view(&self, viewer: Option<&User>, recipe: Recipe) -> Result<RecipeView, RecipeServiceError> {
        let author = self
            .repos
            .users
            .get_by_id(recipe.author_id)
            .await
            .context("Failed to get recipe author")?
            .ok_or_else(|| anyhow!("Author {} of recipe {} is missing", recipe.author_id, recipe.id))?;

        let tags = self
            .repos
            .tags
            .list_by_recipe(recipe.id)
            .await
            .context("Failed to get recipe tags")?;
        let ingredients = self
            .repos
            .recipes
            .list_ingredients(recipe.id)
            .await
            .context("Failed to get recipe ingredients")?;

        let (is_subscribed, is_favorited, is_in_shopping_cart) = match viewer {
            Some(viewer) => (
                self.repos
                    .subscriptions
                    .exists(viewer.id, author.id)
                    .await
                    .context("Failed to check subscription")?,
                self.repos
                    .collections
                    .contains(RecipeListKind::Favorites, viewer.id, recipe.id)
                    .await
                    .context("Failed to check favorites")?,
                self.repos
                    .collections
                    .contains(RecipeListKind::ShoppingCart, viewer.id, recipe.id)
                    .await
                    .context("Failed to check shopping cart")?,
            ),
            None => (false, false, false),
        };

        Ok(RecipeView {
            recipe,
            author: AuthorView {
                user: author,
                is_subscribed,
            },
            tags,
            ingredients,
            is_favorited,
            is_in_shopping_cart,
        })
    }
}

/// Check a recipe draft against the configured bounds. The first failing
/// rule is reported.
pub fn validate_draft(draft: &RecipeDraft, limits: &LimitsConfig) -> Result<(), RecipeServiceError> {
    let invalid = |message: String| Err(RecipeServiceError::ValidationError(message));

    if draft.name.trim().is_empty() {
        return invalid("Название рецепта не может быть пустым".to_string());
    }
    if draft.name.chars().count() > RECIPE_NAME_MAX_LEN {
        return invalid(format!(
            "Название рецепта не может быть длиннее {} символов",
            RECIPE_NAME_MAX_LEN
        ));
    }
    if draft.text.trim().is_empty() {
        return invalid("Описание рецепта не может быть пустым".to_string());
    }
    if draft.image.is_empty() {
        return invalid("Изображение рецепта обязательно".to_string());
    }

    let amount_range = limits.ingredient_amount_min..=limits.ingredient_amount_max;
    if draft
        .ingredients
        .iter()
        .any(|i| !amount_range.contains(&i64::from(i.amount)))
    {
        return invalid(format!(
            "Допустимые значения количества ингредиента: {} - {}",
            limits.ingredient_amount_min, limits.ingredient_amount_max
        ));
    }

    if draft.ingredients.is_empty() {
        return invalid("В рецепте не могут отсутствовать ингредиенты".to_string());
    }
    if draft.tags.is_empty() {
        return invalid("В рецепте не могут отсутствовать теги".to_string());
    }

    let mut seen = HashSet::new();
    if !draft.ingredients.iter().all(|i| seen.insert(i.id)) {
        return invalid("Ингредиенты не могут дублироваться".to_string());
    }
    let mut seen = HashSet::new();
    if !draft.tags.iter().all(|id| seen.insert(*id)) {
        return invalid("Теги не могут дублироваться".to_string());
    }

    let time_range = limits.cooking_time_min..=limits.cooking_time_max;
    if !time_range.contains(&i64::from(draft.cooking_time)) {
        return invalid(format!(
            "Допустимые значения времени приготовления: {} - {}",
            limits.cooking_time_min, limits.cooking_time_max
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxCollectionRepository, SqlxIngredientRepository, SqlxRecipeRepository,
        SqlxSubscriptionRepository, SqlxTagRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{IngredientAmount, NewIngredient, NewTag};
    use proptest::prelude::*;

    struct Fixture {
        service: RecipeService,
        repos: RecipeRepositories,
        author: User,
        stranger: User,
        ingredients: Vec<i64>,
        tags: Vec<i64>,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let repos = RecipeRepositories {
            recipes: SqlxRecipeRepository::boxed(pool.clone()),
            tags: SqlxTagRepository::boxed(pool.clone()),
            ingredients: SqlxIngredientRepository::boxed(pool.clone()),
            users: SqlxUserRepository::boxed(pool.clone()),
            collections: SqlxCollectionRepository::boxed(pool.clone()),
            subscriptions: SqlxSubscriptionRepository::boxed(pool.clone()),
        };

        let mut users = Vec::new();
        for name in ["author", "stranger"] {
            let user = User::new(
                format!("{}@example.com", name),
                name.to_string(),
                "Имя".to_string(),
                "Фамилия".to_string(),
                "hash".to_string(),
            );
            users.push(repos.users.create(&user).await.unwrap());
        }

        repos
            .ingredients
            .import(&[
                NewIngredient { name: "мука".to_string(), measurement_unit: "г".to_string() },
                NewIngredient { name: "яйца".to_string(), measurement_unit: "шт.".to_string() },
            ])
            .await
            .unwrap();
        repos
            .tags
            .import(&[
                NewTag { name: "Завтрак".to_string(), slug: "breakfast".to_string(), color: "#E26C2D".to_string() },
                NewTag { name: "Ужин".to_string(), slug: "dinner".to_string(), color: "#8775D2".to_string() },
            ])
            .await
            .unwrap();

        let ingredients = repos.ingredients.list(None).await.unwrap().iter().map(|i| i.id).collect();
        let tags = repos.tags.list().await.unwrap().iter().map(|t| t.id).collect();
        let stranger = users.pop().unwrap();
        let author = users.pop().unwrap();

        Fixture {
            service: RecipeService::new(repos.clone(), LimitsConfig::default()),
            repos,
            author,
            stranger,
            ingredients,
            tags,
        }
    }

    fn create_input(ingredients: &[i64], tags: &[i64]) -> CreateRecipeInput {
        CreateRecipeInput {
            name: "Блины".to_string(),
            image: "data:image/png;base64,AAAA".to_string(),
            text: "Смешать и пожарить".to_string(),
            cooking_time: 30,
            ingredients: ingredients
                .iter()
                .map(|id| IngredientAmount { id: *id, amount: 100 })
                .collect(),
            tags: tags.to_vec(),
        }
    }

    fn draft(amount: i32, cooking_time: i32) -> RecipeDraft {
        RecipeDraft {
            name: "Омлет".to_string(),
            image: "img".to_string(),
            text: "Взбить".to_string(),
            cooking_time,
            ingredients: vec![IngredientAmount { id: 1, amount }],
            tags: vec![1],
        }
    }

    fn message(result: Result<(), RecipeServiceError>) -> String {
        match result {
            Err(RecipeServiceError::ValidationError(message)) => message,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_order() {
        let limits = LimitsConfig::default();

        let mut d = draft(0, 0);
        d.ingredients.clear();
        assert_eq!(
            message(validate_draft(&d, &limits)),
            "В рецепте не могут отсутствовать ингредиенты"
        );

        let d = draft(0, 0);
        assert!(message(validate_draft(&d, &limits)).starts_with("Допустимые значения количества"));

        let mut d = draft(5, 10);
        d.tags = vec![];
        assert_eq!(message(validate_draft(&d, &limits)), "В рецепте не могут отсутствовать теги");

        let mut d = draft(5, 10);
        d.ingredients.push(IngredientAmount { id: 1, amount: 7 });
        d.tags = vec![1, 1];
        assert_eq!(message(validate_draft(&d, &limits)), "Ингредиенты не могут дублироваться");

        let mut d = draft(5, 10);
        d.tags = vec![1, 1];
        assert_eq!(message(validate_draft(&d, &limits)), "Теги не могут дублироваться");

        let mut d = draft(5, 10);
        d.name = "я".repeat(RECIPE_NAME_MAX_LEN + 1);
        assert!(validate_draft(&d, &limits).is_err());
        d.name = "я".repeat(RECIPE_NAME_MAX_LEN);
        assert!(validate_draft(&d, &limits).is_ok());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let limits = LimitsConfig {
            cooking_time_min: 5,
            cooking_time_max: 60,
            ingredient_amount_min: 2,
            ingredient_amount_max: 10,
            ..LimitsConfig::default()
        };

        assert!(validate_draft(&draft(2, 5), &limits).is_ok());
        assert!(validate_draft(&draft(10, 60), &limits).is_ok());
        assert!(validate_draft(&draft(1, 5), &limits).is_err());
        assert!(validate_draft(&draft(11, 5), &limits).is_err());
        assert!(validate_draft(&draft(2, 4), &limits).is_err());
        assert!(validate_draft(&draft(2, 61), &limits).is_err());
    }

    proptest! {
        #[test]
        fn prop_amount_accepted_iff_in_bounds(amount in -10i32..40_000, min in 1i64..100, span in 0i64..1000) {
            let limits = LimitsConfig {
                ingredient_amount_min: min,
                ingredient_amount_max: min + span,
                ..LimitsConfig::default()
            };
            let in_bounds = (min..=min + span).contains(&i64::from(amount));
            prop_assert_eq!(validate_draft(&draft(amount, 10), &limits).is_ok(), in_bounds);
        }

        #[test]
        fn prop_cooking_time_accepted_iff_in_bounds(time in -10i32..40_000) {
            let limits = LimitsConfig::default();
            let in_bounds = (limits.cooking_time_min..=limits.cooking_time_max).contains(&i64::from(time));
            prop_assert_eq!(validate_draft(&draft(5, time), &limits).is_ok(), in_bounds);
        }
    }

    #[tokio::test]
    async fn test_create_and_get_recipe() {
        let f = setup().await;

        let view = f
            .service
            .create(&f.author, create_input(&f.ingredients, &f.tags[..1]))
            .await
            .expect("Failed to create recipe");

        assert_eq!(view.recipe.author_id, f.author.id);
        assert_eq!(view.author.user.id, f.author.id);
        assert!(!view.is_favorited);
        let mut ids: Vec<i64> = view.ingredients.iter().map(|i| i.id).collect();
        ids.sort();
        assert_eq!(ids, f.ingredients);
        assert_eq!(view.tags.len(), 1);

        let fetched = f.service.get(None, view.recipe.id).await.unwrap();
        assert_eq!(fetched.recipe, view.recipe);
        assert!(matches!(
            f.service.get(None, 999).await,
            Err(RecipeServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_references() {
        let f = setup().await;

        let result = f
            .service
            .create(&f.author, create_input(&[f.ingredients[0], 999], &f.tags))
            .await;
        assert!(matches!(result, Err(RecipeServiceError::ValidationError(_))));

        let result = f
            .service
            .create(&f.author, create_input(&f.ingredients, &[999]))
            .await;
        assert!(matches!(result, Err(RecipeServiceError::ValidationError(_))));

        let (_, total) = f
            .repos
            .recipes
            .list(&RecipeFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_only_author_may_modify() {
        let f = setup().await;
        let view = f
            .service
            .create(&f.author, create_input(&f.ingredients, &f.tags))
            .await
            .unwrap();
        let id = view.recipe.id;

        let update = UpdateRecipeInput {
            name: Some("Чужие блины".to_string()),
            image: None,
            text: None,
            cooking_time: 20,
            ingredients: vec![IngredientAmount { id: f.ingredients[0], amount: 1 }],
            tags: vec![f.tags[0]],
        };
        assert!(matches!(
            f.service.update(&f.stranger, id, update.clone()).await,
            Err(RecipeServiceError::PermissionDenied(_))
        ));
        assert!(matches!(
            f.service.delete(&f.stranger, id).await,
            Err(RecipeServiceError::PermissionDenied(_))
        ));

        let updated = f.service.update(&f.author, id, update).await.unwrap();
        assert_eq!(updated.recipe.name, "Чужие блины");
        assert_eq!(updated.recipe.text, view.recipe.text);
        assert_eq!(updated.recipe.pub_date, view.recipe.pub_date);
        assert_eq!(updated.ingredients.len(), 1);
        assert_eq!(updated.tags.len(), 1);

        f.service.delete(&f.author, id).await.unwrap();
        assert!(matches!(
            f.service.delete(&f.author, id).await,
            Err(RecipeServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_viewer_flags() {
        let f = setup().await;
        let view = f
            .service
            .create(&f.author, create_input(&f.ingredients, &f.tags))
            .await
            .unwrap();
        let id = view.recipe.id;

        f.repos.collections.add(RecipeListKind::Favorites, f.stranger.id, id).await.unwrap();
        f.repos.subscriptions.add(f.stranger.id, f.author.id).await.unwrap();

        let seen = f.service.get(Some(&f.stranger), id).await.unwrap();
        assert!(seen.is_favorited);
        assert!(!seen.is_in_shopping_cart);
        assert!(seen.author.is_subscribed);

        let anonymous = f.service.get(None, id).await.unwrap();
        assert!(!anonymous.is_favorited);
        assert!(!anonymous.author.is_subscribed);

        let filter = RecipeFilter {
            favorited_by: Some(f.stranger.id),
            ..RecipeFilter::default()
        };
        let page = f
            .service
            .list(Some(&f.stranger), &filter, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items[0].is_favorited);
    }
}
