//! Shared API response types
//!
//! Read projections of users, tags, ingredients, recipes and
//! subscriptions. Several endpoints return the same shapes, so they live
//! here rather than next to a single router.

use serde::{Deserialize, Serialize};

use crate::models::{Ingredient, Recipe, RecipeIngredient, Tag, User};
use crate::services::{AuthorView, RecipeView, SubscriptionView};

// ============================================================================
// User Response Types
// ============================================================================

/// A user as seen by the requester
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl From<AuthorView> for UserResponse {
    fn from(view: AuthorView) -> Self {
        Self {
            id: view.user.id,
            email: view.user.email,
            username: view.user.username,
            first_name: view.user.first_name,
            last_name: view.user.last_name,
            is_subscribed: view.is_subscribed,
        }
    }
}

/// Registration response, without the subscription flag
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisteredUserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for RegisteredUserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

// ============================================================================
// Catalogue Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub color: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            slug: tag.slug,
            color: tag.color,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngredientResponse {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

impl From<Ingredient> for IngredientResponse {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

// ============================================================================
// Recipe Response Types
// ============================================================================

/// Ingredient line of a recipe; `id` is the ingredient id
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeIngredientResponse {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipeIngredient> for RecipeIngredientResponse {
    fn from(item: RecipeIngredient) -> Self {
        Self {
            id: item.id,
            name: item.name,
            measurement_unit: item.measurement_unit,
            amount: item.amount,
        }
    }
}

/// Full recipe with author, links and the requester's flags
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl From<RecipeView> for RecipeResponse {
    fn from(view: RecipeView) -> Self {
        Self {
            id: view.recipe.id,
            tags: view.tags.into_iter().map(Into::into).collect(),
            author: view.author.into(),
            ingredients: view.ingredients.into_iter().map(Into::into).collect(),
            is_favorited: view.is_favorited,
            is_in_shopping_cart: view.is_in_shopping_cart,
            name: view.recipe.name,
            image: view.recipe.image,
            text: view.recipe.text,
            cooking_time: view.recipe.cooking_time,
        }
    }
}

/// Short recipe projection used by favorites, cart and subscriptions
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeShortResponse {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<Recipe> for RecipeShortResponse {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            image: recipe.image,
            cooking_time: recipe.cooking_time,
        }
    }
}

// ============================================================================
// Subscription Response Types
// ============================================================================

/// A followed author with a preview of their recipes
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub recipes: Vec<RecipeShortResponse>,
    pub recipes_count: i64,
}

impl From<SubscriptionView> for SubscriptionResponse {
    fn from(view: SubscriptionView) -> Self {
        Self {
            user: AuthorView {
                user: view.author,
                is_subscribed: true,
            }
            .into(),
            recipes: view.recipes.into_iter().map(Into::into).collect(),
            recipes_count: view.recipes_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user() -> User {
        let mut user = User::new(
            "cook@example.com".to_string(),
            "cook".to_string(),
            "Иван".to_string(),
            "Петров".to_string(),
            "$argon2id$secret".to_string(),
        );
        user.id = 7;
        user
    }

    fn recipe() -> Recipe {
        Recipe {
            id: 3,
            author_id: 7,
            name: "Борщ".to_string(),
            image: "img".to_string(),
            text: "Варить".to_string(),
            cooking_time: 90,
            pub_date: Utc::now(),
        }
    }

    #[test]
    fn test_subscription_response_is_flat() {
        let response = SubscriptionResponse::from(SubscriptionView {
            author: user(),
            recipes: vec![recipe()],
            recipes_count: 4,
        });
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["username"], "cook");
        assert_eq!(json["is_subscribed"], true);
        assert_eq!(json["recipes"][0]["name"], "Борщ");
        assert_eq!(json["recipes_count"], 4);
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_short_recipe_fields() {
        let json = serde_json::to_value(RecipeShortResponse::from(recipe())).unwrap();
        let mut keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["cooking_time", "id", "image", "name"]);
    }
}
