//! Recipe model
//!
//! A recipe row plus the two join sets hanging off it: tags and
//! ingredient amounts. Also holds the per-user presence relations
//! (favorites and shopping cart) and the shopping list line type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a recipe name
pub const RECIPE_NAME_MAX_LEN: usize = 200;

/// Recipe entity (scalar fields only).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipe {
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    /// Opaque image reference, stored and returned as given
    pub image: String,
    pub text: String,
    /// Cooking time in minutes
    pub cooking_time: i32,
    /// Publication timestamp, set on insert and never updated
    pub pub_date: DateTime<Utc>,
}

/// An ingredient as used by a recipe, with its amount
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeIngredient {
    /// Ingredient id
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Ingredient reference in a recipe write request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngredientAmount {
    /// Ingredient id
    pub id: i64,
    pub amount: i32,
}

/// Input for creating a recipe
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecipeInput {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<i64>,
}

/// Input for updating a recipe.
///
/// Ingredients, tags and cooking time are always replaced. Omitted scalar
/// fields keep their stored value.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRecipeInput {
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<i64>,
}

/// Fully resolved recipe write, as persisted by the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<i64>,
}

impl From<CreateRecipeInput> for RecipeDraft {
    fn from(input: CreateRecipeInput) -> Self {
        Self {
            name: input.name,
            image: input.image,
            text: input.text,
            cooking_time: input.cooking_time,
            ingredients: input.ingredients,
            tags: input.tags,
        }
    }
}

impl RecipeDraft {
    /// Merge a partial update onto an existing recipe
    pub fn merge(existing: &Recipe, input: UpdateRecipeInput) -> Self {
        Self {
            name: input.name.unwrap_or_else(|| existing.name.clone()),
            image: input.image.unwrap_or_else(|| existing.image.clone()),
            text: input.text.unwrap_or_else(|| existing.text.clone()),
            cooking_time: input.cooking_time,
            ingredients: input.ingredients,
            tags: input.tags,
        }
    }
}

/// Filters for the recipe list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Tag slugs; a recipe matches when it carries any of them
    pub tags: Vec<String>,
    pub author_id: Option<i64>,
    /// Only recipes favorited by this user
    pub favorited_by: Option<i64>,
    /// Only recipes in this user's shopping cart
    pub in_cart_of: Option<i64>,
}

/// The two user-to-recipe presence relations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeListKind {
    Favorites,
    ShoppingCart,
}

impl RecipeListKind {
    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            RecipeListKind::Favorites => "favorites",
            RecipeListKind::ShoppingCart => "carts",
        }
    }
}

/// One aggregated shopping list line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}
