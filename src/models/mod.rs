//! Data models
//!
//! Plain data structures used across the crate:
//! - Database entities (User, Session, Tag, Ingredient, Recipe)
//! - Service inputs (CreateUserInput, CreateRecipeInput, UpdateRecipeInput)
//! - Pagination types

mod ingredient;
mod pagination;
mod recipe;
mod session;
mod tag;
mod user;

pub use ingredient::{Ingredient, NewIngredient};
pub use pagination::{ListParams, PagedResult, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use recipe::{
    CreateRecipeInput, IngredientAmount, Recipe, RecipeDraft, RecipeFilter, RecipeIngredient,
    RecipeListKind, ShoppingListItem, UpdateRecipeInput, RECIPE_NAME_MAX_LEN,
};
pub use session::Session;
pub use tag::{NewTag, Tag};
pub use user::{CreateUserInput, User, EMAIL_MAX_LEN, NAME_MAX_LEN};
