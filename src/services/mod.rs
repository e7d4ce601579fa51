//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They are
//! responsible for:
//! - Validating input against the configured limits
//! - Enforcing ownership and uniqueness rules
//! - Assembling viewer-dependent views of recipes and authors

pub mod collection;
pub mod ingredient;
pub mod password;
pub mod recipe;
pub mod shopping_list;
pub mod subscription;
pub mod tag;
pub mod user;

pub use collection::{CollectionService, CollectionServiceError};
pub use ingredient::{IngredientService, IngredientServiceError};
pub use password::{hash_password, verify_password};
pub use recipe::{
    validate_draft, AuthorView, RecipeRepositories, RecipeService, RecipeServiceError, RecipeView,
};
pub use shopping_list::render_shopping_list;
pub use subscription::{SubscriptionService, SubscriptionServiceError, SubscriptionView};
pub use tag::{TagService, TagServiceError};
pub use user::{LoginInput, UserService, UserServiceError};
