//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the storage of one aggregate and dispatches on
//! the configured driver.

pub mod collection;
pub mod ingredient;
pub mod recipe;
pub mod session;
pub mod subscription;
pub mod tag;
pub mod user;

pub use collection::{CollectionRepository, SqlxCollectionRepository};
pub use ingredient::{IngredientRepository, SqlxIngredientRepository};
pub use recipe::{RecipeRepository, SqlxRecipeRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use subscription::{SqlxSubscriptionRepository, SubscriptionRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};
