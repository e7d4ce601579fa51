//! Ingredient service
//!
//! Read-only access to the ingredient catalogue with prefix search.

use crate::db::repositories::IngredientRepository;
use crate::models::Ingredient;
use anyhow::Context;
use std::sync::Arc;

/// Error types for ingredient service operations
#[derive(Debug, thiserror::Error)]
pub enum IngredientServiceError {
    #[error("Ingredient not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Ingredient service
pub struct IngredientService {
    repo: Arc<dyn IngredientRepository>,
}

impl IngredientService {
    pub fn new(repo: Arc<dyn IngredientRepository>) -> Self {
        Self { repo }
    }

    /// List ingredients, optionally filtered by a case-insensitive name prefix.
    /// A blank prefix lists everything.
    pub async fn list(&self, name: Option<&str>) -> Result<Vec<Ingredient>, IngredientServiceError> {
        let prefix = name.map(str::trim).filter(|n| !n.is_empty());
        let ingredients = self
            .repo
            .list(prefix)
            .await
            .context("Failed to list ingredients")?;
        Ok(ingredients)
    }

    /// Get ingredient by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Ingredient, IngredientServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get ingredient")?
            .ok_or_else(|| {
                IngredientServiceError::NotFound(format!("Ингредиент с id={} не найден", id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxIngredientRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::NewIngredient;

    async fn setup_test_service() -> IngredientService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxIngredientRepository::boxed(pool);
        let catalogue: Vec<NewIngredient> = [("абрикосы", "г"), ("Абрикосовое варенье", "г"), ("банан", "шт.")]
            .iter()
            .map(|(name, unit)| NewIngredient {
                name: name.to_string(),
                measurement_unit: unit.to_string(),
            })
            .collect();
        repo.import(&catalogue).await.unwrap();
        IngredientService::new(repo)
    }

    #[tokio::test]
    async fn test_list_with_prefix() {
        let service = setup_test_service().await;

        let found = service.list(Some("АБРИК")).await.unwrap();
        assert_eq!(found.len(), 2);

        assert_eq!(service.list(Some("  ")).await.unwrap().len(), 3);
        assert_eq!(service.list(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_get_ingredient_not_found() {
        let service = setup_test_service().await;
        assert!(matches!(
            service.get_by_id(777).await,
            Err(IngredientServiceError::NotFound(_))
        ));
    }
}
