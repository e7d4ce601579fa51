//! Tag service
//!
//! Read-only access to the tag catalogue.

use crate::db::repositories::TagRepository;
use crate::models::Tag;
use anyhow::Context;
use std::sync::Arc;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    #[error("Tag not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// All tags ordered by name
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        let tags = self.repo.list().await.context("Failed to list tags")?;
        Ok(tags)
    }

    /// Get tag by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or_else(|| TagServiceError::NotFound(format!("Тег с id={} не найден", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxTagRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::NewTag;

    async fn setup_test_service() -> TagService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxTagRepository::boxed(pool);
        repo.import(&[
            NewTag {
                name: "Ужин".to_string(),
                slug: "dinner".to_string(),
                color: "#8775D2".to_string(),
            },
            NewTag {
                name: "Завтрак".to_string(),
                slug: "breakfast".to_string(),
                color: "#E26C2D".to_string(),
            },
        ])
        .await
        .unwrap();
        TagService::new(repo)
    }

    #[tokio::test]
    async fn test_list_tags_sorted_by_name() {
        let service = setup_test_service().await;
        let tags = service.list().await.unwrap();
        assert_eq!(tags[0].slug, "breakfast");
        assert_eq!(tags[1].slug, "dinner");
    }

    #[tokio::test]
    async fn test_get_tag() {
        let service = setup_test_service().await;
        let first = service.list().await.unwrap().remove(0);

        assert_eq!(service.get_by_id(first.id).await.unwrap(), first);
        assert!(matches!(
            service.get_by_id(404).await,
            Err(TagServiceError::NotFound(_))
        ));
    }
}
