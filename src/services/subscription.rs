//! Subscription service
//!
//! Follow and unfollow authors, and list followed authors together with
//! their latest recipes.

use crate::db::repositories::{RecipeRepository, SubscriptionRepository, UserRepository};
use crate::models::{ListParams, PagedResult, Recipe, User};
use anyhow::Context;
use std::sync::Arc;

/// Error types for subscription operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionServiceError {
    /// Self-subscription or duplicate subscription
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Missing author, or no subscription to remove
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A followed author with their recipes
#[derive(Debug, Clone)]
pub struct SubscriptionView {
    pub author: User,
    /// Newest first, truncated to the requested limit
    pub recipes: Vec<Recipe>,
    /// Total number of recipes by the author
    pub recipes_count: i64,
}

/// Subscription service
pub struct SubscriptionService {
    subscriptions: Arc<dyn SubscriptionRepository>,
    users: Arc<dyn UserRepository>,
    recipes: Arc<dyn RecipeRepository>,
}

impl SubscriptionService {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        users: Arc<dyn UserRepository>,
        recipes: Arc<dyn RecipeRepository>,
    ) -> Self {
        Self {
            subscriptions,
            users,
            recipes,
        }
    }

    /// Follow `author_id`
    pub async fn subscribe(
        &self,
        user: &User,
        author_id: i64,
        recipes_limit: Option<i64>,
    ) -> Result<SubscriptionView, SubscriptionServiceError> {
        let author = self.find_author(author_id).await?;

        if user.id == author.id {
            return Err(SubscriptionServiceError::ValidationError(
                "Невозможно подписаться на самого себя".to_string(),
            ));
        }

        let added = self
            .subscriptions
            .add(user.id, author.id)
            .await
            .context("Failed to create subscription")?;
        if !added {
            return Err(SubscriptionServiceError::ValidationError(
                "Вы уже подписаны на этого пользователя".to_string(),
            ));
        }

        tracing::debug!(user_id = user.id, author_id, "Subscribed");
        self.view(author, recipes_limit).await
    }

    /// Stop following `author_id`
    pub async fn unsubscribe(&self, user: &User, author_id: i64) -> Result<(), SubscriptionServiceError> {
        self.find_author(author_id).await?;

        let removed = self
            .subscriptions
            .remove(user.id, author_id)
            .await
            .context("Failed to delete subscription")?;
        if !removed {
            return Err(SubscriptionServiceError::NotFound(
                "Нет подписки на данного пользователя".to_string(),
            ));
        }

        tracing::debug!(user_id = user.id, author_id, "Unsubscribed");
        Ok(())
    }

    /// Authors followed by `user`, paginated
    pub async fn list(
        &self,
        user: &User,
        params: &ListParams,
        recipes_limit: Option<i64>,
    ) -> Result<PagedResult<SubscriptionView>, SubscriptionServiceError> {
        let (authors, total) = self
            .subscriptions
            .list_authors(user.id, params)
            .await
            .context("Failed to list subscriptions")?;

        let mut views = Vec::with_capacity(authors.len());
        for author in authors {
            views.push(self.view(author, recipes_limit).await?);
        }
        Ok(PagedResult::new(views, total, params))
    }

    /// Whether `viewer` follows `author_id`. Always false for anonymous viewers.
    pub async fn is_subscribed(
        &self,
        viewer: Option<&User>,
        author_id: i64,
    ) -> Result<bool, SubscriptionServiceError> {
        match viewer {
            Some(viewer) => Ok(self
                .subscriptions
                .exists(viewer.id, author_id)
                .await
                .context("Failed to check subscription")?),
            None => Ok(false),
        }
    }

    async fn find_author(&self, id: i64) -> Result<User, SubscriptionServiceError> {
        self.users
            .get_by_id(id)
            .await
            .context("Failed to get author")?
            .ok_or_else(|| SubscriptionServiceError::NotFound("Пользователь не найден".to_string()))
    }

    async fn view(
        &self,
        author: User,
        recipes_limit: Option<i64>,
    ) -> Result<SubscriptionView, SubscriptionServiceError> {
        let recipes = self
            .recipes
            .list_by_author(author.id, recipes_limit)
            .await
            .context("Failed to list author recipes")?;
        let recipes_count = self
            .recipes
            .count_by_author(author.id)
            .await
            .context("Failed to count author recipes")?;

        Ok(SubscriptionView {
            author,
            recipes,
            recipes_count,
        })
    }
}
