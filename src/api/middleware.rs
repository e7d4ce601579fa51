//! API middleware
//!
//! Contains:
//! - Application state shared by all handlers
//! - The `ApiError` envelope and the mapping from service errors
//! - Token authentication (`Authorization: Token <key>` or `Bearer <key>`)

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequestParts, OptionalFromRequestParts, Request, State,
    },
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::{Config, LimitsConfig};
use crate::db::repositories::{
    SqlxCollectionRepository, SqlxIngredientRepository, SqlxRecipeRepository,
    SqlxSessionRepository, SqlxSubscriptionRepository, SqlxTagRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    CollectionService, CollectionServiceError, IngredientService, IngredientServiceError,
    RecipeRepositories, RecipeService, RecipeServiceError, SubscriptionService,
    SubscriptionServiceError, TagService, TagServiceError, UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub tag_service: Arc<TagService>,
    pub ingredient_service: Arc<IngredientService>,
    pub recipe_service: Arc<RecipeService>,
    pub collection_service: Arc<CollectionService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub limits: Arc<LimitsConfig>,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(pool: DynDatabasePool, config: &Config) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let tag_repo = SqlxTagRepository::boxed(pool.clone());
        let ingredient_repo = SqlxIngredientRepository::boxed(pool.clone());
        let recipe_repo = SqlxRecipeRepository::boxed(pool.clone());
        let collection_repo = SqlxCollectionRepository::boxed(pool.clone());
        let subscription_repo = SqlxSubscriptionRepository::boxed(pool);

        let recipe_repos = RecipeRepositories {
            recipes: recipe_repo.clone(),
            tags: tag_repo.clone(),
            ingredients: ingredient_repo.clone(),
            users: user_repo.clone(),
            collections: collection_repo.clone(),
            subscriptions: subscription_repo.clone(),
        };

        Self {
            user_service: Arc::new(UserService::with_session_ttl(
                user_repo.clone(),
                session_repo,
                config.session.ttl_days,
            )),
            tag_service: Arc::new(TagService::new(tag_repo)),
            ingredient_service: Arc::new(IngredientService::new(ingredient_repo)),
            recipe_service: Arc::new(RecipeService::new(recipe_repos, config.limits.clone())),
            collection_service: Arc::new(CollectionService::new(collection_repo, recipe_repo.clone())),
            subscription_service: Arc::new(SubscriptionService::new(
                subscription_repo,
                user_repo,
                recipe_repo,
            )),
            limits: Arc::new(config.limits.clone()),
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Log the cause and return an opaque 500
    pub fn internal_error(error: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {:#}", error);
        Self::new("INTERNAL_ERROR", "Внутренняя ошибка сервера")
    }

    /// HTTP status for this error code
    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

impl From<axum_extra::extract::QueryRejection> for ApiError {
    fn from(rejection: axum_extra::extract::QueryRejection) -> Self {
        ApiError::validation_error(rejection.to_string())
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::ValidationError(msg)
            | UserServiceError::UserExists(msg)
            | UserServiceError::AuthenticationError(msg) => ApiError::validation_error(msg),
            UserServiceError::NotFound(msg) => ApiError::not_found(msg),
            UserServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::NotFound(msg) => ApiError::not_found(msg),
            TagServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<IngredientServiceError> for ApiError {
    fn from(e: IngredientServiceError) -> Self {
        match e {
            IngredientServiceError::NotFound(msg) => ApiError::not_found(msg),
            IngredientServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<RecipeServiceError> for ApiError {
    fn from(e: RecipeServiceError) -> Self {
        match e {
            RecipeServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            RecipeServiceError::NotFound(msg) => ApiError::not_found(msg),
            RecipeServiceError::PermissionDenied(msg) => ApiError::forbidden(msg),
            RecipeServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<CollectionServiceError> for ApiError {
    fn from(e: CollectionServiceError) -> Self {
        match e {
            CollectionServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CollectionServiceError::NotFound(msg) => ApiError::not_found(msg),
            CollectionServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<SubscriptionServiceError> for ApiError {
    fn from(e: SubscriptionServiceError) -> Self {
        match e {
            SubscriptionServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            SubscriptionServiceError::NotFound(msg) => ApiError::not_found(msg),
            SubscriptionServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

/// Extract the auth token from the `Authorization` header.
/// Accepts the `Token` and `Bearer` schemes.
pub fn token_from_headers(headers: &axum::http::HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Token ")
        .or_else(|| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
}

/// Optional authentication middleware.
///
/// Resolves the token, when present and valid, and stores the user in the
/// request extensions. Handlers that require a user extract
/// `AuthenticatedUser`, which rejects with 401 when none was stored.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = token_from_headers(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session validation failed: {}", e),
        }
    }
    next.run(request).await
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Учетные данные не были предоставлены"))
    }
}

impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthenticatedUser>().cloned())
    }
}
