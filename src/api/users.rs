//! User API endpoints
//!
//! - GET /api/users/ - Paginated user list
//! - POST /api/users/ - Register
//! - GET /api/users/me/ - Current user
//! - POST /api/users/set_password/ - Change own password
//! - GET /api/users/subscriptions/ - Followed authors with recipe previews
//! - GET /api/users/{id}/ - User profile
//! - POST, DELETE /api/users/{id}/subscribe/ - Follow or unfollow

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, RawQuery, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_limit, default_page, Paginated, PaginationQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{RegisteredUserResponse, SubscriptionResponse, UserResponse};
use crate::models::{CreateUserInput, ListParams};
use crate::services::AuthorView;

/// Request body for a password change
#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Build the users router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/", get(list_users).post(register))
        .route("/users/me/", get(me))
        .route("/users/set_password/", post(set_password))
        .route("/users/subscriptions/", get(list_subscriptions))
        .route("/users/{id}/", get(get_user))
        .route("/users/{id}/subscribe/", post(subscribe).delete(unsubscribe))
}

/// Query parameters for the subscription list
#[derive(Debug, Deserialize)]
pub struct ListSubscriptionsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub recipes_limit: Option<i64>,
}

/// Query parameters for subscribing
#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    pub recipes_limit: Option<i64>,
}

/// Non-positive values mean no truncation
fn recipes_limit(value: Option<i64>) -> Option<i64> {
    value.filter(|n| *n > 0)
}

/// GET /api/users/
async fn list_users(
    State(state): State<AppState>,
    viewer: Option<AuthenticatedUser>,
    RawQuery(raw): RawQuery,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<Paginated<UserResponse>>, ApiError> {
    let Query(query) = query?;
    let page = state.user_service.list(&query.list_params()).await?;

    let viewer = viewer.map(|v| v.0);
    let mut subscribed = Vec::with_capacity(page.items.len());
    for user in &page.items {
        subscribed.push(
            state
                .subscription_service
                .is_subscribed(viewer.as_ref(), user.id)
                .await?,
        );
    }
    let mut flags = subscribed.into_iter();
    let page = page.map(|user| {
        UserResponse::from(AuthorView {
            user,
            is_subscribed: flags.next().unwrap_or(false),
        })
    });

    Ok(Json(Paginated::new(page, "/api/users/", raw.as_deref())))
}

/// POST /api/users/
async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserInput>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisteredUserResponse>), ApiError> {
    let Json(input) = payload?;
    let user = state.user_service.register(input).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /api/users/me/
async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserResponse> {
    Json(
        AuthorView {
            user,
            is_subscribed: false,
        }
        .into(),
    )
}

/// POST /api/users/set_password/
async fn set_password(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<SetPasswordRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(body) = payload?;
    state
        .user_service
        .set_password(&user, &body.current_password, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/subscriptions/
async fn list_subscriptions(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RawQuery(raw): RawQuery,
    query: Result<Query<ListSubscriptionsQuery>, QueryRejection>,
) -> Result<Json<Paginated<SubscriptionResponse>>, ApiError> {
    let Query(query) = query?;
    let params = ListParams::new(query.page, query.limit);
    let page = state
        .subscription_service
        .list(&user, &params, recipes_limit(query.recipes_limit))
        .await?
        .map(SubscriptionResponse::from);

    Ok(Json(Paginated::new(page, "/api/users/subscriptions/", raw.as_deref())))
}

/// GET /api/users/{id}/
async fn get_user(
    State(state): State<AppState>,
    viewer: Option<AuthenticatedUser>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Path(id) = id?;
    let user = state.user_service.get_by_id(id).await?;
    let is_subscribed = state
        .subscription_service
        .is_subscribed(viewer.as_ref().map(|v| &v.0), user.id)
        .await?;
    Ok(Json(AuthorView { user, is_subscribed }.into()))
}

/// POST /api/users/{id}/subscribe/
async fn subscribe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
    query: Result<Query<SubscribeQuery>, QueryRejection>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), ApiError> {
    let Path(id) = id?;
    let Query(query) = query?;
    let view = state
        .subscription_service
        .subscribe(&user, id, recipes_limit(query.recipes_limit))
        .await?;
    Ok((StatusCode::CREATED, Json(view.into())))
}

/// DELETE /api/users/{id}/subscribe/
async fn unsubscribe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.subscription_service.unsubscribe(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipes_limit_ignores_non_positive() {
        assert_eq!(recipes_limit(Some(3)), Some(3));
        assert_eq!(recipes_limit(Some(0)), None);
        assert_eq!(recipes_limit(Some(-1)), None);
        assert_eq!(recipes_limit(None), None);
    }
}
