//! Recipe API endpoints
//!
//! - GET /api/recipes/ - Filtered, paginated list
//!   (`tags` repeatable, `author`, `is_favorited`, `is_in_shopping_cart`)
//! - POST /api/recipes/ - Create
//! - GET, PATCH, DELETE /api/recipes/{id}/ - Read, update and delete;
//!   writes are limited to the author
//! - POST, DELETE /api/recipes/{id}/favorite/
//! - POST, DELETE /api/recipes/{id}/shopping_cart/
//! - GET /api/recipes/download_shopping_cart/ - Plain-text shopping list

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, RawQuery, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::{Query, QueryRejection};
use serde::Deserialize;

use crate::api::common::{default_limit, default_page, flag, Paginated};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{RecipeResponse, RecipeShortResponse};
use crate::models::{
    CreateRecipeInput, ListParams, RecipeFilter, RecipeListKind, UpdateRecipeInput, User,
};

/// Build the recipes router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recipes/", get(list_recipes).post(create_recipe))
        .route("/recipes/download_shopping_cart/", get(download_shopping_cart))
        .route(
            "/recipes/{id}/",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route("/recipes/{id}/favorite/", post(add_favorite).delete(remove_favorite))
        .route(
            "/recipes/{id}/shopping_cart/",
            post(add_to_cart).delete(remove_from_cart),
        )
}

/// Query parameters for the recipe list. `tags` may repeat.
#[derive(Debug, Default, Deserialize)]
pub struct ListRecipesQuery {
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: Option<i64>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl ListRecipesQuery {
    /// The favorites and cart filters only apply to an authenticated viewer.
    fn filter(self, viewer: Option<&User>) -> RecipeFilter {
        let viewer_id = viewer.map(|u| u.id);
        RecipeFilter {
            favorited_by: viewer_id.filter(|_| flag(self.is_favorited.as_deref())),
            in_cart_of: viewer_id.filter(|_| flag(self.is_in_shopping_cart.as_deref())),
            tags: self.tags,
            author_id: self.author,
        }
    }
}

/// GET /api/recipes/
async fn list_recipes(
    State(state): State<AppState>,
    viewer: Option<AuthenticatedUser>,
    RawQuery(raw): RawQuery,
    query: Result<Query<ListRecipesQuery>, QueryRejection>,
) -> Result<Json<Paginated<RecipeResponse>>, ApiError> {
    let Query(query) = query?;
    let viewer = viewer.map(|v| v.0);
    let params = ListParams::new(query.page, query.limit);
    let filter = query.filter(viewer.as_ref());

    let page = state
        .recipe_service
        .list(viewer.as_ref(), &filter, &params)
        .await?
        .map(RecipeResponse::from);

    Ok(Json(Paginated::new(page, "/api/recipes/", raw.as_deref())))
}

/// POST /api/recipes/
async fn create_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<CreateRecipeInput>, JsonRejection>,
) -> Result<(StatusCode, Json<RecipeResponse>), ApiError> {
    let Json(input) = payload?;
    let view = state.recipe_service.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(view.into())))
}

/// GET /api/recipes/{id}/
async fn get_recipe(
    State(state): State<AppState>,
    viewer: Option<AuthenticatedUser>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let Path(id) = id?;
    let view = state
        .recipe_service
        .get(viewer.as_ref().map(|v| &v.0), id)
        .await?;
    Ok(Json(view.into()))
}

/// PATCH /api/recipes/{id}/
async fn update_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateRecipeInput>, JsonRejection>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    let view = state.recipe_service.update(&user, id, input).await?;
    Ok(Json(view.into()))
}

/// DELETE /api/recipes/{id}/
async fn delete_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.recipe_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_to_list(
    state: &AppState,
    user: &User,
    kind: RecipeListKind,
    id: i64,
) -> Result<(StatusCode, Json<RecipeShortResponse>), ApiError> {
    let recipe = state.collection_service.add(user, kind, id).await?;
    Ok((StatusCode::CREATED, Json(recipe.into())))
}

async fn remove_from_list(
    state: &AppState,
    user: &User,
    kind: RecipeListKind,
    id: i64,
) -> Result<StatusCode, ApiError> {
    state.collection_service.remove(user, kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/recipes/{id}/favorite/
async fn add_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<(StatusCode, Json<RecipeShortResponse>), ApiError> {
    let Path(id) = id?;
    add_to_list(&state, &user, RecipeListKind::Favorites, id).await
}

/// DELETE /api/recipes/{id}/favorite/
async fn remove_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    remove_from_list(&state, &user, RecipeListKind::Favorites, id).await
}

/// POST /api/recipes/{id}/shopping_cart/
async fn add_to_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<(StatusCode, Json<RecipeShortResponse>), ApiError> {
    let Path(id) = id?;
    add_to_list(&state, &user, RecipeListKind::ShoppingCart, id).await
}

/// DELETE /api/recipes/{id}/shopping_cart/
async fn remove_from_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    remove_from_list(&state, &user, RecipeListKind::ShoppingCart, id).await
}

/// GET /api/recipes/download_shopping_cart/
async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Response, ApiError> {
    let body = state.collection_service.download_shopping_list(&user).await?;

    let disposition = format!(
        "attachment; filename={}",
        state.limits.shopping_list_file_name
    );
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| ApiError::internal_error(format!("Invalid attachment name: {}", e)))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
