//! Ingredient API endpoints
//!
//! - GET /api/ingredients/?name=<prefix> - Catalogue, filtered by a
//!   case-insensitive name prefix; not paginated
//! - GET /api/ingredients/{id}/ - Single ingredient

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::IngredientResponse;

/// Query parameters for the ingredient list
#[derive(Debug, Deserialize)]
pub struct ListIngredientsQuery {
    pub name: Option<String>,
}

/// Build the ingredients router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ingredients/", get(list_ingredients))
        .route("/ingredients/{id}/", get(get_ingredient))
}

/// GET /api/ingredients/
async fn list_ingredients(
    State(state): State<AppState>,
    query: Result<Query<ListIngredientsQuery>, QueryRejection>,
) -> Result<Json<Vec<IngredientResponse>>, ApiError> {
    let Query(query) = query?;
    let ingredients = state.ingredient_service.list(query.name.as_deref()).await?;
    Ok(Json(ingredients.into_iter().map(Into::into).collect()))
}

/// GET /api/ingredients/{id}/
async fn get_ingredient(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<IngredientResponse>, ApiError> {
    let Path(id) = id?;
    let ingredient = state.ingredient_service.get_by_id(id).await?;
    Ok(Json(ingredient.into()))
}
