//! Tag API endpoints
//!
//! - GET /api/tags/ - All tags, not paginated
//! - GET /api/tags/{id}/ - Single tag

use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::TagResponse;

/// Build the tags router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags/", get(list_tags))
        .route("/tags/{id}/", get(get_tag))
}

/// GET /api/tags/
async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagResponse>>, ApiError> {
    let tags = state.tag_service.list().await?;
    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

/// GET /api/tags/{id}/
async fn get_tag(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<TagResponse>, ApiError> {
    let Path(id) = id?;
    let tag = state.tag_service.get_by_id(id).await?;
    Ok(Json(tag.into()))
}
