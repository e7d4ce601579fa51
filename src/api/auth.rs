//! Token authentication endpoints
//!
//! - POST /api/auth/token/login/ - Exchange email and password for a token
//! - POST /api/auth/token/logout/ - Revoke the current token

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{token_from_headers, ApiError, AppState, AuthenticatedUser};
use crate::services::LoginInput;

/// Request body for token login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for a successful login
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub auth_token: String,
}

/// Build the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/token/login/", post(login))
        .route("/auth/token/logout/", post(logout))
}

/// POST /api/auth/token/login/
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(body) = payload?;
    let session = state
        .user_service
        .login(LoginInput {
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok(Json(TokenResponse {
        auth_token: session.id,
    }))
}

/// POST /api/auth/token/logout/
async fn logout(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    if let Some(token) = token_from_headers(&headers) {
        state.user_service.logout(&token).await?;
    }
    tracing::debug!(user_id = user.id, "Logged out");
    Ok(StatusCode::NO_CONTENT)
}
