//! Signup and token exchange. Both routes are open to anonymous callers.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use rr_core::models::{SignupRequest, SignupResponse, TokenRequest, TokenResponse};

use super::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup/", post(signup))
        .route("/auth/token/", post(token))
}

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> ApiResult<Json<SignupResponse>> {
    Ok(Json(state.accounts.signup(request).await?))
}

pub async fn token(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    Ok(Json(state.accounts.obtain_token(request).await?))
}
