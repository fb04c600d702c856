//! # rr-api Handlers
//!
//! This module coordinates the flow between HTTP requests and Core traits.
//!
//! Every handler follows the same order: collection-stage permission check,
//! parent and target lookups (404), object-stage check, payload validation,
//! then the storage call.

pub mod auth;
pub mod comments;
pub mod reviews;
pub mod taxonomy;
pub mod titles;
pub mod users;

use axum::Json;
use serde_json::{json, Value};

use rr_core::error::AppError;
use rr_core::models::{Title, TitleId};

use crate::error::ApiError;
use crate::state::AppState;

pub type ApiResult<T> = Result<T, ApiError>;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn load_title(state: &AppState, title_id: TitleId) -> ApiResult<Title> {
    Ok(state
        .catalog
        .get_title(title_id)
        .await?
        .ok_or_else(|| AppError::not_found("title", title_id))?)
}
