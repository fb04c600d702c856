//! Account administration (`/users/`) and the caller's own profile (`/users/me/`).

use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use rr_core::drafts::UserPayload;
use rr_core::error::AppError;
use rr_core::models::{User, UserProfile};
use rr_core::pagination::{PageQuery, UserFilter};
use rr_core::permissions::{Method, ACCOUNTS_POLICY, SELF_POLICY};

use super::ApiResult;
use crate::extract::{Actor, ApiJson, ApiPath, ApiQuery, JsonBody};
use crate::pagination::Paginated;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    // Static segments win over captures, so `me` never reaches `{username}`.
    Router::new()
        .route("/users/", get(list).post(create))
        .route("/users/me/", get(me).patch(update_me))
        .route("/users/{username}/", get(retrieve).patch(partial_update).put(update).delete(destroy))
}

async fn load_user(state: &AppState, username: &str) -> ApiResult<User> {
    Ok(state
        .accounts
        .users()
        .get_user_by_username(username)
        .await?
        .ok_or_else(|| AppError::not_found("user", username))?)
}

pub async fn list(
    State(state): State<AppState>,
    actor: Actor,
    ApiQuery(filter): ApiQuery<UserFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Json<Paginated<UserProfile>>> {
    ACCOUNTS_POLICY.check(Method::Get, actor.user())?;
    let page = state.accounts.users().list_users(&filter, page.into()).await?;
    Ok(Json(Paginated::from_page(page.map(|u| UserProfile::from(&u)), &uri)))
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    body: JsonBody<UserPayload>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    ACCOUNTS_POLICY.check(Method::Post, actor.user())?;
    let ApiJson(payload) = body?;
    let user = state.accounts.create_account(payload).await?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

pub async fn retrieve(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(username): ApiPath<String>,
) -> ApiResult<Json<UserProfile>> {
    ACCOUNTS_POLICY.check(Method::Get, actor.user())?;
    let user = load_user(&state, &username).await?;
    Ok(Json(UserProfile::from(&user)))
}

pub async fn partial_update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(username): ApiPath<String>,
    body: JsonBody<UserPayload>,
) -> ApiResult<Json<UserProfile>> {
    ACCOUNTS_POLICY.check(Method::Patch, actor.user())?;
    let target = load_user(&state, &username).await?;
    ACCOUNTS_POLICY.check_object(Method::Patch, actor.user(), None)?;
    let ApiJson(payload) = body?;
    let updated = state.accounts.update_account(&target, payload).await?;
    Ok(Json(UserProfile::from(&updated)))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(username): ApiPath<String>,
    body: JsonBody<UserPayload>,
) -> ApiResult<Json<UserProfile>> {
    ACCOUNTS_POLICY.check(Method::Put, actor.user())?;
    let target = load_user(&state, &username).await?;
    ACCOUNTS_POLICY.check_object(Method::Put, actor.user(), None)?;
    let ApiJson(payload) = body?;
    let updated = state.accounts.replace_account(&target, payload).await?;
    Ok(Json(UserProfile::from(&updated)))
}

pub async fn destroy(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(username): ApiPath<String>,
) -> ApiResult<StatusCode> {
    ACCOUNTS_POLICY.check(Method::Delete, actor.user())?;
    let target = load_user(&state, &username).await?;
    ACCOUNTS_POLICY.check_object(Method::Delete, actor.user(), None)?;
    state.accounts.users().delete_user(target.id).await?;
    info!(user_id = target.id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(actor: Actor) -> ApiResult<Json<UserProfile>> {
    SELF_POLICY.check(Method::Get, actor.user())?;
    Ok(Json(UserProfile::from(actor.require()?)))
}

pub async fn update_me(
    State(state): State<AppState>,
    actor: Actor,
    body: JsonBody<UserPayload>,
) -> ApiResult<Json<UserProfile>> {
    SELF_POLICY.check(Method::Patch, actor.user())?;
    let ApiJson(payload) = body?;
    let updated = state.accounts.update_own_profile(actor.require()?, payload).await?;
    Ok(Json(UserProfile::from(&updated)))
}
