use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use rr_core::drafts::{StoredTitle, TitlePayload};
use rr_core::models::{Title, TitleId};
use rr_core::pagination::{PageQuery, TitleFilter};
use rr_core::permissions::{Method, CATALOG_POLICY};

use super::{load_title, ApiResult};
use crate::extract::{Actor, ApiJson, ApiPath, ApiQuery, JsonBody};
use crate::pagination::Paginated;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/titles/", get(list).post(create)).route(
        "/titles/{title_id}/",
        get(retrieve).patch(partial_update).put(update).delete(destroy),
    )
}

pub async fn list(
    State(state): State<AppState>,
    actor: Actor,
    ApiQuery(filter): ApiQuery<TitleFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Json<Paginated<Title>>> {
    CATALOG_POLICY.check(Method::Get, actor.user())?;
    let page = state.catalog.list_titles(&filter, page.into()).await?;
    Ok(Json(Paginated::from_page(page, &uri)))
}

/// Responds with the write form: taxonomy as slugs.
pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    body: JsonBody<TitlePayload>,
) -> ApiResult<(StatusCode, Json<StoredTitle>)> {
    CATALOG_POLICY.check(Method::Post, actor.user())?;
    let ApiJson(payload) = body?;
    let draft = payload.into_draft()?;
    let id = state.catalog.create_title(&draft).await?;
    info!(title_id = id, name = %draft.name, "title created");
    Ok((StatusCode::CREATED, Json(StoredTitle { id, draft })))
}

pub async fn retrieve(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(title_id): ApiPath<TitleId>,
) -> ApiResult<Json<Title>> {
    CATALOG_POLICY.check(Method::Get, actor.user())?;
    let title = load_title(&state, title_id).await?;
    Ok(Json(title))
}

pub async fn partial_update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(title_id): ApiPath<TitleId>,
    body: JsonBody<TitlePayload>,
) -> ApiResult<Json<StoredTitle>> {
    CATALOG_POLICY.check(Method::Patch, actor.user())?;
    let current = load_title(&state, title_id).await?;
    CATALOG_POLICY.check_object(Method::Patch, actor.user(), None)?;
    let ApiJson(payload) = body?;
    let draft = payload.merge(&current)?;
    state.catalog.update_title(title_id, &draft).await?;
    Ok(Json(StoredTitle { id: title_id, draft }))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(title_id): ApiPath<TitleId>,
    body: JsonBody<TitlePayload>,
) -> ApiResult<Json<StoredTitle>> {
    CATALOG_POLICY.check(Method::Put, actor.user())?;
    load_title(&state, title_id).await?;
    CATALOG_POLICY.check_object(Method::Put, actor.user(), None)?;
    let ApiJson(payload) = body?;
    let draft = payload.into_draft()?;
    state.catalog.update_title(title_id, &draft).await?;
    Ok(Json(StoredTitle { id: title_id, draft }))
}

pub async fn destroy(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(title_id): ApiPath<TitleId>,
) -> ApiResult<StatusCode> {
    CATALOG_POLICY.check(Method::Delete, actor.user())?;
    load_title(&state, title_id).await?;
    CATALOG_POLICY.check_object(Method::Delete, actor.user(), None)?;
    state.catalog.delete_title(title_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
