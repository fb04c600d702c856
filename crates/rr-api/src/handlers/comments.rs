use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use rr_core::drafts::CommentPayload;
use rr_core::error::AppError;
use rr_core::models::{Comment, CommentId, NewComment, Owned, ReviewId, TitleId};
use rr_core::pagination::PageQuery;
use rr_core::permissions::{Method, CONTRIBUTION_POLICY};

use super::reviews::load_review;
use super::ApiResult;
use crate::extract::{Actor, ApiJson, ApiPath, ApiQuery, JsonBody};
use crate::pagination::Paginated;
use crate::state::AppState;

type ReviewPath = (TitleId, ReviewId);
type CommentPath = (TitleId, ReviewId, CommentId);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/titles/{title_id}/reviews/{review_id}/comments/", get(list).post(create))
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}/",
            get(retrieve).patch(partial_update).put(update).delete(destroy),
        )
}

async fn load_comment(state: &AppState, (title_id, review_id, comment_id): CommentPath) -> ApiResult<Comment> {
    load_review(state, title_id, review_id).await?;
    Ok(state
        .reviews
        .get_comment(review_id, comment_id)
        .await?
        .ok_or_else(|| AppError::not_found("comment", comment_id))?)
}

pub async fn list(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((title_id, review_id)): ApiPath<ReviewPath>,
    ApiQuery(page): ApiQuery<PageQuery>,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Json<Paginated<Comment>>> {
    CONTRIBUTION_POLICY.check(Method::Get, actor.user())?;
    load_review(&state, title_id, review_id).await?;
    let page = state.reviews.list_comments(review_id, page.into()).await?;
    Ok(Json(Paginated::from_page(page, &uri)))
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((title_id, review_id)): ApiPath<ReviewPath>,
    body: JsonBody<CommentPayload>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    CONTRIBUTION_POLICY.check(Method::Post, actor.user())?;
    let author = actor.require()?;
    load_review(&state, title_id, review_id).await?;
    let ApiJson(payload) = body?;
    let text = payload.into_text(None)?;
    let comment = state
        .reviews
        .create_comment(NewComment { review_id, author_id: author.id, text })
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(path): ApiPath<CommentPath>,
) -> ApiResult<Json<Comment>> {
    CONTRIBUTION_POLICY.check(Method::Get, actor.user())?;
    let comment = load_comment(&state, path).await?;
    CONTRIBUTION_POLICY.check_object(Method::Get, actor.user(), Some(comment.author_id()))?;
    Ok(Json(comment))
}

pub async fn partial_update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(path): ApiPath<CommentPath>,
    body: JsonBody<CommentPayload>,
) -> ApiResult<Json<Comment>> {
    CONTRIBUTION_POLICY.check(Method::Patch, actor.user())?;
    let current = load_comment(&state, path).await?;
    CONTRIBUTION_POLICY.check_object(Method::Patch, actor.user(), Some(current.author_id()))?;
    let ApiJson(payload) = body?;
    let text = payload.into_text(Some(&current.text))?;
    Ok(Json(state.reviews.update_comment(current.id, &text).await?))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(path): ApiPath<CommentPath>,
    body: JsonBody<CommentPayload>,
) -> ApiResult<Json<Comment>> {
    CONTRIBUTION_POLICY.check(Method::Put, actor.user())?;
    let current = load_comment(&state, path).await?;
    CONTRIBUTION_POLICY.check_object(Method::Put, actor.user(), Some(current.author_id()))?;
    let ApiJson(payload) = body?;
    let text = payload.into_text(None)?;
    Ok(Json(state.reviews.update_comment(current.id, &text).await?))
}

pub async fn destroy(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(path): ApiPath<CommentPath>,
) -> ApiResult<StatusCode> {
    CONTRIBUTION_POLICY.check(Method::Delete, actor.user())?;
    let comment = load_comment(&state, path).await?;
    CONTRIBUTION_POLICY.check_object(Method::Delete, actor.user(), Some(comment.author_id()))?;
    state.reviews.delete_comment(comment.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
