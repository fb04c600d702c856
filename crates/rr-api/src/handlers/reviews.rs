//! Reviews nested under a title. The title comes from the path and the author
//! from the caller; neither is read from the payload.

use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use rr_core::drafts::ReviewPayload;
use rr_core::error::AppError;
use rr_core::models::{NewReview, Owned, Review, ReviewId, TitleId};
use rr_core::pagination::PageQuery;
use rr_core::permissions::{Method, CONTRIBUTION_POLICY};

use super::{load_title, ApiResult};
use crate::extract::{Actor, ApiJson, ApiPath, ApiQuery, JsonBody};
use crate::pagination::Paginated;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/titles/{title_id}/reviews/", get(list).post(create)).route(
        "/titles/{title_id}/reviews/{review_id}/",
        get(retrieve).patch(partial_update).put(update).delete(destroy),
    )
}

/// Loads the review only if it belongs to `title_id`.
pub(crate) async fn load_review(state: &AppState, title_id: TitleId, review_id: ReviewId) -> ApiResult<Review> {
    load_title(state, title_id).await?;
    Ok(state
        .reviews
        .get_review(title_id, review_id)
        .await?
        .ok_or_else(|| AppError::not_found("review", review_id))?)
}

pub async fn list(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(title_id): ApiPath<TitleId>,
    ApiQuery(page): ApiQuery<PageQuery>,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Json<Paginated<Review>>> {
    CONTRIBUTION_POLICY.check(Method::Get, actor.user())?;
    load_title(&state, title_id).await?;
    let page = state.reviews.list_reviews(title_id, page.into()).await?;
    Ok(Json(Paginated::from_page(page, &uri)))
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(title_id): ApiPath<TitleId>,
    body: JsonBody<ReviewPayload>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    CONTRIBUTION_POLICY.check(Method::Post, actor.user())?;
    let author = actor.require()?;
    load_title(&state, title_id).await?;
    let ApiJson(payload) = body?;
    let draft = payload.into_draft()?;
    let review = state
        .reviews
        .create_review(NewReview { title_id, author_id: author.id, text: draft.text, score: draft.score })
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((title_id, review_id)): ApiPath<(TitleId, ReviewId)>,
) -> ApiResult<Json<Review>> {
    CONTRIBUTION_POLICY.check(Method::Get, actor.user())?;
    let review = load_review(&state, title_id, review_id).await?;
    CONTRIBUTION_POLICY.check_object(Method::Get, actor.user(), Some(review.author_id()))?;
    Ok(Json(review))
}

pub async fn partial_update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((title_id, review_id)): ApiPath<(TitleId, ReviewId)>,
    body: JsonBody<ReviewPayload>,
) -> ApiResult<Json<Review>> {
    CONTRIBUTION_POLICY.check(Method::Patch, actor.user())?;
    let current = load_review(&state, title_id, review_id).await?;
    CONTRIBUTION_POLICY.check_object(Method::Patch, actor.user(), Some(current.author_id()))?;
    let ApiJson(payload) = body?;
    let draft = payload.merge(&current)?;
    Ok(Json(state.reviews.update_review(review_id, &draft).await?))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((title_id, review_id)): ApiPath<(TitleId, ReviewId)>,
    body: JsonBody<ReviewPayload>,
) -> ApiResult<Json<Review>> {
    CONTRIBUTION_POLICY.check(Method::Put, actor.user())?;
    let current = load_review(&state, title_id, review_id).await?;
    CONTRIBUTION_POLICY.check_object(Method::Put, actor.user(), Some(current.author_id()))?;
    let ApiJson(payload) = body?;
    let draft = payload.into_draft()?;
    Ok(Json(state.reviews.update_review(review_id, &draft).await?))
}

pub async fn destroy(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((title_id, review_id)): ApiPath<(TitleId, ReviewId)>,
) -> ApiResult<StatusCode> {
    CONTRIBUTION_POLICY.check(Method::Delete, actor.user())?;
    let review = load_review(&state, title_id, review_id).await?;
    CONTRIBUTION_POLICY.check_object(Method::Delete, actor.user(), Some(review.author_id()))?;
    state.reviews.delete_review(review_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
