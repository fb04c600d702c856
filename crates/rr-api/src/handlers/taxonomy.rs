//! Categories and genres: two slugged taxonomies served by one set of handlers.

use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use rr_core::drafts::TaxonPayload;
use rr_core::error::AppError;
use rr_core::models::{Taxon, TaxonomyKind};
use rr_core::pagination::{PageQuery, TaxonFilter};
use rr_core::permissions::{Method, CATALOG_POLICY};

use super::ApiResult;
use crate::extract::{Actor, ApiJson, ApiPath, ApiQuery, JsonBody};
use crate::pagination::Paginated;
use crate::state::AppState;

/// Selects the taxonomy a handler instance serves.
pub trait Taxonomy: Send + Sync + 'static {
    const KIND: TaxonomyKind;
}

pub struct Categories;
pub struct Genres;

impl Taxonomy for Categories {
    const KIND: TaxonomyKind = TaxonomyKind::Category;
}

impl Taxonomy for Genres {
    const KIND: TaxonomyKind = TaxonomyKind::Genre;
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories/", get(list::<Categories>).post(create::<Categories>))
        .route(
            "/categories/{key}/",
            get(retrieve::<Categories>)
                .patch(partial_update::<Categories>)
                .put(update::<Categories>)
                .delete(destroy::<Categories>),
        )
        .route("/genres/", get(list::<Genres>).post(create::<Genres>))
        .route(
            "/genres/{key}/",
            get(retrieve::<Genres>)
                .patch(partial_update::<Genres>)
                .put(update::<Genres>)
                .delete(destroy::<Genres>),
        )
}

async fn find<K: Taxonomy>(state: &AppState, key: &str) -> ApiResult<Taxon> {
    Ok(state
        .catalog
        .find_taxon(K::KIND, key)
        .await?
        .ok_or_else(|| AppError::not_found(K::KIND.entity_name(), key))?)
}

pub async fn list<K: Taxonomy>(
    State(state): State<AppState>,
    actor: Actor,
    ApiQuery(filter): ApiQuery<TaxonFilter>,
    ApiQuery(page): ApiQuery<PageQuery>,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Json<Paginated<Taxon>>> {
    CATALOG_POLICY.check(Method::Get, actor.user())?;
    let page = state.catalog.list_taxa(K::KIND, &filter, page.into()).await?;
    Ok(Json(Paginated::from_page(page, &uri)))
}

pub async fn create<K: Taxonomy>(
    State(state): State<AppState>,
    actor: Actor,
    body: JsonBody<TaxonPayload>,
) -> ApiResult<(StatusCode, Json<Taxon>)> {
    CATALOG_POLICY.check(Method::Post, actor.user())?;
    let ApiJson(payload) = body?;
    let draft = payload.into_draft()?;
    let taxon = state.catalog.create_taxon(K::KIND, &draft).await?;
    info!(kind = K::KIND.entity_name(), slug = %taxon.slug, "taxon created");
    Ok((StatusCode::CREATED, Json(taxon)))
}

pub async fn retrieve<K: Taxonomy>(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(key): ApiPath<String>,
) -> ApiResult<Json<Taxon>> {
    CATALOG_POLICY.check(Method::Get, actor.user())?;
    let taxon = find::<K>(&state, &key).await?;
    CATALOG_POLICY.check_object(Method::Get, actor.user(), None)?;
    Ok(Json(taxon))
}

pub async fn partial_update<K: Taxonomy>(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(key): ApiPath<String>,
    body: JsonBody<TaxonPayload>,
) -> ApiResult<Json<Taxon>> {
    CATALOG_POLICY.check(Method::Patch, actor.user())?;
    let current = find::<K>(&state, &key).await?;
    CATALOG_POLICY.check_object(Method::Patch, actor.user(), None)?;
    let ApiJson(payload) = body?;
    let draft = payload.merge(&current)?;
    Ok(Json(state.catalog.update_taxon(K::KIND, current.id, &draft).await?))
}

pub async fn update<K: Taxonomy>(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(key): ApiPath<String>,
    body: JsonBody<TaxonPayload>,
) -> ApiResult<Json<Taxon>> {
    CATALOG_POLICY.check(Method::Put, actor.user())?;
    let current = find::<K>(&state, &key).await?;
    CATALOG_POLICY.check_object(Method::Put, actor.user(), None)?;
    let ApiJson(payload) = body?;
    let draft = payload.into_draft()?;
    Ok(Json(state.catalog.update_taxon(K::KIND, current.id, &draft).await?))
}

/// Answers 204 together with the removed entry.
pub async fn destroy<K: Taxonomy>(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(key): ApiPath<String>,
) -> ApiResult<(StatusCode, Json<Taxon>)> {
    CATALOG_POLICY.check(Method::Delete, actor.user())?;
    let taxon = find::<K>(&state, &key).await?;
    CATALOG_POLICY.check_object(Method::Delete, actor.user(), None)?;
    if !state.catalog.delete_taxon(K::KIND, taxon.id).await? {
        return Err(AppError::not_found(K::KIND.entity_name(), key).into());
    }
    Ok((StatusCode::NO_CONTENT, Json(taxon)))
}
