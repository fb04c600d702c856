//! # rr-api
//!
//! The HTTP routing and orchestration layer for Rusty-Reviews.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod pagination;
pub mod state;

use axum::routing::get;
use axum::Router;

pub use error::ApiError;
pub use metrics::Metrics;
pub use state::AppState;

/// Mount point of the resource API.
pub const API_PREFIX: &str = "/api/v1";

/// Builds the complete application: resource routes under [`API_PREFIX`],
/// `/health`, `/metrics` and the standard middleware stack.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(handlers::taxonomy::routes())
        .merge(handlers::titles::routes())
        .merge(handlers::reviews::routes())
        .merge(handlers::comments::routes())
        .merge(handlers::users::routes())
        .merge(handlers::auth::routes());

    let app = Router::new()
        .nest(API_PREFIX, api)
        .route("/health", get(handlers::health))
        .route("/metrics", get(metrics::render));

    middleware::apply(app, state.clone()).with_state(state)
}
