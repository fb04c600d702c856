//! Request extractors whose rejections use the API error format.

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use rr_core::error::AppError;
use rr_core::models::User;

use crate::error::ApiError;
use crate::state::AppState;

/// JSON body; malformed input is a validation error.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// A JSON body whose parse error is held back, so handlers can run their
/// permission checks and lookups before reporting it.
pub type JsonBody<T> = Result<ApiJson<T>, ApiError>;

/// Query string; malformed input is a validation error.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters; unparsable ids are "not found".
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// The caller, resolved from `Authorization: Bearer <token>`.
///
/// No header means an anonymous caller. A header that is present but
/// unusable rejects the request, whatever the method.
pub struct Actor(pub Option<User>);

impl Actor {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    /// The authenticated user; only call after a policy that requires one.
    pub fn require(&self) -> Result<&User, ApiError> {
        self.0
            .as_ref()
            .ok_or_else(|| ApiError(AppError::Unauthorized("authentication credentials were not provided".into())))
    }
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Actor(None));
        };
        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("malformed authorization header".into()))?;

        let user = state.accounts.authenticate(token).await?;
        Ok(Actor(Some(user)))
    }
}
