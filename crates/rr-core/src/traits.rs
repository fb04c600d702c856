//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//!
//! Repositories return [`crate::Result`] so that storage constraint
//! violations reach callers as [`crate::AppError::Validation`]. The mail port
//! is pure infrastructure and reports plain `anyhow` failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::drafts::{ReviewDraft, TaxonDraft, TitleDraft};
use crate::error::Result;
use crate::models::{
    AccessClaims, Comment, CommentId, NewComment, NewReview, NewUser, OutboundMail, Review, ReviewId, Taxon,
    TaxonId, TaxonomyKind, Title, TitleId, User, UserId,
};
use crate::pagination::{Page, PageParams, TaxonFilter, TitleFilter, UserFilter};

/// Account persistence. Username and email are each unique.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Newest accounts first.
    async fn list_users(&self, filter: &UserFilter, page: PageParams) -> Result<Page<User>>;
    /// Persists every mutable field of `user` and returns the stored row.
    async fn update_user(&self, user: &User) -> Result<User>;
    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<()>;
    /// Cascades to the user's reviews and comments.
    async fn delete_user(&self, id: UserId) -> Result<bool>;
}

/// Categories, genres and titles.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CatalogRepo: Send + Sync {
    async fn create_taxon(&self, kind: TaxonomyKind, draft: &TaxonDraft) -> Result<Taxon>;
    /// Resolves by slug, falling back to the numeric id.
    async fn find_taxon(&self, kind: TaxonomyKind, key: &str) -> Result<Option<Taxon>>;
    async fn list_taxa(&self, kind: TaxonomyKind, filter: &TaxonFilter, page: PageParams) -> Result<Page<Taxon>>;
    async fn update_taxon(&self, kind: TaxonomyKind, id: TaxonId, draft: &TaxonDraft) -> Result<Taxon>;
    /// Titles survive: a deleted category is nulled, a deleted genre detached.
    async fn delete_taxon(&self, kind: TaxonomyKind, id: TaxonId) -> Result<bool>;

    /// Resolves the draft's slugs; an unknown slug is a validation error.
    async fn create_title(&self, draft: &TitleDraft) -> Result<TitleId>;
    /// Includes the rating aggregated from the current review set.
    async fn get_title(&self, id: TitleId) -> Result<Option<Title>>;
    async fn list_titles(&self, filter: &TitleFilter, page: PageParams) -> Result<Page<Title>>;
    async fn update_title(&self, id: TitleId, draft: &TitleDraft) -> Result<()>;
    /// Reviews of the title are kept with their title reference nulled.
    async fn delete_title(&self, id: TitleId) -> Result<bool>;
}

/// Reviews and their comment threads.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReviewRepo: Send + Sync {
    /// At most one review per (author, title); a second one is a validation error.
    async fn create_review(&self, review: NewReview) -> Result<Review>;
    async fn list_reviews(&self, title_id: TitleId, page: PageParams) -> Result<Page<Review>>;
    /// Only finds the review if it belongs to `title_id`.
    async fn get_review(&self, title_id: TitleId, review_id: ReviewId) -> Result<Option<Review>>;
    async fn update_review(&self, id: ReviewId, draft: &ReviewDraft) -> Result<Review>;
    /// Cascades to the review's comments.
    async fn delete_review(&self, id: ReviewId) -> Result<bool>;

    async fn create_comment(&self, comment: NewComment) -> Result<Comment>;
    async fn list_comments(&self, review_id: ReviewId, page: PageParams) -> Result<Page<Comment>>;
    /// Only finds the comment if it belongs to `review_id`.
    async fn get_comment(&self, review_id: ReviewId, comment_id: CommentId) -> Result<Option<Comment>>;
    async fn update_comment(&self, id: CommentId, text: &str) -> Result<Comment>;
    async fn delete_comment(&self, id: CommentId) -> Result<bool>;
}

/// Confirmation codes and access tokens.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AuthProvider: Send + Sync {
    /// Mints a fresh code bound to the user's current state. Never persisted.
    fn issue_confirmation_code(&self, user: &User) -> String;
    fn verify_confirmation_code(&self, user: &User, code: &str) -> bool;
    fn issue_access_token(&self, user: &User) -> Result<String>;
    fn verify_access_token(&self, token: &str) -> Result<AccessClaims>;
}

/// Outbound mail. A returned error means the message was not accepted.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutboundMail) -> anyhow::Result<()>;
}
