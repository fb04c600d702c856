//! # Domain Models
//!
//! These structs represent the core entities of Rusty-Reviews.
//! Identifiers are storage-assigned integers, matching the public URL scheme
//! (e.g. `/titles/5/reviews/`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub type UserId = i64;
pub type TaxonId = i64;
pub type TitleId = i64;
pub type ReviewId = i64;
pub type CommentId = i64;

/// Authorization tier of an account. Variants are declared in ladder order,
/// so `Ord` compares capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::field("role", format!("\"{}\" is not a valid choice.", other))),
        }
    }
}

/// A registered account, confirmed or still pending its first token.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub role: Role,
    /// Operational override: grants administrative capability regardless of `role`.
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
    /// Bumped on every token exchange; part of the confirmation-code state.
    pub last_login: Option<DateTime<Utc>>,
}

/// Public representation of a [`User`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub role: Role,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            bio: user.bio.clone(),
            role: user.role,
        }
    }
}

/// Insert form of a [`User`]; storage assigns `id` and `date_joined`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub role: Role,
    pub is_superuser: bool,
}

impl NewUser {
    /// A baseline account as created by the signup flow.
    pub fn signup(username: &str, email: &str) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            bio: None,
            role: Role::User,
            is_superuser: false,
        }
    }
}

/// The two slugged taxonomies share one shape and one set of operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaxonomyKind {
    Category,
    Genre,
}

impl TaxonomyKind {
    pub fn entity_name(&self) -> &'static str {
        match self {
            TaxonomyKind::Category => "category",
            TaxonomyKind::Genre => "genre",
        }
    }
}

/// A Category or Genre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Taxon {
    #[serde(skip)]
    pub id: TaxonId,
    pub name: String,
    /// URL-safe lookup key (e.g., "sci-fi")
    pub slug: String,
}

/// The read representation of a reviewable work: taxonomy is nested and the
/// rating is aggregated from the current review set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub id: TitleId,
    pub name: String,
    pub year: i32,
    pub rating: Option<u8>,
    pub description: Option<String>,
    #[serde(rename = "genre")]
    pub genres: Vec<Taxon>,
    pub category: Option<Taxon>,
}

/// Author ownership for the object-level permission stage.
pub trait Owned {
    fn author_id(&self) -> UserId;
}

/// One author's scored opinion of one Title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub id: ReviewId,
    /// `None` once the Title has been deleted.
    #[serde(skip)]
    pub title_id: Option<TitleId>,
    #[serde(skip)]
    pub author_id: UserId,
    pub text: String,
    /// Author's username
    pub author: String,
    pub score: u8,
    pub pub_date: DateTime<Utc>,
}

impl Owned for Review {
    fn author_id(&self) -> UserId {
        self.author_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub title_id: TitleId,
    pub author_id: UserId,
    pub text: String,
    pub score: u8,
}

/// A reply to a Review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(skip)]
    pub review_id: ReviewId,
    #[serde(skip)]
    pub author_id: UserId,
    pub text: String,
    pub author: String,
    pub pub_date: DateTime<Utc>,
}

impl Owned for Comment {
    fn author_id(&self) -> UserId {
        self.author_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub review_id: ReviewId,
    pub author_id: UserId,
    pub text: String,
}

/// Identity recovered from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    pub user_id: UserId,
    pub username: String,
}

/// A message handed to the outbound mail collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupResponse {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    pub username: Option<String>,
    pub confirmation_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_order_as_a_ladder() {
        assert!(Role::User < Role::Moderator);
        assert!(Role::Moderator < Role::Admin);
        assert_eq!("moderator".parse::<Role>().unwrap(), Role::Moderator);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn taxon_serializes_without_id() {
        let taxon = Taxon { id: 3, name: "Drama".into(), slug: "drama".into() };
        let value = serde_json::to_value(&taxon).unwrap();
        assert_eq!(value, serde_json::json!({ "name": "Drama", "slug": "drama" }));
    }
}
