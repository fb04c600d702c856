//! # Payloads and Drafts
//!
//! Request payloads arrive with every field optional. A payload is turned into
//! a validated draft either whole (`into_draft`, for create and PUT) or laid
//! over the stored entity (`merge`, for PATCH). Payloads carry no author or
//! parent fields: those always come from the request context.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Review, Role, Taxon, Title, TitleId, User};
use crate::validation::{self, Validator};

/// Treats an empty string as an absent optional text.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxonPayload {
    pub name: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonDraft {
    pub name: String,
    pub slug: String,
}

impl TaxonPayload {
    pub fn into_draft(self) -> Result<TaxonDraft> {
        let mut v = Validator::new();
        let name = v.required("name", self.name);
        let slug = v.required("slug", self.slug);
        Self::finish(v, name.unwrap_or_default(), slug.unwrap_or_default())
    }

    pub fn merge(self, current: &Taxon) -> Result<TaxonDraft> {
        let name = self.name.unwrap_or_else(|| current.name.clone());
        let slug = self.slug.unwrap_or_else(|| current.slug.clone());
        Self::finish(Validator::new(), name, slug)
    }

    fn finish(mut v: Validator, name: String, slug: String) -> Result<TaxonDraft> {
        if !v.has_errors("name") {
            v.text("name", &name, validation::TAXON_NAME_MAX);
        }
        if !v.has_errors("slug") {
            v.slug("slug", &slug);
        }
        v.finish()?;
        Ok(TaxonDraft { name, slug })
    }
}

/// Write form of a Title: taxonomy is referenced by slug.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitlePayload {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub genre: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleDraft {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    /// Category slug
    pub category: Option<String>,
    /// Genre slugs
    pub genre: Vec<String>,
}

/// Write representation returned after create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredTitle {
    pub id: TitleId,
    #[serde(flatten)]
    pub draft: TitleDraft,
}

impl TitlePayload {
    pub fn into_draft(self) -> Result<TitleDraft> {
        let mut v = Validator::new();
        let name = v.required("name", self.name);
        let year = v.required("year", self.year);
        let draft = TitleDraft {
            name: name.unwrap_or_default(),
            year: year.unwrap_or_default(),
            description: non_empty(self.description),
            category: non_empty(self.category),
            genre: self.genre.unwrap_or_default(),
        };
        Self::finish(v, draft)
    }

    pub fn merge(self, current: &Title) -> Result<TitleDraft> {
        let draft = TitleDraft {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            year: self.year.unwrap_or(current.year),
            description: match self.description {
                Some(text) => non_empty(Some(text)),
                None => current.description.clone(),
            },
            category: match self.category {
                Some(slug) => non_empty(Some(slug)),
                None => current.category.as_ref().map(|c| c.slug.clone()),
            },
            genre: self
                .genre
                .unwrap_or_else(|| current.genres.iter().map(|g| g.slug.clone()).collect()),
        };
        Self::finish(Validator::new(), draft)
    }

    fn finish(mut v: Validator, mut draft: TitleDraft) -> Result<TitleDraft> {
        if !v.has_errors("name") {
            v.text("name", &draft.name, validation::TITLE_NAME_MAX);
        }
        if !v.has_errors("year") && draft.year > Utc::now().year() {
            v.push("year", "The release year cannot be in the future.");
        }
        if let Some(description) = &draft.description {
            v.max_len("description", description, validation::DESCRIPTION_MAX);
        }
        draft.genre.sort();
        draft.genre.dedup();
        v.finish()?;
        Ok(draft)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewPayload {
    pub text: Option<String>,
    pub score: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub text: String,
    pub score: u8,
}

impl ReviewPayload {
    pub fn into_draft(self) -> Result<ReviewDraft> {
        let mut v = Validator::new();
        let text = v.required("text", self.text);
        let score = v.required("score", self.score);
        Self::finish(v, text.unwrap_or_default(), score.unwrap_or_default())
    }

    pub fn merge(self, current: &Review) -> Result<ReviewDraft> {
        let text = self.text.unwrap_or_else(|| current.text.clone());
        let score = self.score.unwrap_or_else(|| i64::from(current.score));
        Self::finish(Validator::new(), text, score)
    }

    fn finish(mut v: Validator, text: String, score: i64) -> Result<ReviewDraft> {
        if !v.has_errors("text") && text.trim().is_empty() {
            v.push("text", validation::BLANK);
        }
        if !v.has_errors("score") {
            v.score("score", score);
        }
        v.finish()?;
        let score = u8::try_from(score).unwrap_or(validation::SCORE_MAX as u8);
        Ok(ReviewDraft { text, score })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentPayload {
    pub text: Option<String>,
}

impl CommentPayload {
    /// Comment text; PATCH without `text` keeps `current`.
    pub fn into_text(self, current: Option<&str>) -> Result<String> {
        let mut v = Validator::new();
        let text = match (self.text, current) {
            (Some(text), _) => Some(text),
            (None, Some(existing)) => Some(existing.to_string()),
            (None, None) => v.required("text", None::<String>),
        };
        let text = text.unwrap_or_default();
        if !v.has_errors("text") && text.trim().is_empty() {
            v.push("text", validation::BLANK);
        }
        v.finish()?;
        Ok(text)
    }
}

/// Account fields accepted from admins and, minus `role`, from the account owner.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPayload {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

impl UserPayload {
    /// Applies the payload over `current`. Uniqueness is left to storage.
    pub fn apply(self, current: &User) -> Result<User> {
        let mut user = current.clone();
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if self.bio.is_some() {
            user.bio = non_empty(self.bio);
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        validate_account(&user.username, &user.email, &user.first_name, &user.last_name)?;
        Ok(user)
    }
}

/// Shared account field rules.
pub fn validate_account(username: &str, email: &str, first_name: &str, last_name: &str) -> Result<()> {
    let mut v = Validator::new();
    v.username("username", username);
    v.email("email", email);
    v.max_len("first_name", first_name, validation::PERSON_NAME_MAX);
    v.max_len("last_name", last_name, validation::PERSON_NAME_MAX);
    v.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn title() -> Title {
        Title {
            id: 5,
            name: "Solaris".into(),
            year: 1961,
            rating: Some(9),
            description: Some("Ocean planet".into()),
            genres: vec![Taxon { id: 1, name: "Sci-Fi".into(), slug: "sci-fi".into() }],
            category: Some(Taxon { id: 2, name: "Books".into(), slug: "books".into() }),
        }
    }

    #[test]
    fn title_create_requires_name_and_year() {
        let err = TitlePayload::default().into_draft().unwrap_err();
        let AppError::Validation(errors) = err else { panic!("expected validation") };
        assert_eq!(errors["name"], vec![validation::REQUIRED.to_string()]);
        assert_eq!(errors["year"], vec![validation::REQUIRED.to_string()]);
    }

    #[test]
    fn title_patch_keeps_unsent_fields() {
        let payload = TitlePayload { year: Some(1972), ..Default::default() };
        let draft = payload.merge(&title()).unwrap();
        assert_eq!(draft.name, "Solaris");
        assert_eq!(draft.year, 1972);
        assert_eq!(draft.category.as_deref(), Some("books"));
        assert_eq!(draft.genre, vec!["sci-fi".to_string()]);
    }

    #[test]
    fn future_year_is_rejected() {
        let payload = TitlePayload { name: Some("Later".into()), year: Some(9999), ..Default::default() };
        assert!(matches!(payload.into_draft(), Err(AppError::Validation(e)) if e.contains_key("year")));
    }

    #[test]
    fn review_score_is_bounded() {
        let payload = ReviewPayload { text: Some("ok".into()), score: Some(11) };
        assert!(matches!(payload.into_draft(), Err(AppError::Validation(e)) if e.contains_key("score")));
        let payload = ReviewPayload { text: Some("ok".into()), score: Some(9) };
        assert_eq!(payload.into_draft().unwrap(), ReviewDraft { text: "ok".into(), score: 9 });
    }

    #[test]
    fn comment_patch_without_text_keeps_current() {
        let text = CommentPayload::default().into_text(Some("first")).unwrap();
        assert_eq!(text, "first");
        assert!(CommentPayload::default().into_text(None).is_err());
    }
}
