//! Field-level validation rules shared by every payload.
//!
//! Rules accumulate into a [`Validator`] so a single response reports every
//! offending field at once.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, FieldErrors, Result};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

pub const USERNAME_MAX: usize = 150;
pub const EMAIL_MAX: usize = 254;
pub const PERSON_NAME_MAX: usize = 150;
pub const TAXON_NAME_MAX: usize = 256;
pub const SLUG_MAX: usize = 50;
pub const TITLE_NAME_MAX: usize = 200;
pub const DESCRIPTION_MAX: usize = 200;
pub const SCORE_MIN: i64 = 1;
pub const SCORE_MAX: i64 = 10;

/// Reserved for the self-service profile route.
pub const RESERVED_USERNAME: &str = "me";

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+\z").expect("valid username pattern"));
static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+\z").expect("valid slug pattern"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+\z").expect("valid email pattern"));

#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn has_errors(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Returns the value when present, recording the "required" error otherwise.
    pub fn required<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.push(field, REQUIRED);
        }
        value
    }

    /// Non-blank text of at most `max` characters.
    pub fn text(&mut self, field: &str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.push(field, BLANK);
        } else {
            self.max_len(field, value, max);
        }
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.push(field, format!("Ensure this field has no more than {} characters.", max));
        }
    }

    pub fn slug(&mut self, field: &str, value: &str) {
        self.text(field, value, SLUG_MAX);
        if !value.is_empty() && !SLUG_RE.is_match(value) {
            self.push(
                field,
                "Enter a valid \"slug\" consisting of letters, numbers, underscores or hyphens.",
            );
        }
    }

    pub fn username(&mut self, field: &str, value: &str) {
        self.text(field, value, USERNAME_MAX);
        if value.is_empty() {
            return;
        }
        if !USERNAME_RE.is_match(value) {
            self.push(
                field,
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        if value.eq_ignore_ascii_case(RESERVED_USERNAME) {
            self.push(field, format!("The username \"{}\" is reserved.", RESERVED_USERNAME));
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        self.text(field, value, EMAIL_MAX);
        if !value.is_empty() && !EMAIL_RE.is_match(value) {
            self.push(field, "Enter a valid email address.");
        }
    }

    pub fn score(&mut self, field: &str, value: i64) {
        if value < SCORE_MIN {
            self.push(field, format!("Ensure this value is greater than or equal to {}.", SCORE_MIN));
        } else if value > SCORE_MAX {
            self.push(field, format!("Ensure this value is less than or equal to {}.", SCORE_MAX));
        }
    }

    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_of(v: Validator) -> FieldErrors {
        match v.finish() {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn username_rules() {
        let mut v = Validator::new();
        v.username("username", "me");
        v.username("other", "bad name!");
        let errors = errors_of(v);
        assert!(errors["username"][0].contains("reserved"));
        assert!(errors["other"][0].starts_with("Enter a valid username"));

        let mut v = Validator::new();
        v.username("username", "jane.doe+reviews@home");
        assert!(v.finish().is_ok());
    }

    #[test]
    fn slug_and_email_rules() {
        let mut v = Validator::new();
        v.slug("slug", "sci fi");
        v.email("email", "not-an-address");
        let errors = errors_of(v);
        assert_eq!(errors.len(), 2);

        let mut v = Validator::new();
        v.slug("slug", "sci-fi_2");
        v.email("email", "reader@example.org");
        assert!(v.finish().is_ok());
    }

    #[test]
    fn score_bounds() {
        let mut v = Validator::new();
        v.score("score", 0);
        v.score("high", 11);
        v.score("ok", 10);
        let errors = errors_of(v);
        assert!(errors.contains_key("score"));
        assert!(errors.contains_key("high"));
        assert!(!errors.contains_key("ok"));
    }

    #[test]
    fn length_is_counted_in_characters() {
        let mut v = Validator::new();
        v.max_len("name", &"ж".repeat(SLUG_MAX), SLUG_MAX);
        assert!(v.finish().is_ok());
    }
}
