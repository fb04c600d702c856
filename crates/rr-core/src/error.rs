//! # AppError
//!
//! Centralized error handling for the Rusty-Reviews ecosystem.
//! Maps domain-specific failures to actionable error types.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Field name to the list of messages reported against it.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Key used for errors that are not tied to a single payload field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// The primary error type for all rr-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Title, Review, User)
    #[error("{0} not found with key {1}")]
    NotFound(String, String),

    /// Malformed or missing fields, and storage constraint violations
    #[error("validation error: {}", Summary(.0))]
    Validation(FieldErrors),

    /// Missing or invalid credentials (bearer token, confirmation code)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but the role or ownership check failed
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The confirmation code could not be handed to the mail collaborator
    #[error("delivery failure: {0}")]
    Delivery(String),

    /// Infrastructure failure (e.g., DB down)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(entity: &str, key: impl fmt::Display) -> Self {
        AppError::NotFound(entity.to_string(), key.to_string())
    }

    /// A validation error carrying a single message for `field`.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        AppError::Validation(errors)
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        Self::field(NON_FIELD_ERRORS, message)
    }
}

struct Summary<'a>(&'a FieldErrors);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(" "))?;
        }
        Ok(())
    }
}

/// A specialized Result type for Rusty-Reviews logic.
pub type Result<T> = std::result::Result<T, AppError>;
