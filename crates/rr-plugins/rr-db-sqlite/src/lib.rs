//! # rr-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `rr-core` domain models.
//!
//! Referential rules live in the schema, not in this code: foreign keys carry
//! the cascade/set-null behavior and `UNIQUE (author_id, title_id)` is the only
//! guard against duplicate reviews. Constraint failures come back from SQLite and
//! are translated into validation errors here.

mod catalog;
mod reviews;
mod users;

use std::str::FromStr;
use std::time::Duration;

use rr_core::error::{AppError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{error, info};

const SCHEMA: &str = include_str!("schema.sql");

pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Opens (creating if missing) the database at `url` and applies the schema.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // Every connection to `:memory:` is its own database, so the pool must
        // hold exactly one connection and never recycle it.
        let in_memory = url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new();
        pool_options = if in_memory {
            pool_options.max_connections(1).min_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            pool_options.max_connections(max_connections.max(1))
        };
        let pool = pool_options.connect_with(options).await?;

        let repo = Self { pool };
        repo.migrate().await?;
        info!(%url, "sqlite repository ready");
        Ok(repo)
    }

    /// Fresh private database, used by tests and local experiments.
    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Maps a storage failure onto the domain taxonomy.
pub(crate) fn db_err(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return unique_violation(db.message());
        }
        if db.is_foreign_key_violation() {
            return AppError::non_field("The referenced object does not exist.");
        }
        if db.is_check_violation() {
            return AppError::non_field(format!("Constraint failed: {}", db.message()));
        }
    }
    error!(error = %err, "storage failure");
    AppError::Internal(err.to_string())
}

/// SQLite reports e.g. `UNIQUE constraint failed: users.email`.
fn unique_violation(message: &str) -> AppError {
    if message.contains("reviews.author_id") {
        AppError::non_field("You have already reviewed this title.")
    } else if message.contains("users.username") {
        AppError::field("username", "A user with that username already exists.")
    } else if message.contains("users.email") {
        AppError::field("email", "A user with that email already exists.")
    } else if message.contains(".slug") {
        AppError::field("slug", "An entry with this slug already exists.")
    } else {
        AppError::non_field("This entry already exists.")
    }
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

pub(crate) fn decode_err(column: &str, detail: impl std::fmt::Display) -> AppError {
    error!(%column, %detail, "corrupt row");
    AppError::Internal(format!("column {} holds an invalid value: {}", column, detail))
}
