//! rusty-reviews/crates/rr-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Rusty-Reviews.

pub mod accounts;
pub mod drafts;
pub mod error;
pub mod models;
pub mod pagination;
pub mod permissions;
pub mod rating;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use drafts::*;
pub use error::*;
pub use models::*;
pub use pagination::*;
pub use permissions::*;
pub use traits::*;
