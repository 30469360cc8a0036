//! Storage abstractions for posting persistence.
//!
//! Uniqueness of posting names is enforced by the backend, never pre-checked
//! by the crawler: a second insert with a known name reports
//! [`InsertOutcome::Duplicate`] instead of failing.

pub mod sql;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::Result;
use crate::models::Posting;

// Re-export for convenience
pub use sql::SqlPostingStore;

/// What happened to an inserted posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written
    Inserted,
    /// A posting with the same name already exists
    Duplicate,
}

/// Trait for posting storage backends.
#[async_trait]
pub trait PostingStore: Send + Sync {
    /// Publication time of the newest stored posting, `None` when empty.
    async fn latest_timestamp(&self) -> Result<Option<NaiveDateTime>>;

    /// Store `posting` unless one with the same name exists.
    async fn insert(&self, posting: &Posting) -> Result<InsertOutcome>;
}
