//! Core traits for linkstash abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// BOOKMARK REPOSITORY TRAITS
// =============================================================================

/// Persistence contract for bookmarks, independent of the storage engine.
///
/// Uniqueness of `url` is the store's job: implementations must surface a
/// colliding insert or update as `Error::Conflict` and must not pre-check.
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// Insert a new bookmark or update an existing one by primary key.
    ///
    /// Updates fail with `NotFound` when the id is gone and with
    /// `InvalidInput` when they would move a `dead` bookmark elsewhere.
    async fn save(&self, bookmark: SaveBookmark) -> Result<Bookmark>;

    /// Fetch a bookmark by id.
    async fn find_by_id(&self, id: i64) -> Result<Bookmark>;

    /// Fetch a bookmark by its exact URL.
    async fn find_by_url(&self, url: &str) -> Result<Bookmark>;

    /// All bookmarks, newest first.
    async fn find_all(&self) -> Result<Vec<Bookmark>>;

    /// Permanently delete a bookmark. Deleting a missing id is `NotFound`.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Substring and tag-overlap search, newest first.
    async fn search(&self, search: &BookmarkSearch) -> Result<Vec<Bookmark>>;

    /// `fetched` bookmarks whose `fetched_at` is strictly before `cutoff`,
    /// oldest fetch first.
    async fn find_older_than_fetched(&self, cutoff: DateTime<Utc>) -> Result<Vec<Bookmark>>;

    /// `pending` bookmarks whose `updated_at` is at or before `idle_since`,
    /// least recently updated first.
    async fn find_pending_before(&self, idle_since: DateTime<Utc>) -> Result<Vec<Bookmark>>;

    /// Check if a bookmark exists.
    async fn exists(&self, id: i64) -> Result<bool>;
}

// =============================================================================
// ENRICHMENT QUEUE TRAITS
// =============================================================================

/// Durable queue of bookmarks waiting for the enrichment worker.
#[async_trait]
pub trait EnrichmentQueue: Send + Sync {
    /// Queue a bookmark for enrichment.
    async fn enqueue(&self, request: EnrichmentRequest) -> Result<Uuid>;

    /// Claim the oldest pending job, marking it running.
    async fn claim_next(&self) -> Result<Option<EnrichmentJob>>;

    /// Mark a claimed job as completed.
    async fn complete(&self, job_id: Uuid) -> Result<()>;

    /// Mark a claimed job as failed.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Number of jobs waiting to be claimed.
    async fn pending_count(&self) -> Result<i64>;

    /// Whether the bookmark has a job that is still pending or running.
    async fn has_open_job(&self, bookmark_id: i64) -> Result<bool>;
}
