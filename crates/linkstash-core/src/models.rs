//! Core data models for linkstash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// =============================================================================
// BOOKMARK STATUS
// =============================================================================

/// Enrichment status of a bookmark.
///
/// `Pending` is assigned at creation. The enrichment worker moves a bookmark
/// to `Fetched`, `Error` or `Dead`; `Dead` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkStatus {
    /// Waiting for the enrichment worker
    #[default]
    Pending,
    /// Page metadata was fetched successfully
    Fetched,
    /// The last enrichment attempt failed
    Error,
    /// Unreachable for good; never leaves this state
    Dead,
}

impl BookmarkStatus {
    pub const ALL: [BookmarkStatus; 4] = [
        BookmarkStatus::Pending,
        BookmarkStatus::Fetched,
        BookmarkStatus::Error,
        BookmarkStatus::Dead,
    ];

    /// Database / wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetched => "fetched",
            Self::Error => "error",
            Self::Dead => "dead",
        }
    }

    /// Whether a bookmark in this state may be written with `next`.
    pub fn can_transition_to(&self, next: BookmarkStatus) -> bool {
        match self {
            Self::Dead => next == Self::Dead,
            _ => true,
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self == Self::Dead
    }
}

impl std::fmt::Display for BookmarkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookmarkStatus {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "fetched" => Ok(Self::Fetched),
            "error" => Ok(Self::Error),
            "dead" => Ok(Self::Dead),
            _ => Err(Error::InvalidInput(format!(
                "Invalid bookmark status: {:?}",
                s
            ))),
        }
    }
}

// =============================================================================
// BOOKMARK
// =============================================================================

/// A stored reference to a URL plus page metadata and enrichment status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub favicon_url: Option<String>,
    pub status: BookmarkStatus,
    pub tags: Vec<String>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bookmark {
    /// Move to `next`, keeping `fetched_at` consistent with the new state.
    ///
    /// Entering `Fetched` stamps `fetched_at`. Entering `Pending` or `Dead`
    /// clears it. Entering `Error` leaves it and all page metadata untouched,
    /// so a bookmark that fails revalidation keeps what it had.
    pub fn transition_to(&mut self, next: BookmarkStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidInput(format!(
                "Bookmark {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }

        match next {
            BookmarkStatus::Fetched => self.fetched_at = Some(now),
            BookmarkStatus::Pending | BookmarkStatus::Dead => self.fetched_at = None,
            BookmarkStatus::Error => {}
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Record a successful enrichment.
    ///
    /// Fields absent from `metadata` keep their previous value.
    pub fn apply_enrichment(&mut self, metadata: PageMetadata, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(BookmarkStatus::Fetched, now)?;
        if metadata.title.is_some() {
            self.title = metadata.title;
        }
        if metadata.description.is_some() {
            self.description = metadata.description;
        }
        if metadata.image_url.is_some() {
            self.image_url = metadata.image_url;
        }
        if metadata.favicon_url.is_some() {
            self.favicon_url = metadata.favicon_url;
        }
        Ok(())
    }

    /// Record a failed enrichment attempt.
    pub fn mark_error(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(BookmarkStatus::Error, now)
    }

    /// Give up on this bookmark.
    pub fn mark_dead(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(BookmarkStatus::Dead, now)
    }

    /// Whether the bookmark is still waiting for its first enrichment.
    pub fn needs_enrichment(&self) -> bool {
        self.status == BookmarkStatus::Pending
    }

    /// Build the queue message for this bookmark.
    pub fn enrichment_request(&self) -> EnrichmentRequest {
        EnrichmentRequest {
            bookmark_id: self.id,
            url: self.url.clone(),
        }
    }
}

/// Insert payload for a bookmark that has no id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBookmark {
    pub url: String,
    pub tags: Vec<String>,
    pub status: BookmarkStatus,
}

impl NewBookmark {
    /// A `pending` bookmark, the only state the lifecycle service creates.
    pub fn pending(url: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            url: url.into(),
            tags,
            status: BookmarkStatus::Pending,
        }
    }
}

/// Argument of [`BookmarkRepository::save`](crate::BookmarkRepository::save).
///
/// Inserts never upsert: a colliding URL is a `Conflict`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveBookmark {
    Insert(NewBookmark),
    Update(Bookmark),
}

impl From<NewBookmark> for SaveBookmark {
    fn from(new: NewBookmark) -> Self {
        SaveBookmark::Insert(new)
    }
}

impl From<Bookmark> for SaveBookmark {
    fn from(bookmark: Bookmark) -> Self {
        SaveBookmark::Update(bookmark)
    }
}

/// Page metadata scraped from OGP tags by the enrichment worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub favicon_url: Option<String>,
}

// =============================================================================
// SEARCH
// =============================================================================

/// Filter for [`BookmarkRepository::search`](crate::BookmarkRepository::search).
///
/// A bookmark matches when
/// - `query` is empty, or `title` or `description` contains it (case-insensitive), and
/// - `tags` is empty, or the bookmark shares at least one tag with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkSearch {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl BookmarkSearch {
    pub fn new(query: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            query: query.into(),
            tags,
        }
    }

    /// Trim the query and tags, drop empty tags and remove duplicates
    /// (first occurrence wins).
    pub fn normalized(&self) -> Self {
        Self {
            query: self.query.trim().to_string(),
            tags: crate::validation::normalize_tags(&self.tags),
        }
    }

    /// True when neither filter is set.
    pub fn is_unfiltered(&self) -> bool {
        self.query.trim().is_empty() && self.tags.iter().all(|t| t.trim().is_empty())
    }

    /// Reference predicate; the SQL in `linkstash-db` mirrors it.
    pub fn matches(&self, bookmark: &Bookmark) -> bool {
        let text_ok = if self.query.is_empty() {
            true
        } else {
            let needle = self.query.to_lowercase();
            [&bookmark.title, &bookmark.description]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
        };
        if !text_ok {
            return false;
        }

        let wanted = crate::validation::normalize_tags(&self.tags);
        wanted.is_empty() || bookmark.tags.iter().any(|t| wanted.contains(t))
    }
}

// =============================================================================
// ENRICHMENT QUEUE
// =============================================================================

/// Message asking the enrichment worker to fetch a bookmark's page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRequest {
    pub bookmark_id: i64,
    pub url: String,
}

/// Status of a queued enrichment job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentJobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl EnrichmentJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for EnrichmentJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EnrichmentJobStatus {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(Error::InvalidInput(format!(
                "Invalid enrichment job status: {:?}",
                s
            ))),
        }
    }
}

/// A queued enrichment request with its processing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentJob {
    pub id: Uuid,
    pub bookmark_id: i64,
    pub url: String,
    pub status: EnrichmentJobStatus,
    pub attempts: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl EnrichmentJob {
    pub fn request(&self) -> EnrichmentRequest {
        EnrichmentRequest {
            bookmark_id: self.bookmark_id,
            url: self.url.clone(),
        }
    }
}
