//! Bookmark lifecycle service.
//!
//! Creates bookmarks in `pending` state, hands them to the enrichment queue,
//! and passes reads, searches and deletes straight through to the
//! repository. Every repository call runs under a deadline; when it expires
//! the in-flight future is dropped, which aborts the query and rolls back
//! any open transaction.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::{Bookmark, BookmarkSearch, NewBookmark};
use crate::traits::{BookmarkRepository, EnrichmentQueue};
use crate::validation::{normalize_tags, validate_url};

/// Configuration for [`BookmarkService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Deadline applied to each repository or queue call.
    pub operation_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(defaults::OPERATION_TIMEOUT_SECS),
        }
    }
}

impl ServiceConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `OPERATION_TIMEOUT_SECS` | `10` | Per-call deadline |
    pub fn from_env() -> Self {
        let secs = std::env::var("OPERATION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults::OPERATION_TIMEOUT_SECS);
        Self {
            operation_timeout: Duration::from_secs(secs),
        }
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

/// Orchestrates the bookmark lifecycle on top of a repository and a queue.
#[derive(Clone)]
pub struct BookmarkService {
    repo: Arc<dyn BookmarkRepository>,
    queue: Arc<dyn EnrichmentQueue>,
    config: ServiceConfig,
}

impl BookmarkService {
    pub fn new(repo: Arc<dyn BookmarkRepository>, queue: Arc<dyn EnrichmentQueue>) -> Self {
        Self::with_config(repo, queue, ServiceConfig::default())
    }

    pub fn with_config(
        repo: Arc<dyn BookmarkRepository>,
        queue: Arc<dyn EnrichmentQueue>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repo,
            queue,
            config,
        }
    }

    /// Run `fut` under the configured deadline.
    async fn bounded<T>(&self, op: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let timeout = self.config.operation_timeout;
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    subsystem = "service",
                    component = "bookmarks",
                    op,
                    timeout_ms = timeout.as_millis() as u64,
                    "Operation exceeded its deadline"
                );
                Err(Error::Timeout(timeout))
            }
        }
    }

    /// Create a `pending` bookmark and queue it for enrichment.
    ///
    /// Fails with `InvalidInput` for an empty or malformed URL and with
    /// `Conflict` when the URL is already bookmarked. A queue failure is
    /// logged but does not fail the create: the bookmark stays `pending`
    /// and can be re-queued.
    pub async fn create(&self, url: &str, tags: Vec<String>) -> Result<Bookmark> {
        let start = Instant::now();
        let url = validate_url(url)?;
        let tags = normalize_tags(&tags);

        let bookmark = self
            .bounded("create", self.repo.save(NewBookmark::pending(url, tags).into()))
            .await?;

        info!(
            subsystem = "service",
            component = "bookmarks",
            op = "create",
            bookmark_id = bookmark.id,
            url = %bookmark.url,
            tag_count = bookmark.tags.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Bookmark created"
        );

        match self
            .bounded("enqueue", self.queue.enqueue(bookmark.enrichment_request()))
            .await
        {
            Ok(job_id) => debug!(
                subsystem = "service",
                component = "bookmarks",
                op = "enqueue",
                bookmark_id = bookmark.id,
                job_id = %job_id,
                "Queued bookmark for enrichment"
            ),
            Err(e) => warn!(
                subsystem = "service",
                component = "bookmarks",
                op = "enqueue",
                bookmark_id = bookmark.id,
                error = %e,
                "Failed to queue bookmark for enrichment; it stays pending"
            ),
        }

        Ok(bookmark)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Bookmark> {
        self.bounded("get_by_id", self.repo.find_by_id(id)).await
    }

    pub async fn get_all(&self) -> Result<Vec<Bookmark>> {
        self.bounded("get_all", self.repo.find_all()).await
    }

    /// Substring and tag search. With no usable filter this is [`Self::get_all`].
    pub async fn search(&self, query: &str, tags: Vec<String>) -> Result<Vec<Bookmark>> {
        let search = BookmarkSearch::new(query, tags).normalized();
        if search.is_unfiltered() {
            return self.get_all().await;
        }
        let results = self.bounded("search", self.repo.search(&search)).await?;
        debug!(
            subsystem = "service",
            component = "bookmarks",
            op = "search",
            query = %search.query,
            tag_count = search.tags.len(),
            result_count = results.len(),
            "Search complete"
        );
        Ok(results)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.bounded("delete", self.repo.delete(id)).await?;
        info!(
            subsystem = "service",
            component = "bookmarks",
            op = "delete",
            bookmark_id = id,
            "Bookmark deleted"
        );
        Ok(())
    }

    /// Fetched bookmarks last refreshed more than `max_age` ago.
    pub async fn find_stale(&self, max_age: Duration) -> Result<Vec<Bookmark>> {
        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|e| Error::InvalidInput(format!("max_age out of range: {}", e)))?;
        let cutoff = Utc::now() - max_age;
        self.bounded(
            "find_older_than_fetched",
            self.repo.find_older_than_fetched(cutoff),
        )
        .await
    }

    /// Queue every `pending` bookmark idle for at least `min_idle` that has
    /// no pending or running job. Returns how many jobs were queued.
    ///
    /// Picks up bookmarks whose enqueue failed during [`Self::create`]. A
    /// failed enqueue here is logged and the sweep moves on.
    pub async fn requeue_pending(&self, min_idle: Duration) -> Result<usize> {
        let start = Instant::now();
        let min_idle = chrono::Duration::from_std(min_idle)
            .map_err(|e| Error::InvalidInput(format!("min_idle out of range: {}", e)))?;
        let idle_since = Utc::now() - min_idle;

        let candidates = self
            .bounded(
                "find_pending_before",
                self.repo.find_pending_before(idle_since),
            )
            .await?;

        let mut queued = 0;
        for bookmark in candidates.iter().filter(|b| b.needs_enrichment()) {
            if self
                .bounded("has_open_job", self.queue.has_open_job(bookmark.id))
                .await?
            {
                continue;
            }
            match self
                .bounded("enqueue", self.queue.enqueue(bookmark.enrichment_request()))
                .await
            {
                Ok(job_id) => {
                    queued += 1;
                    debug!(
                        subsystem = "service",
                        component = "bookmarks",
                        op = "requeue",
                        bookmark_id = bookmark.id,
                        job_id = %job_id,
                        "Re-queued orphaned bookmark"
                    );
                }
                Err(e) => warn!(
                    subsystem = "service",
                    component = "bookmarks",
                    op = "requeue",
                    bookmark_id = bookmark.id,
                    error = %e,
                    "Failed to re-queue bookmark"
                ),
            }
        }

        if queued > 0 {
            info!(
                subsystem = "service",
                component = "bookmarks",
                op = "requeue",
                candidates = candidates.len(),
                queued,
                duration_ms = start.elapsed().as_millis() as u64,
                "Re-queue sweep complete"
            );
        }
        Ok(queued)
    }
}
