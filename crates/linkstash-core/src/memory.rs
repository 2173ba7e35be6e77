//! In-process implementations of the repository and queue traits.
//!
//! Same contract as the Postgres backends, including `Conflict` on a
//! duplicate URL. Used by tests and by embedders that do not need
//! durability.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;
use crate::traits::{BookmarkRepository, EnrichmentQueue};

#[derive(Default)]
struct BookmarkTable {
    last_id: i64,
    rows: BTreeMap<i64, Bookmark>,
}

impl BookmarkTable {
    fn url_taken(&self, url: &str, except: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|b| b.url == url && Some(b.id) != except)
    }
}

/// Bookmark repository backed by a map behind a `RwLock`.
#[derive(Default)]
pub struct MemoryBookmarkRepository {
    table: RwLock<BookmarkTable>,
}

impl MemoryBookmarkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(mut rows: Vec<Bookmark>) -> Vec<Bookmark> {
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        rows
    }
}

#[async_trait]
impl BookmarkRepository for MemoryBookmarkRepository {
    async fn save(&self, bookmark: SaveBookmark) -> Result<Bookmark> {
        let mut table = self.table.write().await;
        let now = Utc::now();

        match bookmark {
            SaveBookmark::Insert(new) => {
                if table.url_taken(&new.url, None) {
                    return Err(Error::Conflict(format!(
                        "Bookmark for {} already exists",
                        new.url
                    )));
                }
                table.last_id += 1;
                let fetched_at = (new.status == BookmarkStatus::Fetched).then_some(now);
                let row = Bookmark {
                    id: table.last_id,
                    url: new.url,
                    title: None,
                    description: None,
                    image_url: None,
                    favicon_url: None,
                    status: new.status,
                    tags: new.tags,
                    fetched_at,
                    created_at: now,
                    updated_at: now,
                };
                table.rows.insert(row.id, row.clone());
                Ok(row)
            }
            SaveBookmark::Update(mut updated) => {
                let current = table
                    .rows
                    .get(&updated.id)
                    .ok_or_else(|| Error::NotFound(format!("Bookmark {} not found", updated.id)))?;
                if !current.status.can_transition_to(updated.status) {
                    return Err(Error::InvalidInput(format!(
                        "Bookmark {} is {} and cannot become {}",
                        updated.id, current.status, updated.status
                    )));
                }
                if table.url_taken(&updated.url, Some(updated.id)) {
                    return Err(Error::Conflict(format!(
                        "Bookmark for {} already exists",
                        updated.url
                    )));
                }
                updated.created_at = current.created_at;
                updated.updated_at = now;
                table.rows.insert(updated.id, updated.clone());
                Ok(updated)
            }
        }
    }

    async fn find_by_id(&self, id: i64) -> Result<Bookmark> {
        self.table
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Bookmark {} not found", id)))
    }

    async fn find_by_url(&self, url: &str) -> Result<Bookmark> {
        self.table
            .read()
            .await
            .rows
            .values()
            .find(|b| b.url == url)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Bookmark for {} not found", url)))
    }

    async fn find_all(&self) -> Result<Vec<Bookmark>> {
        let rows = self.table.read().await.rows.values().cloned().collect();
        Ok(Self::newest_first(rows))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Bookmark {} not found", id)))
    }

    async fn search(&self, search: &BookmarkSearch) -> Result<Vec<Bookmark>> {
        let search = search.normalized();
        let rows = self
            .table
            .read()
            .await
            .rows
            .values()
            .filter(|b| search.matches(b))
            .cloned()
            .collect();
        Ok(Self::newest_first(rows))
    }

    async fn find_older_than_fetched(&self, cutoff: DateTime<Utc>) -> Result<Vec<Bookmark>> {
        let mut rows: Vec<Bookmark> = self
            .table
            .read()
            .await
            .rows
            .values()
            .filter(|b| {
                b.status == BookmarkStatus::Fetched && b.fetched_at.is_some_and(|at| at < cutoff)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|b| (b.fetched_at, b.id));
        Ok(rows)
    }

    async fn find_pending_before(&self, idle_since: DateTime<Utc>) -> Result<Vec<Bookmark>> {
        let mut rows: Vec<Bookmark> = self
            .table
            .read()
            .await
            .rows
            .values()
            .filter(|b| b.needs_enrichment() && b.updated_at <= idle_since)
            .cloned()
            .collect();
        rows.sort_by_key(|b| (b.updated_at, b.id));
        Ok(rows)
    }

    async fn exists(&self, id: i64) -> Result<bool> {
        Ok(self.table.read().await.rows.contains_key(&id))
    }
}

/// Enrichment queue held in memory, claimed in FIFO order.
#[derive(Default)]
pub struct MemoryEnrichmentQueue {
    jobs: Mutex<Vec<EnrichmentJob>>,
}

impl MemoryEnrichmentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every job ever queued, oldest first.
    pub async fn jobs(&self) -> Vec<EnrichmentJob> {
        self.jobs.lock().await.clone()
    }

    async fn finish(
        &self,
        job_id: Uuid,
        status: EnrichmentJobStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| Error::NotFound(format!("Enrichment job {} not found", job_id)))?;
        job.status = status;
        job.error_message = error.map(str::to_string);
        job.completed_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl EnrichmentQueue for MemoryEnrichmentQueue {
    async fn enqueue(&self, request: EnrichmentRequest) -> Result<Uuid> {
        let id = Uuid::now_v7();
        self.jobs.lock().await.push(EnrichmentJob {
            id,
            bookmark_id: request.bookmark_id,
            url: request.url,
            status: EnrichmentJobStatus::Pending,
            attempts: 0,
            error_message: None,
            created_at: Utc::now(),
            claimed_at: None,
            completed_at: None,
        });
        Ok(id)
    }

    async fn claim_next(&self) -> Result<Option<EnrichmentJob>> {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs
            .iter_mut()
            .find(|j| j.status == EnrichmentJobStatus::Pending)
        else {
            return Ok(None);
        };
        job.status = EnrichmentJobStatus::Running;
        job.attempts += 1;
        job.claimed_at = Some(Utc::now());
        Ok(Some(job.clone()))
    }

    async fn complete(&self, job_id: Uuid) -> Result<()> {
        self.finish(job_id, EnrichmentJobStatus::Completed, None)
            .await
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        self.finish(job_id, EnrichmentJobStatus::Failed, Some(error))
            .await
    }

    async fn pending_count(&self) -> Result<i64> {
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .iter()
            .filter(|j| j.status == EnrichmentJobStatus::Pending)
            .count() as i64)
    }

    async fn has_open_job(&self, bookmark_id: i64) -> Result<bool> {
        Ok(self.jobs.lock().await.iter().any(|j| {
            j.bookmark_id == bookmark_id
                && matches!(
                    j.status,
                    EnrichmentJobStatus::Pending | EnrichmentJobStatus::Running
                )
        }))
    }
}
