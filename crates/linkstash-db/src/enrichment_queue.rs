//! Enrichment job queue backed by the `enrichment_job` table.
//!
//! Workers claim with `FOR UPDATE SKIP LOCKED`, so several workers can poll
//! the same table without handing out a job twice.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use linkstash_core::*;

const JOB_COLUMNS: &str = "id, bookmark_id, url, status, attempts, error_message, \
                           created_at, claimed_at, completed_at";

/// PostgreSQL implementation of EnrichmentQueue.
#[derive(Clone)]
pub struct PgEnrichmentQueue {
    pool: Pool<Postgres>,
}

impl PgEnrichmentQueue {
    /// Create a new PgEnrichmentQueue with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_job_row(row: PgRow) -> Result<EnrichmentJob> {
        let status: String = row.try_get("status")?;
        Ok(EnrichmentJob {
            id: row.try_get("id")?,
            bookmark_id: row.try_get("bookmark_id")?,
            url: row.try_get("url")?,
            status: status.parse()?,
            attempts: row.try_get("attempts")?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            claimed_at: row.try_get("claimed_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }

    async fn finish(
        &self,
        job_id: Uuid,
        status: EnrichmentJobStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE enrichment_job
             SET status = $1, error_message = $2, completed_at = $3
             WHERE id = $4",
        )
        .bind(status.as_str())
        .bind(error)
        .bind(Utc::now())
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Enrichment job {} not found", job_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl EnrichmentQueue for PgEnrichmentQueue {
    async fn enqueue(&self, request: EnrichmentRequest) -> Result<Uuid> {
        let job_id = Uuid::now_v7();

        sqlx::query(
            "INSERT INTO enrichment_job (id, bookmark_id, url, status, attempts, created_at)
             VALUES ($1, $2, $3, 'pending', 0, $4)",
        )
        .bind(job_id)
        .bind(request.bookmark_id)
        .bind(&request.url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "queue",
            component = "enrichment",
            op = "enqueue",
            job_id = %job_id,
            bookmark_id = request.bookmark_id,
            "Enrichment job queued"
        );
        Ok(job_id)
    }

    async fn claim_next(&self) -> Result<Option<EnrichmentJob>> {
        let row = sqlx::query(&format!(
            "UPDATE enrichment_job
             SET status = 'running', claimed_at = $1, attempts = attempts + 1
             WHERE id = (
                 SELECT id FROM enrichment_job
                 WHERE status = 'pending'
                 ORDER BY created_at ASC, id ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
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
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM enrichment_job WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(count)
    }

    async fn has_open_job(&self, bookmark_id: i64) -> Result<bool> {
        let open: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM enrichment_job
                 WHERE bookmark_id = $1 AND status IN ('pending', 'running')
             )",
        )
        .bind(bookmark_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(open)
    }
}
