//! Integration tests for PgEnrichmentQueue.
//!
//! The queue is global to the database, so the claim checks live in a single
//! test to keep parallel tests from claiming each other's jobs.

use std::collections::HashSet;

use futures::future::join_all;
use linkstash_db::test_fixtures::TestDatabase;
use linkstash_db::{EnrichmentJobStatus, EnrichmentQueue, PgEnrichmentQueue};
use uuid::Uuid;

/// Claim until one of `wanted` comes back, failing any foreign job on the way.
async fn claim_own(queue: &PgEnrichmentQueue, wanted: &HashSet<Uuid>) -> Option<Uuid> {
    while let Some(job) = queue.claim_next().await.unwrap() {
        if wanted.contains(&job.id) {
            return Some(job.id);
        }
        queue.fail(job.id, "left over from an earlier run").await.unwrap();
    }
    None
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_enqueue_claim_complete_fail() {
    let mut test_db = TestDatabase::new().await.unwrap();
    let queue = test_db.db.enrichment.clone();

    let a = test_db.insert_pending("queue-a").await.unwrap();
    let b = test_db.insert_pending("queue-b").await.unwrap();

    let before = queue.pending_count().await.unwrap();
    let job_a = queue.enqueue(a.enrichment_request()).await.unwrap();
    let job_b = queue.enqueue(b.enrichment_request()).await.unwrap();
    assert_eq!(queue.pending_count().await.unwrap(), before + 2);

    // FIFO: a was queued first.
    let wanted: HashSet<Uuid> = [job_a, job_b].into_iter().collect();
    assert_eq!(claim_own(&queue, &wanted).await, Some(job_a));
    assert_eq!(claim_own(&queue, &wanted).await, Some(job_b));

    queue.complete(job_a).await.unwrap();
    queue.fail(job_b, "connection refused").await.unwrap();

    let rows: Vec<(Uuid, String, i32, Option<String>)> = sqlx::query_as(
        "SELECT id, status, attempts, error_message FROM enrichment_job
         WHERE id = ANY($1) ORDER BY created_at, id",
    )
    .bind(vec![job_a, job_b])
    .fetch_all(&test_db.db.pool)
    .await
    .unwrap();

    assert_eq!(rows[0].1, EnrichmentJobStatus::Completed.as_str());
    assert_eq!(rows[0].2, 1);
    assert!(rows[0].3.is_none());
    assert_eq!(rows[1].1, EnrichmentJobStatus::Failed.as_str());
    assert_eq!(rows[1].3.as_deref(), Some("connection refused"));

    assert!(queue.complete(Uuid::now_v7()).await.unwrap_err().is_not_found());

    // Concurrent claimers never receive the same job.
    let mut jobs = HashSet::new();
    for i in 0..5 {
        let bookmark = test_db.insert_pending(&format!("concurrent-{i}")).await.unwrap();
        jobs.insert(queue.enqueue(bookmark.enrichment_request()).await.unwrap());
    }
    let claims = join_all((0..5).map(|_| {
        let queue = queue.clone();
        let jobs = jobs.clone();
        async move { claim_own(&queue, &jobs).await }
    }))
    .await;
    let mut claimed: Vec<Uuid> = claims.into_iter().flatten().collect();
    // A claimer can see only locked rows and give up; drain what is left.
    while claimed.len() < jobs.len() {
        match claim_own(&queue, &jobs).await {
            Some(id) => claimed.push(id),
            None => break,
        }
    }
    let distinct: HashSet<Uuid> = claimed.iter().copied().collect();
    assert_eq!(claimed.len(), distinct.len());
    assert_eq!(distinct, jobs);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_has_open_job_tracks_job_status() {
    let mut test_db = TestDatabase::new().await.unwrap();
    let queue = test_db.db.enrichment.clone();
    let bookmark = test_db.insert_pending("open-job").await.unwrap();

    assert!(!queue.has_open_job(bookmark.id).await.unwrap());
    let job_id = queue.enqueue(bookmark.enrichment_request()).await.unwrap();
    assert!(queue.has_open_job(bookmark.id).await.unwrap());

    queue.fail(job_id, "dns failure").await.unwrap();
    assert!(!queue.has_open_job(bookmark.id).await.unwrap());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_deleting_bookmark_cascades_to_jobs() {
    let mut test_db = TestDatabase::new().await.unwrap();
    let bookmark = test_db.insert_pending("cascade").await.unwrap();

    let job_id = test_db
        .db
        .enrichment
        .enqueue(bookmark.enrichment_request())
        .await
        .unwrap();

    sqlx::query("DELETE FROM bookmark WHERE id = $1")
        .bind(bookmark.id)
        .execute(&test_db.db.pool)
        .await
        .unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrichment_job WHERE id = $1")
        .bind(job_id)
        .fetch_one(&test_db.db.pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    test_db.cleanup().await;
}
