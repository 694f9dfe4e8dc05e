use cascara_core::job::{CreateJobRequest, JobMode, UrlStatus};
use cascara_core::traits::{JobStore, UrlStore};
use cascara_db::{JobRepository, UrlRepository};
use uuid::Uuid;

use crate::integration::common::setup_test_db;

async fn seed_job(pool: &sqlx::PgPool) -> Uuid {
    JobRepository::new(pool.clone())
        .create(&CreateJobRequest::new("url queue test", JobMode::List))
        .await
        .unwrap()
        .id
}

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|u| u.to_string()).collect()
}

#[tokio::test]
async fn add_urls_creates_pending_entries() {
    let (pool, _container) = setup_test_db().await;
    let job_id = seed_job(&pool).await;
    let repo = UrlRepository::new(pool);

    let entries = repo
        .add_urls(job_id, &urls(&["https://a.test", "https://b.test"]))
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.status == UrlStatus::Pending));
    assert!(entries.iter().all(|e| e.job_id == job_id));
}

#[tokio::test]
async fn claim_next_marks_processing_and_bumps_attempts() {
    let (pool, _container) = setup_test_db().await;
    let job_id = seed_job(&pool).await;
    let repo = UrlRepository::new(pool);
    repo.add_urls(job_id, &urls(&["https://a.test"]))
        .await
        .unwrap();

    let claimed = repo.claim_next(job_id).await.unwrap().unwrap();
    assert_eq!(claimed.status, UrlStatus::Processing);
    assert_eq!(claimed.attempt_count, 1);
    assert!(claimed.last_attempt_at.is_some());

    // queue is now drained
    assert!(repo.claim_next(job_id).await.unwrap().is_none());
}

#[tokio::test]
async fn claim_next_follows_insertion_order() {
    let (pool, _container) = setup_test_db().await;
    let job_id = seed_job(&pool).await;
    let repo = UrlRepository::new(pool);
    repo.add_urls(job_id, &urls(&["https://first.test", "https://second.test"]))
        .await
        .unwrap();

    let first = repo.claim_next(job_id).await.unwrap().unwrap();
    assert_eq!(first.url, "https://first.test");
    let second = repo.claim_next(job_id).await.unwrap().unwrap();
    assert_eq!(second.url, "https://second.test");
}

#[tokio::test]
async fn claims_are_scoped_to_the_job() {
    let (pool, _container) = setup_test_db().await;
    let job_a = seed_job(&pool).await;
    let job_b = seed_job(&pool).await;
    let repo = UrlRepository::new(pool);
    repo.add_urls(job_a, &urls(&["https://a.test"]))
        .await
        .unwrap();

    assert!(repo.claim_next(job_b).await.unwrap().is_none());
    assert!(repo.claim_next(job_a).await.unwrap().is_some());
}

#[tokio::test]
async fn mark_completed_and_failed_set_terminal_state() {
    let (pool, _container) = setup_test_db().await;
    let job_id = seed_job(&pool).await;
    let repo = UrlRepository::new(pool);
    repo.add_urls(job_id, &urls(&["https://a.test", "https://b.test"]))
        .await
        .unwrap();

    let first = repo.claim_next(job_id).await.unwrap().unwrap();
    repo.mark_completed(first.id, 1234).await.unwrap();
    let second = repo.claim_next(job_id).await.unwrap().unwrap();
    repo.mark_failed(second.id, "paywalled", "paywall on every strategy")
        .await
        .unwrap();

    let counts = repo.counts(job_id).await.unwrap();
    assert_eq!(counts.completed, 1);
    assert_eq!(counts.failed, 1);
    assert!(counts.is_drained());

    let failed = repo
        .list(job_id, Some(UrlStatus::Failed), 10, 0)
        .await
        .unwrap();
    assert_eq!(failed[0].error_type.as_deref(), Some("paywalled"));
}

#[tokio::test]
async fn release_returns_url_to_pending() {
    let (pool, _container) = setup_test_db().await;
    let job_id = seed_job(&pool).await;
    let repo = UrlRepository::new(pool);
    repo.add_urls(job_id, &urls(&["https://a.test"]))
        .await
        .unwrap();

    let claimed = repo.claim_next(job_id).await.unwrap().unwrap();
    repo.release(claimed.id).await.unwrap();

    let reclaimed = repo.claim_next(job_id).await.unwrap().unwrap();
    assert_eq!(reclaimed.id, claimed.id);
    // the first attempt still counts
    assert_eq!(reclaimed.attempt_count, 2);
}

#[tokio::test]
async fn reset_for_restart_requeues_terminal_urls() {
    let (pool, _container) = setup_test_db().await;
    let job_id = seed_job(&pool).await;
    let repo = UrlRepository::new(pool);
    repo.add_urls(
        job_id,
        &urls(&["https://a.test", "https://b.test", "https://c.test"]),
    )
    .await
    .unwrap();

    let a = repo.claim_next(job_id).await.unwrap().unwrap();
    repo.mark_completed(a.id, 10).await.unwrap();
    let b = repo.claim_next(job_id).await.unwrap().unwrap();
    repo.mark_failed(b.id, "dead", "gone").await.unwrap();

    // c stays pending and is not touched
    let reset = repo.reset_for_restart(job_id).await.unwrap();
    assert_eq!(reset, 2);

    let counts = repo.counts(job_id).await.unwrap();
    assert_eq!(counts.pending, 3);
    let entries = repo.list(job_id, None, 10, 0).await.unwrap();
    assert!(entries.iter().all(|e| e.error_type.is_none()));
}

#[tokio::test]
async fn mark_skipped_records_reason() {
    let (pool, _container) = setup_test_db().await;
    let job_id = seed_job(&pool).await;
    let repo = UrlRepository::new(pool);
    repo.add_urls(job_id, &urls(&["https://a.test"]))
        .await
        .unwrap();

    let claimed = repo.claim_next(job_id).await.unwrap().unwrap();
    repo.mark_skipped(claimed.id, "attempt budget spent")
        .await
        .unwrap();

    let counts = repo.counts(job_id).await.unwrap();
    assert_eq!(counts.skipped, 1);
}
