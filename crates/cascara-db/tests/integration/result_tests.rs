use cascara_core::job::{CreateJobRequest, JobMode, NewResultRecord};
use cascara_core::traits::{JobStore, ResultStore, UrlStore};
use cascara_db::{JobRepository, ResultRepository, UrlRepository};
use uuid::Uuid;

use crate::integration::common::setup_test_db;

async fn seed_job_with_url(pool: &sqlx::PgPool) -> (Uuid, Uuid) {
    let job = JobRepository::new(pool.clone())
        .create(&CreateJobRequest::new("results test", JobMode::List))
        .await
        .unwrap();
    let entries = UrlRepository::new(pool.clone())
        .add_urls(job.id, &["https://a.test".to_string()])
        .await
        .unwrap();
    (job.id, entries[0].id)
}

fn record(job_id: Uuid, url_id: Uuid) -> NewResultRecord {
    NewResultRecord {
        job_id,
        url_id,
        data: serde_json::json!({"title": "Widget", "price": "19.99"}),
        strategy: "http".into(),
        cascade_attempts: 2,
        elapsed_ms: 840,
    }
}

#[tokio::test]
async fn save_and_list_round_trip() {
    let (pool, _container) = setup_test_db().await;
    let (job_id, url_id) = seed_job_with_url(&pool).await;
    let repo = ResultRepository::new(pool);

    let id = repo.save(&record(job_id, url_id)).await.unwrap();
    assert_ne!(id, Uuid::nil());

    let records = repo.list(job_id, 10, 0).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data["title"], "Widget");
    assert_eq!(records[0].strategy, "http".into());
    assert_eq!(records[0].cascade_attempts, 2);
    assert_eq!(records[0].elapsed_ms, 840);
}

#[tokio::test]
async fn count_is_scoped_to_the_job() {
    let (pool, _container) = setup_test_db().await;
    let (job_a, url_a) = seed_job_with_url(&pool).await;
    let (job_b, _url_b) = seed_job_with_url(&pool).await;
    let repo = ResultRepository::new(pool);

    repo.save(&record(job_a, url_a)).await.unwrap();

    assert_eq!(repo.count(job_a).await.unwrap(), 1);
    assert_eq!(repo.count(job_b).await.unwrap(), 0);
}

#[tokio::test]
async fn list_paginates() {
    let (pool, _container) = setup_test_db().await;
    let (job_id, url_id) = seed_job_with_url(&pool).await;
    let repo = ResultRepository::new(pool);

    for _ in 0..3 {
        repo.save(&record(job_id, url_id)).await.unwrap();
    }

    let page = repo.list(job_id, 2, 0).await.unwrap();
    assert_eq!(page.len(), 2);
    let rest = repo.list(job_id, 2, 2).await.unwrap();
    assert_eq!(rest.len(), 1);
}
