use cascara_core::job::{CreateJobRequest, JobMode, JobSettings, JobStatus};
use cascara_core::traits::JobStore;
use cascara_db::JobRepository;

use crate::integration::common::setup_test_db;

fn test_request() -> CreateJobRequest {
    CreateJobRequest::new("product catalogue", JobMode::List)
}

#[tokio::test]
async fn create_job_and_verify_fields() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    let job = repo.create(&test_request()).await.unwrap();

    assert_eq!(job.name, "product catalogue");
    assert_eq!(job.mode, JobMode::List);
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.progress_total, 0);
    assert!(job.started_at.is_none());
    assert!(job.completed_at.is_none());
}

#[tokio::test]
async fn settings_round_trip_through_jsonb() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    let mut settings = JobSettings::default();
    settings.timeout_ms = 5_000;
    settings.cascade_order = Some(vec!["browser".into()]);
    let request = test_request().with_settings(settings);

    let created = repo.create(&request).await.unwrap();
    let fetched = repo.get(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.settings.timeout_ms, 5_000);
    assert_eq!(
        fetched.settings.cascade_order,
        Some(vec!["browser".into()])
    );
    assert_eq!(fetched.settings.max_retries, 3);
}

#[tokio::test]
async fn get_unknown_job_returns_none() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    let found = repo.get(uuid::Uuid::new_v4()).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn set_status_stamps_lifecycle_timestamps() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);
    let job = repo.create(&test_request()).await.unwrap();

    repo.set_status(job.id, JobStatus::Running, None)
        .await
        .unwrap();
    let running = repo.get(job.id).await.unwrap().unwrap();
    assert_eq!(running.status, JobStatus::Running);
    assert!(running.started_at.is_some());
    assert!(running.completed_at.is_none());

    repo.set_status(job.id, JobStatus::Completed, None)
        .await
        .unwrap();
    let done = repo.get(job.id).await.unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert!(done.completed_at.is_some());
    // started_at survives the transition
    assert_eq!(done.started_at, running.started_at);
}

#[tokio::test]
async fn set_status_records_error_message() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);
    let job = repo.create(&test_request()).await.unwrap();

    repo.set_status(job.id, JobStatus::Failed, Some("database went away"))
        .await
        .unwrap();
    let failed = repo.get(job.id).await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("database went away"));
}

#[tokio::test]
async fn set_status_on_unknown_job_fails() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    let err = repo
        .set_status(uuid::Uuid::new_v4(), JobStatus::Running, None)
        .await
        .unwrap_err();
    assert!(matches!(err, cascara_core::AppError::JobNotFound(_)));
}

#[tokio::test]
async fn update_progress_persists_counters() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);
    let job = repo.create(&test_request()).await.unwrap();

    repo.update_progress(job.id, 7, 10, 5, 2).await.unwrap();
    let fetched = repo.get(job.id).await.unwrap().unwrap();
    assert_eq!(fetched.progress_current, 7);
    assert_eq!(fetched.progress_total, 10);
    assert_eq!(fetched.success_count, 5);
    assert_eq!(fetched.failure_count, 2);
}

#[tokio::test]
async fn list_filters_by_status() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    let a = repo.create(&test_request()).await.unwrap();
    let _b = repo.create(&test_request()).await.unwrap();
    repo.set_status(a.id, JobStatus::Running, None)
        .await
        .unwrap();

    let running = repo.list(Some(JobStatus::Running), 10).await.unwrap();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].id, a.id);

    let all = repo.list(None, 10).await.unwrap();
    assert_eq!(all.len(), 2);
}
