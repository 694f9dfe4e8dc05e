use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

use cascara_client::FetcherRegistry;
use cascara_db::Database;
use cascara_server::routes;
use cascara_server::state::AppState;

pub const TEST_API_KEY: &str = "test-secret-key";

/// SQL migration statements, executed one at a time.
const MIGRATIONS: &[&str] = &[
    // 001_jobs.sql
    r#"CREATE TABLE IF NOT EXISTS jobs (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name VARCHAR NOT NULL,
        mode VARCHAR(10) NOT NULL DEFAULT 'list',
        settings JSONB NOT NULL DEFAULT '{}',
        status VARCHAR(20) NOT NULL DEFAULT 'pending',
        progress_current INTEGER NOT NULL DEFAULT 0,
        progress_total INTEGER NOT NULL DEFAULT 0,
        success_count INTEGER NOT NULL DEFAULT 0,
        failure_count INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        started_at TIMESTAMPTZ,
        completed_at TIMESTAMPTZ,
        error_message TEXT,
        CONSTRAINT chk_jobs_status CHECK (
            status IN ('pending', 'running', 'paused', 'completed', 'failed', 'cancelled')
        ),
        CONSTRAINT chk_jobs_mode CHECK (
            mode IN ('single', 'list', 'crawl')
        )
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status, created_at DESC)"#,
    // 002_job_urls.sql
    r#"CREATE TABLE IF NOT EXISTS job_urls (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        job_id UUID NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        url VARCHAR NOT NULL,
        status VARCHAR(20) NOT NULL DEFAULT 'pending',
        attempt_count INTEGER NOT NULL DEFAULT 0,
        error_type VARCHAR(50),
        error_message TEXT,
        last_attempt_at TIMESTAMPTZ,
        completed_at TIMESTAMPTZ,
        processing_time_ms BIGINT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT chk_job_urls_status CHECK (
            status IN ('pending', 'processing', 'completed', 'failed', 'skipped')
        )
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_job_urls_pending
        ON job_urls(job_id, created_at) WHERE status = 'pending'"#,
    r#"CREATE INDEX IF NOT EXISTS idx_job_urls_job_status ON job_urls(job_id, status)"#,
    // 003_extraction_rules.sql
    r#"CREATE TABLE IF NOT EXISTS extraction_rules (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        job_id UUID NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        name VARCHAR NOT NULL,
        selector_type VARCHAR(10) NOT NULL DEFAULT 'css',
        selector VARCHAR NOT NULL,
        attribute VARCHAR,
        is_list BOOLEAN NOT NULL DEFAULT FALSE,
        is_required BOOLEAN NOT NULL DEFAULT FALSE,
        position INTEGER NOT NULL DEFAULT 0,
        CONSTRAINT chk_extraction_rules_selector_type CHECK (
            selector_type IN ('css', 'xpath')
        )
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_extraction_rules_job ON extraction_rules(job_id, position)"#,
    // 004_results.sql
    r#"CREATE TABLE IF NOT EXISTS results (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        job_id UUID NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        url_id UUID NOT NULL REFERENCES job_urls(id) ON DELETE CASCADE,
        data JSONB NOT NULL,
        strategy VARCHAR(50) NOT NULL,
        cascade_attempts INTEGER NOT NULL DEFAULT 1,
        elapsed_ms BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_results_job ON results(job_id, created_at DESC)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_results_url ON results(url_id)"#,
];

/// Spin up a PostgreSQL container and return the test app router + container handle.
///
/// The `ContainerAsync` must be kept in scope for the test duration —
/// dropping it will stop the container.
pub async fn setup_test_app() -> (Router, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("postgres", "16")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "cascara_test")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    let url = format!("postgresql://postgres:postgres@{host}:{port}/cascara_test");

    let pool = retry_connect(&url).await;

    for migration in MIGRATIONS {
        sqlx::query(migration)
            .execute(&pool)
            .await
            .expect("Failed to run migration");
    }

    let db = Database::from_pool(pool);
    let registry = FetcherRegistry::new()
        .expect("Failed to build fetcher registry")
        .allow_private_urls();
    let state = Arc::new(AppState::new(db, registry, TEST_API_KEY.to_string()));

    (routes::router(state), container)
}

async fn retry_connect(url: &str) -> PgPool {
    for _ in 0..30 {
        if let Ok(pool) = PgPoolOptions::new().max_connections(5).connect(url).await {
            return pool;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    panic!("Failed to connect to test database");
}
