use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use cascara_core::error::AppError;
use cascara_core::job::{UrlCounts, UrlEntry, UrlStatus};
use cascara_core::traits::UrlStore;

/// PostgreSQL-backed URL queue using `SELECT FOR UPDATE SKIP LOCKED`.
#[derive(Clone)]
pub struct UrlRepository {
    pool: Pool<Postgres>,
}

impl UrlRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct UrlRow {
    id: Uuid,
    job_id: Uuid,
    url: String,
    status: String,
    attempt_count: i32,
    error_type: Option<String>,
    error_message: Option<String>,
    last_attempt_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    processing_time_ms: Option<i64>,
}

impl From<UrlRow> for UrlEntry {
    fn from(row: UrlRow) -> Self {
        UrlEntry {
            id: row.id,
            job_id: row.job_id,
            url: row.url,
            status: row.status.parse().unwrap_or(UrlStatus::Pending),
            attempt_count: row.attempt_count as u32,
            error_type: row.error_type,
            error_message: row.error_message,
            last_attempt_at: row.last_attempt_at,
            completed_at: row.completed_at,
            processing_time_ms: row.processing_time_ms,
        }
    }
}

impl UrlStore for UrlRepository {
    async fn add_urls(&self, job_id: Uuid, urls: &[String]) -> Result<Vec<UrlEntry>, AppError> {
        let rows = sqlx::query_as::<_, UrlRow>(
            r#"
            INSERT INTO job_urls (job_id, url)
            SELECT $1, unnest($2::varchar[])
            RETURNING id, job_id, url, status, attempt_count, error_type,
                      error_message, last_attempt_at, completed_at, processing_time_ms
            "#,
        )
        .bind(job_id)
        .bind(urls)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn claim_next(&self, job_id: Uuid) -> Result<Option<UrlEntry>, AppError> {
        let row = sqlx::query_as::<_, UrlRow>(
            r#"
            UPDATE job_urls
            SET status = 'processing', attempt_count = attempt_count + 1,
                last_attempt_at = NOW()
            WHERE id = (
                SELECT id FROM job_urls
                WHERE job_id = $1 AND status = 'pending'
                ORDER BY created_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id, job_id, url, status, attempt_count, error_type,
                      error_message, last_attempt_at, completed_at, processing_time_ms
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn mark_completed(&self, url_id: Uuid, processing_time_ms: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE job_urls
            SET status = 'completed', completed_at = NOW(),
                processing_time_ms = $2, error_type = NULL, error_message = NULL
            WHERE id = $1
            "#,
        )
        .bind(url_id)
        .bind(processing_time_ms)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn mark_failed(
        &self,
        url_id: Uuid,
        error_type: &str,
        error_message: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE job_urls
            SET status = 'failed', error_type = $2, error_message = $3
            WHERE id = $1
            "#,
        )
        .bind(url_id)
        .bind(error_type)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn mark_skipped(&self, url_id: Uuid, reason: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE job_urls
            SET status = 'skipped', error_type = 'skipped', error_message = $2
            WHERE id = $1
            "#,
        )
        .bind(url_id)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn release(&self, url_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE job_urls
            SET status = 'pending'
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(url_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn reset_for_restart(&self, job_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE job_urls
            SET status = 'pending', error_type = NULL, error_message = NULL,
                completed_at = NULL, processing_time_ms = NULL
            WHERE job_id = $1 AND status IN ('completed', 'failed', 'skipped')
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn counts(&self, job_id: Uuid) -> Result<UrlCounts, AppError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*) FROM job_urls
            WHERE job_id = $1
            GROUP BY status
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let mut counts = UrlCounts::default();
        for (status, count) in rows {
            let count = count as u32;
            match status.as_str() {
                "pending" => counts.pending = count,
                "processing" => counts.processing = count,
                "completed" => counts.completed = count,
                "failed" => counts.failed = count,
                "skipped" => counts.skipped = count,
                _ => {}
            }
        }
        Ok(counts)
    }

    async fn list(
        &self,
        job_id: Uuid,
        status: Option<UrlStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<UrlEntry>, AppError> {
        let rows = if let Some(status) = status {
            sqlx::query_as::<_, UrlRow>(
                r#"
                SELECT id, job_id, url, status, attempt_count, error_type,
                       error_message, last_attempt_at, completed_at, processing_time_ms
                FROM job_urls
                WHERE job_id = $1 AND status = $2
                ORDER BY created_at ASC
                LIMIT $3 OFFSET $4
                "#,
            )
            .bind(job_id)
            .bind(status.as_str())
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, UrlRow>(
                r#"
                SELECT id, job_id, url, status, attempt_count, error_type,
                       error_message, last_attempt_at, completed_at, processing_time_ms
                FROM job_urls
                WHERE job_id = $1
                ORDER BY created_at ASC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(job_id)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
