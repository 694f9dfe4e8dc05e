use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use cascara_core::error::AppError;
use cascara_core::job::{CreateJobRequest, Job, JobSettings, JobStatus};
use cascara_core::traits::JobStore;

/// PostgreSQL-backed job store.
#[derive(Clone)]
pub struct JobRepository {
    pool: Pool<Postgres>,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    name: String,
    mode: String,
    settings: serde_json::Value,
    status: String,
    progress_current: i32,
    progress_total: i32,
    success_count: i32,
    failure_count: i32,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            name: row.name,
            mode: row.mode.parse().unwrap_or(cascara_core::job::JobMode::List),
            settings: serde_json::from_value::<JobSettings>(row.settings).unwrap_or_default(),
            status: row.status.parse().unwrap_or(JobStatus::Pending),
            progress_current: row.progress_current as u32,
            progress_total: row.progress_total as u32,
            success_count: row.success_count as u32,
            failure_count: row.failure_count as u32,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
        }
    }
}

impl JobStore for JobRepository {
    async fn create(&self, request: &CreateJobRequest) -> Result<Job, AppError> {
        let settings = serde_json::to_value(&request.settings)?;
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs (name, mode, settings)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(request.mode.as_str())
        .bind(settings)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.into())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, AppError> {
        let row = sqlx::query_as::<_, JobRow>(r#"SELECT * FROM jobs WHERE id = $1"#)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn list(&self, status: Option<JobStatus>, limit: usize) -> Result<Vec<Job>, AppError> {
        let rows = if let Some(status) = status {
            sqlx::query_as::<_, JobRow>(
                r#"
                SELECT * FROM jobs
                WHERE status = $1
                ORDER BY created_at DESC
                LIMIT $2
                "#,
            )
            .bind(status.as_str())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, JobRow>(
                r#"
                SELECT * FROM jobs
                ORDER BY created_at DESC
                LIMIT $1
                "#,
            )
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self, status: Option<JobStatus>) -> Result<i64, AppError> {
        let query = if let Some(status) = status {
            sqlx::query_as(r#"SELECT COUNT(*) FROM jobs WHERE status = $1"#).bind(status.as_str())
        } else {
            sqlx::query_as(r#"SELECT COUNT(*) FROM jobs"#)
        };
        let (count,): (i64,) = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(count)
    }

    async fn set_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<(), AppError> {
        // running stamps started_at once; terminal states stamp completed_at
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = $2,
                error_message = $3,
                started_at = CASE
                    WHEN $2 = 'running' AND started_at IS NULL THEN NOW()
                    ELSE started_at
                END,
                completed_at = CASE
                    WHEN $2 IN ('completed', 'failed', 'cancelled') THEN NOW()
                    ELSE NULL
                END
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(status.as_str())
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::JobNotFound(job_id));
        }
        Ok(())
    }

    async fn update_progress(
        &self,
        job_id: Uuid,
        current: u32,
        total: u32,
        success: u32,
        failure: u32,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET progress_current = $2, progress_total = $3,
                success_count = $4, failure_count = $5
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(current as i32)
        .bind(total as i32)
        .bind(success as i32)
        .bind(failure as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
