use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use cascara_core::error::AppError;
use cascara_core::fetch::StrategyId;
use cascara_core::job::{NewResultRecord, ResultRecord};
use cascara_core::traits::ResultStore;

/// PostgreSQL-backed store for extracted records.
#[derive(Clone)]
pub struct ResultRepository {
    pool: Pool<Postgres>,
}

impl ResultRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ResultRow {
    id: Uuid,
    job_id: Uuid,
    url_id: Uuid,
    data: serde_json::Value,
    strategy: String,
    cascade_attempts: i32,
    elapsed_ms: i64,
    created_at: DateTime<Utc>,
}

impl From<ResultRow> for ResultRecord {
    fn from(row: ResultRow) -> Self {
        ResultRecord {
            id: row.id,
            job_id: row.job_id,
            url_id: row.url_id,
            data: row.data,
            strategy: StrategyId(row.strategy),
            cascade_attempts: row.cascade_attempts as u32,
            elapsed_ms: row.elapsed_ms,
            created_at: row.created_at,
        }
    }
}

impl ResultStore for ResultRepository {
    async fn save(&self, record: &NewResultRecord) -> Result<Uuid, AppError> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO results (job_id, url_id, data, strategy, cascade_attempts, elapsed_ms)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(record.job_id)
        .bind(record.url_id)
        .bind(&record.data)
        .bind(&record.strategy.0)
        .bind(record.cascade_attempts as i32)
        .bind(record.elapsed_ms)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(id)
    }

    async fn list(
        &self,
        job_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ResultRecord>, AppError> {
        let rows = sqlx::query_as::<_, ResultRow>(
            r#"
            SELECT * FROM results
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
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self, job_id: Uuid) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM results WHERE job_id = $1"#)
            .bind(job_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(count)
    }
}
