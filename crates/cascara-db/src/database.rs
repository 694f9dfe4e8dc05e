use cascara_core::AppError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::DatabaseConfig;
use crate::job_repository::JobRepository;
use crate::result_repository::ResultRepository;
use crate::rule_repository::RuleRepository;
use crate::url_repository::UrlRepository;

/// Central database facade — owns the connection pool, runs migrations,
/// and vends repository instances.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL with the given configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {e}")))?;

        Ok(Self { pool })
    }

    /// Create a `Database` from an existing pool (useful for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Get a [`JobRepository`] backed by this pool.
    pub fn job_repo(&self) -> JobRepository {
        JobRepository::new(self.pool.clone())
    }

    /// Get a [`UrlRepository`] backed by this pool.
    pub fn url_repo(&self) -> UrlRepository {
        UrlRepository::new(self.pool.clone())
    }

    /// Get a [`RuleRepository`] backed by this pool.
    pub fn rule_repo(&self) -> RuleRepository {
        RuleRepository::new(self.pool.clone())
    }

    /// Get a [`ResultRepository`] backed by this pool.
    pub fn result_repo(&self) -> ResultRepository {
        ResultRepository::new(self.pool.clone())
    }

    /// Cheap connectivity check for health endpoints.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
