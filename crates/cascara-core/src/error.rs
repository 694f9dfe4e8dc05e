use thiserror::Error;
use uuid::Uuid;

/// Application-wide error types for Cascara.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed at the transport level (fetching a page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Strategy invocation timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A retrieval strategy is not usable in this environment.
    #[error("Strategy '{0}' is not available")]
    StrategyUnavailable(String),

    /// Field extraction could not be evaluated against the document.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// No job exists with this id.
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    /// A live worker already exists for this job.
    #[error("A worker is already active for job {0}")]
    WorkerConflict(Uuid),

    /// The requested action is not allowed in the job's current status.
    #[error("Job {job_id} is '{status}': cannot {action}")]
    InvalidJobStatus {
        job_id: Uuid,
        status: String,
        action: &'static str,
    },

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error should abort a whole worker run.
    ///
    /// Per-URL failures (fetch, extraction) are recovered locally; only
    /// errors that corrupt the ability to track state are fatal.
    pub fn is_fatal_for_job(&self) -> bool {
        matches!(self, AppError::DatabaseError(_) | AppError::ConfigError(_))
    }
}
