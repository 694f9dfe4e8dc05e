use std::future::Future;
use std::time::Duration;

use uuid::Uuid;

use crate::error::AppError;
use crate::fetch::{FetchOutcome, StrategyId};
use crate::job::{
    CreateJobRequest, ExtractionRule, Job, JobStatus, NewResultRecord, ResultRecord, UrlCounts,
    UrlEntry, UrlStatus,
};

/// Resolves strategy identifiers to concrete fetch implementations.
///
/// A strategy invocation never fails the cascade on its own: transport
/// errors and timeouts come back as a failed [`FetchOutcome`] so the
/// dispatcher can move on to the next rung. Only infrastructure faults
/// (misconfiguration, a poisoned registry) surface as `Err`.
pub trait StrategyRegistry: Send + Sync + Clone {
    /// Default cascade order when a job carries no override.
    fn default_order(&self) -> Vec<StrategyId>;

    /// Whether the strategy can run right now (binary present, browser
    /// reachable). Unknown strategies report `false`.
    fn is_available(&self, strategy: &StrategyId) -> impl Future<Output = bool> + Send;

    fn invoke(
        &self,
        strategy: &StrategyId,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<FetchOutcome, AppError>> + Send;
}

/// Extracted field values for one document.
#[derive(Debug, Clone)]
pub struct FieldSet {
    /// Field name to extracted value(s).
    pub data: serde_json::Value,
    /// False when any rule marked required produced nothing.
    pub required_satisfied: bool,
    /// Names of required rules that produced nothing.
    pub missing: Vec<String>,
}

/// Applies extraction rules to a fetched document.
pub trait FieldExtractor: Send + Sync + Clone {
    fn extract(&self, document: &str, rules: &[ExtractionRule]) -> Result<FieldSet, AppError>;
}

/// Persists and retrieves jobs.
pub trait JobStore: Send + Sync + Clone {
    fn create(&self, request: &CreateJobRequest) -> impl Future<Output = Result<Job, AppError>> + Send;

    fn get(&self, job_id: Uuid) -> impl Future<Output = Result<Option<Job>, AppError>> + Send;

    fn list(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Job>, AppError>> + Send;

    /// Counts jobs matching the status filter, independent of any
    /// listing limit.
    fn count(&self, status: Option<JobStatus>) -> impl Future<Output = Result<i64, AppError>> + Send;

    /// Transitions the job's status, stamping started/completed
    /// timestamps as appropriate.
    fn set_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Persists the worker's progress counters.
    fn update_progress(
        &self,
        job_id: Uuid,
        current: u32,
        total: u32,
        success: u32,
        failure: u32,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// The per-job URL queue.
pub trait UrlStore: Send + Sync + Clone {
    /// Appends URLs to the job's queue, returning the created entries.
    fn add_urls(
        &self,
        job_id: Uuid,
        urls: &[String],
    ) -> impl Future<Output = Result<Vec<UrlEntry>, AppError>> + Send;

    /// Claims the next pending URL, marking it processing. Returns
    /// `None` when the queue is drained.
    fn claim_next(
        &self,
        job_id: Uuid,
    ) -> impl Future<Output = Result<Option<UrlEntry>, AppError>> + Send;

    fn mark_completed(
        &self,
        url_id: Uuid,
        processing_time_ms: i64,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn mark_failed(
        &self,
        url_id: Uuid,
        error_type: &str,
        error_message: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Marks a URL skipped, e.g. when its attempt budget is spent.
    fn mark_skipped(
        &self,
        url_id: Uuid,
        reason: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Returns an in-flight URL to pending, e.g. when a job is paused
    /// mid-URL.
    fn release(&self, url_id: Uuid) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Resets terminal URLs back to pending for a job restart.
    fn reset_for_restart(&self, job_id: Uuid) -> impl Future<Output = Result<u64, AppError>> + Send;

    fn counts(&self, job_id: Uuid) -> impl Future<Output = Result<UrlCounts, AppError>> + Send;

    fn list(
        &self,
        job_id: Uuid,
        status: Option<UrlStatus>,
        limit: usize,
        offset: usize,
    ) -> impl Future<Output = Result<Vec<UrlEntry>, AppError>> + Send;
}

/// Persists extraction rules per job.
pub trait RuleStore: Send + Sync + Clone {
    fn set_rules(
        &self,
        job_id: Uuid,
        rules: &[ExtractionRule],
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn get_rules(
        &self,
        job_id: Uuid,
    ) -> impl Future<Output = Result<Vec<ExtractionRule>, AppError>> + Send;
}

/// Persists extracted records.
pub trait ResultStore: Send + Sync + Clone {
    /// Save a record. Returns the generated UUID.
    fn save(&self, record: &NewResultRecord) -> impl Future<Output = Result<Uuid, AppError>> + Send;

    fn list(
        &self,
        job_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> impl Future<Output = Result<Vec<ResultRecord>, AppError>> + Send;

    fn count(&self, job_id: Uuid) -> impl Future<Output = Result<i64, AppError>> + Send;
}
