use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cascara_core::job::{
    ExtractionRule, Job, JobProgress, JobSettings, ResultRecord, SelectorType, UrlEntry,
};
use cascara_core::log::LogEvent;
use cascara_core::orchestrator::JobLogs;

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateJobBody {
    pub name: String,
    /// "single", "list" or "crawl". Defaults to "list".
    pub mode: Option<String>,
    pub settings: Option<JobSettingsDto>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RuleDto>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct JobSettingsDto {
    pub cascade_order: Option<Vec<String>>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub delay_min_ms: Option<u64>,
    pub delay_max_ms: Option<u64>,
}

impl From<JobSettingsDto> for JobSettings {
    fn from(dto: JobSettingsDto) -> Self {
        let defaults = JobSettings::default();
        JobSettings {
            cascade_order: dto
                .cascade_order
                .map(|order| order.into_iter().map(Into::into).collect()),
            timeout_ms: dto.timeout_ms.unwrap_or(defaults.timeout_ms),
            max_retries: dto.max_retries.unwrap_or(defaults.max_retries),
            delay_min_ms: dto.delay_min_ms.unwrap_or(defaults.delay_min_ms),
            delay_max_ms: dto.delay_max_ms.unwrap_or(defaults.delay_max_ms),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RuleDto {
    pub name: String,
    /// "css" (default) or "xpath".
    pub selector_type: Option<String>,
    pub selector: String,
    pub attribute: Option<String>,
    #[serde(default)]
    pub is_list: bool,
    #[serde(default)]
    pub is_required: bool,
}

impl From<RuleDto> for ExtractionRule {
    fn from(dto: RuleDto) -> Self {
        ExtractionRule {
            name: dto.name,
            selector_type: match dto.selector_type.as_deref() {
                Some("xpath") => SelectorType::XPath,
                _ => SelectorType::Css,
            },
            selector: dto.selector,
            attribute: dto.attribute,
            is_list: dto.is_list,
            is_required: dto.is_required,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CreateJobResponse {
    pub job_id: Uuid,
    pub status: String,
    pub url_count: usize,
    pub rule_count: usize,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobResponse {
    pub id: Uuid,
    pub name: String,
    pub mode: String,
    pub status: String,
    pub progress_current: u32,
    pub progress_total: u32,
    pub success_count: u32,
    pub failure_count: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            name: job.name,
            mode: job.mode.to_string(),
            status: job.status.to_string(),
            progress_current: job.progress_current,
            progress_total: job.progress_total,
            success_count: job.success_count,
            failure_count: job.failure_count,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            error_message: job.error_message,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobListResponse {
    pub jobs: Vec<JobResponse>,
    /// Matching jobs overall, before the limit is applied.
    pub total: i64,
}

/// Acknowledgement for start/pause/stop requests; the worker applies
/// the transition asynchronously.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ControlResponse {
    pub job_id: Uuid,
    pub action: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProgressResponse {
    pub status: String,
    pub current: u32,
    pub total: u32,
    pub success: u32,
    pub failure: u32,
}

impl From<JobProgress> for ProgressResponse {
    fn from(p: JobProgress) -> Self {
        Self {
            status: p.status.to_string(),
            current: p.current,
            total: p.total,
            success: p.success,
            failure: p.failure,
        }
    }
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct LogsQuery {
    /// Sequence cursor from a previous poll; defaults to 0.
    pub since: Option<u64>,
    /// Minimum level: "debug", "info", "warning" or "error".
    pub level: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LogEventResponse {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl From<LogEvent> for LogEventResponse {
    fn from(e: LogEvent) -> Self {
        Self {
            seq: e.seq,
            timestamp: e.timestamp,
            level: e.level.to_string(),
            message: e.message,
            data: e.data,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LogsResponse {
    pub logs: Vec<LogEventResponse>,
    pub total_count: u64,
    pub current_index: u64,
    pub job_status: String,
}

impl From<JobLogs> for LogsResponse {
    fn from(logs: JobLogs) -> Self {
        Self {
            logs: logs.events.into_iter().map(Into::into).collect(),
            total_count: logs.total_count,
            current_index: logs.current_index,
            job_status: logs.job_status.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// URLs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListUrlsQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UrlResponse {
    pub id: Uuid,
    pub url: String,
    pub status: String,
    pub attempt_count: u32,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub processing_time_ms: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<UrlEntry> for UrlResponse {
    fn from(entry: UrlEntry) -> Self {
        Self {
            id: entry.id,
            url: entry.url,
            status: entry.status.to_string(),
            attempt_count: entry.attempt_count,
            error_type: entry.error_type,
            error_message: entry.error_message,
            processing_time_ms: entry.processing_time_ms,
            completed_at: entry.completed_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UrlListResponse {
    pub urls: Vec<UrlResponse>,
    /// Matching URLs overall, before limit/offset are applied.
    pub total: u32,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListResultsQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ResultResponse {
    pub id: Uuid,
    pub url_id: Uuid,
    pub data: serde_json::Value,
    pub strategy: String,
    pub cascade_attempts: u32,
    pub elapsed_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ResultRecord> for ResultResponse {
    fn from(record: ResultRecord) -> Self {
        Self {
            id: record.id,
            url_id: record.url_id,
            data: record.data,
            strategy: record.strategy.to_string(),
            cascade_attempts: record.cascade_attempts,
            elapsed_ms: record.elapsed_ms,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ResultListResponse {
    pub results: Vec<ResultResponse>,
    pub total: i64,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
