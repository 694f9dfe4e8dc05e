use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fetch::StrategyId;

/// Status of an extraction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// A job can be started fresh from these states.
    pub fn can_start(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Paused)
    }

    /// Completed and failed jobs may be restarted (queue reset to
    /// pending); cancelled jobs may not.
    pub fn is_restartable(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "paused" => Ok(JobStatus::Paused),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(format!("Unknown job status: {s}")),
        }
    }
}

/// How a job sources its URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobMode {
    /// A single URL.
    Single,
    /// A user-supplied URL list.
    List,
    /// A seeded crawl frontier (processed like a list; frontier
    /// expansion is not part of this engine).
    Crawl,
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobMode::Single => "single",
            JobMode::List => "list",
            JobMode::Crawl => "crawl",
        }
    }
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(JobMode::Single),
            "list" => Ok(JobMode::List),
            "crawl" => Ok(JobMode::Crawl),
            _ => Err(format!("Unknown job mode: {s}")),
        }
    }
}

/// Per-job overrides for fetching and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    /// Cascade order override. `None` uses the registry's default order.
    #[serde(default)]
    pub cascade_order: Option<Vec<StrategyId>>,

    /// Per-strategy invocation timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum cascade exhaustions per URL across job runs.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Inter-request delay window in milliseconds, sampled uniformly.
    #[serde(default = "default_delay_min_ms")]
    pub delay_min_ms: u64,
    #[serde(default = "default_delay_max_ms")]
    pub delay_max_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}
fn default_max_retries() -> u32 {
    3
}
fn default_delay_min_ms() -> u64 {
    1_000
}
fn default_delay_max_ms() -> u64 {
    3_000
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            cascade_order: None,
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            delay_min_ms: default_delay_min_ms(),
            delay_max_ms: default_delay_max_ms(),
        }
    }
}

impl JobSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// A bulk extraction job: one run over a set of URLs with shared rules
/// and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub name: String,
    pub mode: JobMode,
    pub settings: JobSettings,
    pub status: JobStatus,
    pub progress_current: u32,
    pub progress_total: u32,
    pub success_count: u32,
    pub failure_count: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl Job {
    /// Snapshot for progress pollers.
    pub fn progress(&self) -> JobProgress {
        JobProgress {
            status: self.status,
            current: self.progress_current,
            total: self.progress_total,
            success: self.success_count,
            failure: self.failure_count,
        }
    }
}

/// What `get_progress` returns.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct JobProgress {
    pub status: JobStatus,
    pub current: u32,
    pub total: u32,
    pub success: u32,
    pub failure: u32,
}

/// Request to create a new job.
#[derive(Debug, Clone)]
pub struct CreateJobRequest {
    pub name: String,
    pub mode: JobMode,
    pub settings: JobSettings,
}

impl CreateJobRequest {
    pub fn new(name: impl Into<String>, mode: JobMode) -> Self {
        Self {
            name: name.into(),
            mode,
            settings: JobSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: JobSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Status of one URL within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl UrlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlStatus::Pending => "pending",
            UrlStatus::Processing => "processing",
            UrlStatus::Completed => "completed",
            UrlStatus::Failed => "failed",
            UrlStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UrlStatus::Completed | UrlStatus::Failed | UrlStatus::Skipped
        )
    }
}

impl fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UrlStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(UrlStatus::Pending),
            "processing" => Ok(UrlStatus::Processing),
            "completed" => Ok(UrlStatus::Completed),
            "failed" => Ok(UrlStatus::Failed),
            "skipped" => Ok(UrlStatus::Skipped),
            _ => Err(format!("Unknown URL status: {s}")),
        }
    }
}

/// One URL in a job's queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlEntry {
    pub id: Uuid,
    pub job_id: Uuid,
    pub url: String,
    pub status: UrlStatus,
    pub attempt_count: u32,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processing_time_ms: Option<i64>,
}

/// URL counts per status for one job.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct UrlCounts {
    pub pending: u32,
    pub processing: u32,
    pub completed: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl UrlCounts {
    pub fn total(&self) -> u32 {
        self.pending + self.processing + self.completed + self.failed + self.skipped
    }

    /// True when no URL can still make progress.
    pub fn is_drained(&self) -> bool {
        self.pending == 0 && self.processing == 0
    }
}

/// One extraction rule, passed unmodified to the field extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRule {
    pub name: String,
    pub selector_type: SelectorType,
    pub selector: String,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub is_list: bool,
    #[serde(default)]
    pub is_required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorType {
    Css,
    XPath,
}

/// An immutable, successfully extracted record for one URL.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord {
    pub id: Uuid,
    pub job_id: Uuid,
    pub url_id: Uuid,
    pub data: serde_json::Value,
    pub strategy: StrategyId,
    pub cascade_attempts: u32,
    pub elapsed_ms: i64,
    pub created_at: DateTime<Utc>,
}

/// DTO for inserting a new result record.
#[derive(Debug, Clone, Serialize)]
pub struct NewResultRecord {
    pub job_id: Uuid,
    pub url_id: Uuid,
    pub data: serde_json::Value,
    pub strategy: StrategyId,
    pub cascade_attempts: u32,
    pub elapsed_ms: i64,
}
