pub mod cascade;
pub mod classifier;
pub mod error;
pub mod fetch;
pub mod job;
pub mod log;
pub mod orchestrator;
pub mod pacing;
pub mod traits;
pub mod worker;


pub use cascade::{CascadeAttempt, CascadeDispatcher, CascadeResult, FallbackPolicy};
pub use classifier::{ClassifierConfig, Verdict, classify};
pub use error::AppError;
pub use fetch::{FetchOutcome, StrategyId};
pub use job::{
    CreateJobRequest, ExtractionRule, Job, JobMode, JobProgress, JobSettings, JobStatus,
    NewResultRecord, ResultRecord, SelectorType, UrlCounts, UrlEntry, UrlStatus,
};
pub use log::{JobLog, LogEvent, LogHub, LogLevel, LogPage};
pub use orchestrator::{JobLogs, JobOrchestrator};
pub use pacing::PacingConfig;
pub use traits::{
    FieldExtractor, FieldSet, JobStore, ResultStore, RuleStore, StrategyRegistry, UrlStore,
};
pub use worker::{JobControl, JobWorker, TracingWorkerReporter, WorkerEvent, WorkerReporter};
