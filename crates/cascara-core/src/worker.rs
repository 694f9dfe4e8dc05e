use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cascade::CascadeDispatcher;
use crate::error::AppError;
use crate::fetch::StrategyId;
use crate::job::{Job, JobStatus, UrlEntry};
use crate::log::{JobLog, LogLevel};
use crate::pacing::PacingConfig;
use crate::traits::{FieldExtractor, JobStore, ResultStore, RuleStore, StrategyRegistry, UrlStore};

/// Events emitted by the worker for monitoring/logging.
#[derive(Debug, Clone)]
pub enum WorkerEvent<'a> {
    RunStarted {
        job_id: Uuid,
        total: u32,
    },
    UrlStarted {
        job_id: Uuid,
        url: &'a str,
    },
    UrlCompleted {
        job_id: Uuid,
        url: &'a str,
        strategy: &'a StrategyId,
        attempts: usize,
    },
    UrlFailed {
        job_id: Uuid,
        url: &'a str,
        error_type: &'a str,
        error: &'a str,
    },
    RunPaused {
        job_id: Uuid,
    },
    RunStopped {
        job_id: Uuid,
    },
    RunCompleted {
        job_id: Uuid,
        success: u32,
        failure: u32,
    },
    RunFailed {
        job_id: Uuid,
        error: &'a str,
    },
}

/// Trait for receiving worker events (decoupled logging).
pub trait WorkerReporter: Send + Sync {
    fn report(&self, event: WorkerEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWorkerReporter;

impl WorkerReporter for TracingWorkerReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        match event {
            WorkerEvent::RunStarted { job_id, total } => {
                tracing::info!(%job_id, %total, "Job run started");
            }
            WorkerEvent::UrlStarted { job_id, url } => {
                tracing::debug!(%job_id, %url, "Processing URL");
            }
            WorkerEvent::UrlCompleted {
                job_id,
                url,
                strategy,
                attempts,
            } => {
                tracing::info!(%job_id, %url, %strategy, %attempts, "URL completed");
            }
            WorkerEvent::UrlFailed {
                job_id,
                url,
                error_type,
                error,
            } => {
                tracing::warn!(%job_id, %url, %error_type, %error, "URL failed");
            }
            WorkerEvent::RunPaused { job_id } => {
                tracing::info!(%job_id, "Job paused");
            }
            WorkerEvent::RunStopped { job_id } => {
                tracing::info!(%job_id, "Job stopped");
            }
            WorkerEvent::RunCompleted {
                job_id,
                success,
                failure,
            } => {
                tracing::info!(%job_id, %success, %failure, "Job completed");
            }
            WorkerEvent::RunFailed { job_id, error } => {
                tracing::error!(%job_id, %error, "Job failed");
            }
        }
    }
}

/// Cooperative control handle for one job run. Pause and stop are
/// observed at URL boundaries; the URL in flight always finishes first.
#[derive(Debug, Clone, Default)]
pub struct JobControl {
    pause: CancellationToken,
    stop: CancellationToken,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_pause(&self) {
        self.pause.cancel();
    }

    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    pub fn pause_requested(&self) -> bool {
        self.pause.is_cancelled()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }

    fn pause_token(&self) -> &CancellationToken {
        &self.pause
    }
}

/// How one URL ended.
enum UrlOutcome {
    Success,
    Failure,
    Skipped,
}

/// Drives one job run: drains the URL queue through the cascade
/// dispatcher and field extractor, persisting results and counters.
pub struct JobWorker<J, U, R, S, Reg, E>
where
    J: JobStore,
    U: UrlStore,
    R: RuleStore,
    S: ResultStore,
    Reg: StrategyRegistry,
    E: FieldExtractor,
{
    jobs: J,
    urls: U,
    rules: R,
    results: S,
    dispatcher: CascadeDispatcher<Reg>,
    extractor: E,
    pacing: PacingConfig,
    log: JobLog,
}

impl<J, U, R, S, Reg, E> JobWorker<J, U, R, S, Reg, E>
where
    J: JobStore,
    U: UrlStore,
    R: RuleStore,
    S: ResultStore,
    Reg: StrategyRegistry,
    E: FieldExtractor,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jobs: J,
        urls: U,
        rules: R,
        results: S,
        dispatcher: CascadeDispatcher<Reg>,
        extractor: E,
        pacing: PacingConfig,
        log: JobLog,
    ) -> Self {
        Self {
            jobs,
            urls,
            rules,
            results,
            dispatcher,
            extractor,
            pacing,
            log,
        }
    }

    /// Runs the job to a terminal or paused state. Infrastructure
    /// faults (store failures, bad configuration) fail the whole job;
    /// per-URL obstacles only fail that URL.
    pub async fn run<WR: WorkerReporter>(
        &self,
        job: &Job,
        control: &JobControl,
        reporter: &WR,
    ) -> Result<JobStatus, AppError> {
        match self.drive(job, control, reporter).await {
            Ok(status) => Ok(status),
            Err(e) => {
                let message = e.to_string();
                self.log.push(LogLevel::Error, format!("Job failed: {message}"));
                reporter.report(WorkerEvent::RunFailed {
                    job_id: job.id,
                    error: &message,
                });
                self.jobs
                    .set_status(job.id, JobStatus::Failed, Some(&message))
                    .await?;
                Err(e)
            }
        }
    }

    async fn drive<WR: WorkerReporter>(
        &self,
        job: &Job,
        control: &JobControl,
        reporter: &WR,
    ) -> Result<JobStatus, AppError> {
        self.jobs.set_status(job.id, JobStatus::Running, None).await?;

        let counts = self.urls.counts(job.id).await?;
        let total = counts.total();
        // Resuming a paused or restarted run keeps earlier counters.
        let mut current = job.progress_current.min(total);
        let mut success = job.success_count;
        let mut failure = job.failure_count;

        self.log
            .push(LogLevel::Info, format!("Job started: {total} URLs queued"));
        reporter.report(WorkerEvent::RunStarted {
            job_id: job.id,
            total,
        });
        self.jobs
            .update_progress(job.id, current, total, success, failure)
            .await?;

        let rules = self.rules.get_rules(job.id).await?;

        loop {
            if control.stop_requested() {
                self.log.push(LogLevel::Warning, "Job stopped by request");
                reporter.report(WorkerEvent::RunStopped { job_id: job.id });
                self.jobs
                    .set_status(job.id, JobStatus::Cancelled, None)
                    .await?;
                return Ok(JobStatus::Cancelled);
            }
            if control.pause_requested() {
                self.log.push(LogLevel::Info, "Job paused");
                reporter.report(WorkerEvent::RunPaused { job_id: job.id });
                self.jobs.set_status(job.id, JobStatus::Paused, None).await?;
                return Ok(JobStatus::Paused);
            }

            let Some(entry) = self.urls.claim_next(job.id).await? else {
                break;
            };

            let outcome = self.process_url(job, &entry, &rules, reporter).await?;
            current += 1;
            match outcome {
                UrlOutcome::Success => success += 1,
                UrlOutcome::Failure => failure += 1,
                UrlOutcome::Skipped => {}
            }
            // Log events precede the counter write, so a poller that
            // sees updated progress can already read the matching logs.
            self.jobs
                .update_progress(job.id, current, total, success, failure)
                .await?;

            if current < total {
                tokio::select! {
                    () = self.pacing.pause(control.stop_token()) => {}
                    () = control.pause_token().cancelled() => {}
                }
            }
        }

        self.log.push(
            LogLevel::Info,
            format!("Job completed: {success} succeeded, {failure} failed"),
        );
        reporter.report(WorkerEvent::RunCompleted {
            job_id: job.id,
            success,
            failure,
        });
        self.jobs
            .set_status(job.id, JobStatus::Completed, None)
            .await?;
        Ok(JobStatus::Completed)
    }

    async fn process_url<WR: WorkerReporter>(
        &self,
        job: &Job,
        entry: &UrlEntry,
        rules: &[crate::job::ExtractionRule],
        reporter: &WR,
    ) -> Result<UrlOutcome, AppError> {
        reporter.report(WorkerEvent::UrlStarted {
            job_id: job.id,
            url: &entry.url,
        });

        if entry.attempt_count > job.settings.max_retries {
            let reason = format!(
                "attempt budget spent ({} of {})",
                entry.attempt_count, job.settings.max_retries
            );
            self.log
                .push(LogLevel::Warning, format!("Skipped {}: {reason}", entry.url));
            self.urls.mark_skipped(entry.id, &reason).await?;
            return Ok(UrlOutcome::Skipped);
        }

        let result = self
            .dispatcher
            .fetch(
                &entry.url,
                job.settings.cascade_order.as_deref(),
                job.settings.timeout(),
            )
            .await;

        let Some(accepted) = result.accepted_attempt() else {
            let error_type = result
                .last_verdict()
                .map(|v| v.as_str())
                .unwrap_or("cascade_exhausted");
            let error = format!(
                "all {} strategies exhausted for {}",
                result.attempts.len(),
                entry.url
            );
            self.log.push_with_data(
                LogLevel::Error,
                format!("Failed {}: {error_type}", entry.url),
                serde_json::json!({
                    "attempts": result.attempts.len(),
                    "verdicts": result
                        .attempts
                        .iter()
                        .map(|a| a.verdict.as_str())
                        .collect::<Vec<_>>(),
                }),
            );
            reporter.report(WorkerEvent::UrlFailed {
                job_id: job.id,
                url: &entry.url,
                error_type,
                error: &error,
            });
            self.urls.mark_failed(entry.id, error_type, &error).await?;
            return Ok(UrlOutcome::Failure);
        };

        let field_set = match self.extractor.extract(&accepted.outcome.body, rules) {
            Ok(fields) if fields.required_satisfied => fields,
            Ok(fields) => {
                let error = format!("required fields missing: {}", fields.missing.join(", "));
                return self
                    .fail_url(job, entry, "extraction_failed", &error, reporter)
                    .await;
            }
            Err(e) => {
                let error = e.to_string();
                return self
                    .fail_url(job, entry, "extraction_failed", &error, reporter)
                    .await;
            }
        };

        self.results
            .save(&crate::job::NewResultRecord {
                job_id: job.id,
                url_id: entry.id,
                data: field_set.data,
                strategy: accepted.strategy.clone(),
                cascade_attempts: result.attempts.len() as u32,
                elapsed_ms: result.elapsed_ms as i64,
            })
            .await?;
        self.urls
            .mark_completed(entry.id, result.elapsed_ms as i64)
            .await?;

        self.log.push_with_data(
            LogLevel::Success,
            format!(
                "Completed {} via {} ({} attempt{})",
                entry.url,
                accepted.strategy,
                result.attempts.len(),
                if result.attempts.len() == 1 { "" } else { "s" }
            ),
            serde_json::json!({
                "url": entry.url,
                "strategy": accepted.strategy.to_string(),
                "attempts": result.attempts.len(),
                "elapsed_ms": result.elapsed_ms,
            }),
        );
        reporter.report(WorkerEvent::UrlCompleted {
            job_id: job.id,
            url: &entry.url,
            strategy: &accepted.strategy,
            attempts: result.attempts.len(),
        });
        Ok(UrlOutcome::Success)
    }

    async fn fail_url<WR: WorkerReporter>(
        &self,
        job: &Job,
        entry: &UrlEntry,
        error_type: &str,
        error: &str,
        reporter: &WR,
    ) -> Result<UrlOutcome, AppError> {
        self.log
            .push(LogLevel::Error, format!("Failed {}: {error}", entry.url));
        reporter.report(WorkerEvent::UrlFailed {
            job_id: job.id,
            url: &entry.url,
            error_type,
            error,
        });
        self.urls.mark_failed(entry.id, error_type, error).await?;
        Ok(UrlOutcome::Failure)
    }
}
