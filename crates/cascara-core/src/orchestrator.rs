use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::cascade::{CascadeDispatcher, FallbackPolicy};
use crate::classifier::ClassifierConfig;
use crate::error::AppError;
use crate::job::{Job, JobProgress, JobStatus};
use crate::log::{LogEvent, LogHub, LogLevel, LogPage};
use crate::pacing::PacingConfig;
use crate::traits::{FieldExtractor, JobStore, ResultStore, RuleStore, StrategyRegistry, UrlStore};
use crate::worker::{JobControl, JobWorker, TracingWorkerReporter};

/// Registry entry for one job. `task` is `None` while `start` is still
/// validating the job (a reservation that blocks concurrent starts).
struct JobHandle {
    control: JobControl,
    task: Option<JoinHandle<()>>,
}

impl JobHandle {
    fn is_finished(&self) -> bool {
        self.task.as_ref().is_some_and(|task| task.is_finished())
    }
}

/// A log page with the job's status at read time.
#[derive(Debug, Clone)]
pub struct JobLogs {
    pub events: Vec<LogEvent>,
    /// Number of events ever emitted for the job.
    pub total_count: u64,
    /// Sequence number the next poll should pass as `since`.
    pub current_index: u64,
    pub job_status: JobStatus,
}

/// Owns the set of running jobs: spawns one worker task per started
/// job and routes pause/stop/progress/log requests to it.
///
/// At most one worker runs per job at a time; a second start while the
/// first is live is a conflict. Pause and stop only flip tokens here;
/// the worker persists the resulting status at its next URL boundary.
pub struct JobOrchestrator<J, U, R, S, Reg, E>
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
    registry: Reg,
    extractor: E,
    classifier: ClassifierConfig,
    policy: FallbackPolicy,
    logs: LogHub,
    running: Arc<Mutex<HashMap<Uuid, JobHandle>>>,
}

impl<J, U, R, S, Reg, E> JobOrchestrator<J, U, R, S, Reg, E>
where
    J: JobStore + 'static,
    U: UrlStore + 'static,
    R: RuleStore + 'static,
    S: ResultStore + 'static,
    Reg: StrategyRegistry + 'static,
    E: FieldExtractor + 'static,
{
    pub fn new(jobs: J, urls: U, rules: R, results: S, registry: Reg, extractor: E) -> Self {
        Self {
            jobs,
            urls,
            rules,
            results,
            registry,
            extractor,
            classifier: ClassifierConfig::default(),
            policy: FallbackPolicy::default(),
            logs: LogHub::new(),
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Starts (or restarts) a job. Completed and failed jobs get their
    /// queue and counters reset first; cancelled jobs stay cancelled.
    pub async fn start(&self, job_id: Uuid) -> Result<(), AppError> {
        let control = JobControl::new();
        {
            // Reserve the id under the same lock as the conflict check:
            // the validation below awaits, and a concurrent start must
            // not slip past contains_key in the meantime.
            let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
            running.retain(|_, handle| !handle.is_finished());
            if running.contains_key(&job_id) {
                return Err(AppError::WorkerConflict(job_id));
            }
            running.insert(
                job_id,
                JobHandle {
                    control: control.clone(),
                    task: None,
                },
            );
        }

        let job = match self.validate_start(job_id).await {
            Ok(job) => job,
            Err(e) => {
                let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
                running.remove(&job_id);
                return Err(e);
            }
        };

        let pacing = PacingConfig::from_millis(job.settings.delay_min_ms, job.settings.delay_max_ms);
        let worker = JobWorker::new(
            self.jobs.clone(),
            self.urls.clone(),
            self.rules.clone(),
            self.results.clone(),
            CascadeDispatcher::new(self.registry.clone(), self.classifier.clone())
                .with_policy(self.policy.clone())
                .with_pacing(pacing),
            self.extractor.clone(),
            pacing,
            self.logs.handle(job_id),
        );

        let task_control = control.clone();
        let task = tokio::spawn(async move {
            // run() persists the terminal status and logs failures
            let _ = worker.run(&job, &task_control, &TracingWorkerReporter).await;
        });

        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = running.get_mut(&job_id) {
            handle.task = Some(task);
        }
        Ok(())
    }

    /// Loads the job and checks it may start, restarting a terminal
    /// queue when needed. Caller holds a registry reservation.
    async fn validate_start(&self, job_id: Uuid) -> Result<Job, AppError> {
        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or(AppError::JobNotFound(job_id))?;

        if job.status.can_start() {
            Ok(job)
        } else if job.status.is_restartable() {
            self.restart_queue(&job).await
        } else {
            Err(AppError::InvalidJobStatus {
                job_id,
                status: job.status.to_string(),
                action: "start",
            })
        }
    }

    async fn restart_queue(&self, job: &Job) -> Result<Job, AppError> {
        let reset = self.urls.reset_for_restart(job.id).await?;
        self.logs.handle(job.id).push(
            LogLevel::Info,
            format!("Job restarted: {reset} URLs requeued"),
        );
        self.jobs.update_progress(job.id, 0, 0, 0, 0).await?;
        self.jobs.set_status(job.id, JobStatus::Pending, None).await?;
        self.jobs
            .get(job.id)
            .await?
            .ok_or(AppError::JobNotFound(job.id))
    }

    /// Requests a pause. The worker checkpoints after the URL in
    /// flight, then persists the paused status.
    pub async fn pause(&self, job_id: Uuid) -> Result<(), AppError> {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        match running.get(&job_id) {
            Some(handle) => {
                handle.control.request_pause();
                Ok(())
            }
            None => Err(AppError::InvalidJobStatus {
                job_id,
                status: "not running".to_string(),
                action: "pause",
            }),
        }
    }

    /// Requests a stop. A live worker cancels at its next checkpoint;
    /// a pending or paused job is cancelled directly.
    pub async fn stop(&self, job_id: Uuid) -> Result<(), AppError> {
        {
            let running = self.running.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(handle) = running.get(&job_id) {
                handle.control.request_stop();
                return Ok(());
            }
        }

        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or(AppError::JobNotFound(job_id))?;
        if job.status.is_terminal() {
            return Err(AppError::InvalidJobStatus {
                job_id,
                status: job.status.to_string(),
                action: "stop",
            });
        }
        self.logs
            .handle(job_id)
            .push(LogLevel::Warning, "Job stopped by request");
        self.jobs
            .set_status(job_id, JobStatus::Cancelled, None)
            .await
    }

    pub async fn progress(&self, job_id: Uuid) -> Result<JobProgress, AppError> {
        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or(AppError::JobNotFound(job_id))?;
        Ok(job.progress())
    }

    /// Returns retained log events at or after `since`, optionally
    /// filtered by minimum level, plus the job's current status so a
    /// poller knows when to stop. Jobs that never ran have empty logs.
    pub async fn logs(
        &self,
        job_id: Uuid,
        since: u64,
        min_level: Option<LogLevel>,
    ) -> Result<JobLogs, AppError> {
        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or(AppError::JobNotFound(job_id))?;
        let page = self.logs.page(job_id, since, min_level).unwrap_or(LogPage {
            events: Vec::new(),
            total_count: 0,
            current_index: 0,
        });
        Ok(JobLogs {
            events: page.events,
            total_count: page.total_count,
            current_index: page.current_index,
            job_status: job.status,
        })
    }

    pub fn is_running(&self, job_id: Uuid) -> bool {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        running
            .get(&job_id)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Waits for the job's worker task to finish. No-op when the job
    /// is not running.
    pub async fn join(&self, job_id: Uuid) -> Result<(), AppError> {
        let handle = {
            let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
            running.remove(&job_id)
        };
        if let Some(JobHandle {
            task: Some(task), ..
        }) = handle
        {
            task.await
                .map_err(|e| AppError::Generic(format!("worker task panicked: {e}")))?;
        }
        Ok(())
    }
}
