use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of a job log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    /// A URL made it all the way through: fetched, extracted, persisted.
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "success" => Ok(LogLevel::Success),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Unknown log level: {s}")),
        }
    }
}

/// One structured event in a job's log stream. `seq` is assigned by the
/// buffer and grows monotonically across the life of the job, including
/// past trimmed events.
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// A page returned by a log query: every retained event at or after the
/// requested index, plus cursors for the next poll.
#[derive(Debug, Clone, Serialize)]
pub struct LogPage {
    pub events: Vec<LogEvent>,
    /// Number of events ever emitted for the job.
    pub total_count: u64,
    /// Sequence number the next poll should pass as `since`.
    pub current_index: u64,
}

/// Bounded in-memory event log for one job. Holds the most recent
/// `capacity` events; older ones are dropped but their sequence numbers
/// remain reserved, so pollers can detect gaps.
#[derive(Debug)]
pub struct JobLogBuffer {
    events: std::collections::VecDeque<LogEvent>,
    first_seq: u64,
    next_seq: u64,
    capacity: usize,
}

pub const DEFAULT_LOG_CAPACITY: usize = 1_000;

impl JobLogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: std::collections::VecDeque::with_capacity(capacity.min(64)),
            first_seq: 0,
            next_seq: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) -> u64 {
        self.push_with_data(level, message, None)
    }

    pub fn push_with_data(
        &mut self,
        level: LogLevel,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push_back(LogEvent {
            seq,
            timestamp: Utc::now(),
            level,
            message: message.into(),
            data,
        });
        if self.events.len() > self.capacity {
            self.events.pop_front();
            self.first_seq = seq + 1 - self.capacity as u64;
        }
        seq
    }

    /// Returns retained events with `seq >= since`, newest last,
    /// optionally filtered by minimum level.
    pub fn page(&self, since: u64, min_level: Option<LogLevel>) -> LogPage {
        let events = self
            .events
            .iter()
            .filter(|e| e.seq >= since)
            .filter(|e| min_level.is_none_or(|min| e.level >= min))
            .cloned()
            .collect();
        LogPage {
            events,
            total_count: self.next_seq,
            current_index: self.next_seq,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Sequence number of the oldest retained event.
    pub fn first_seq(&self) -> u64 {
        self.first_seq
    }
}

impl Default for JobLogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

/// Cloneable appender for one job's log buffer, handed to the worker.
#[derive(Debug, Clone)]
pub struct JobLog {
    inner: Arc<Mutex<JobLogBuffer>>,
}

impl JobLog {
    pub fn push(&self, level: LogLevel, message: impl Into<String>) {
        let mut buf = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        buf.push(level, message);
    }

    pub fn push_with_data(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        data: serde_json::Value,
    ) {
        let mut buf = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        buf.push_with_data(level, message, Some(data));
    }

    pub fn page(&self, since: u64, min_level: Option<LogLevel>) -> LogPage {
        let buf = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        buf.page(since, min_level)
    }
}

/// Registry of per-job log buffers.
#[derive(Debug, Clone, Default)]
pub struct LogHub {
    buffers: Arc<Mutex<HashMap<Uuid, JobLog>>>,
    capacity: usize,
}

impl LogHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffers: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    /// Returns the job's log handle, creating the buffer on first use.
    pub fn handle(&self, job_id: Uuid) -> JobLog {
        let capacity = if self.capacity == 0 {
            DEFAULT_LOG_CAPACITY
        } else {
            self.capacity
        };
        let mut map = self.buffers.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(job_id)
            .or_insert_with(|| JobLog {
                inner: Arc::new(Mutex::new(JobLogBuffer::new(capacity))),
            })
            .clone()
    }

    /// Queries a job's log without creating a buffer for unknown jobs.
    pub fn page(&self, job_id: Uuid, since: u64, min_level: Option<LogLevel>) -> Option<LogPage> {
        let map = self.buffers.lock().unwrap_or_else(|e| e.into_inner());
        map.get(&job_id).map(|log| log.page(since, min_level))
    }

    pub fn remove(&self, job_id: Uuid) {
        let mut map = self.buffers.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(&job_id);
    }
}
