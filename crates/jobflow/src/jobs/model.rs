use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::workflow::JobType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Terminal jobs are never selected again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "done" => Ok(JobStatus::Done),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// One persisted workflow instance. Mutated only by the runner, and only
/// while holding that job's lock.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub job_type: JobType,
    /// Name of the step currently due to execute. Always a member of the
    /// type's step list.
    pub step: String,
    pub status: JobStatus,
    /// Validated, normalized input. Immutable after creation.
    pub payload: Value,
    /// Accumulated step outputs, keyed by step name. Steps never erase
    /// each other's entries; re-running a step overwrites its own.
    pub result: Map<String, Value>,
    /// Total failed execution attempts over the job's lifetime. Never
    /// reset by success; gates permanent failure.
    pub attempts: i32,
    /// Accepted at enqueue time, not yet consulted by selection.
    pub priority: i32,
    /// Last failure message; cleared by any subsequent success.
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_type: JobType,
    pub step: String,
    pub payload: Value,
    pub priority: i32,
}

#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    pub priority: i32,
    /// Overrides the default idempotency window.
    pub dedupe_ttl: Option<Duration>,
}
