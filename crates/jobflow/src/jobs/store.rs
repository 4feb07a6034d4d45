use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::jobs::model::{Job, JobStatus, NewJob};

/// Durable persistence of job rows.
///
/// The runner is the single writer: every mutating method here is called
/// while holding the job's lock, so implementations do not need their own
/// per-row concurrency control beyond ordinary atomic updates.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, new: NewJob) -> anyhow::Result<Job>;

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Job>>;

    /// Oldest job (by `created_at`) whose status is pending or running,
    /// excluding ids already skipped in the current batch. Terminal jobs
    /// are never returned.
    async fn next_actionable(&self, exclude: &[Uuid]) -> anyhow::Result<Option<Job>>;

    /// Transition to running. Idempotent when the job already is.
    async fn mark_running(&self, id: Uuid) -> anyhow::Result<()>;

    /// Record a successful step: merge `output` into the result map under
    /// `step`, clear the error, and either advance to `advance_to`
    /// (status stays running) or finish as done when there is no next
    /// step.
    async fn record_step_success(
        &self,
        id: Uuid,
        step: &str,
        output: Value,
        advance_to: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Record a failed step with the runner's verdict: `status` is either
    /// pending (retry on a later cycle, same step) or failed (attempts
    /// exhausted, permanent).
    async fn record_step_failure(
        &self,
        id: Uuid,
        error: &str,
        attempts: i32,
        status: JobStatus,
    ) -> anyhow::Result<()>;
}
