use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::jobs::dispatch::{StepRegistry, StepResult};
use crate::jobs::lock::JobLock;
use crate::jobs::model::{Job, JobStatus};
use crate::jobs::store::JobStore;
use crate::workflow::{JobType, WorkflowRegistry};

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Lifetime failure budget; reaching it forces the job to failed.
    pub max_attempts: i32,
    /// Hard wait bound on one step execution. The handler itself is not
    /// cancelled, only abandoned, so handlers must be retry-safe.
    pub step_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            step_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    Ok,
    Failed,
    Skipped,
}

/// What one `process_next_job` call did, for the batch summary.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub job_id: Uuid,
    pub job_type: JobType,
    /// The step that was due when the job was selected.
    pub step: String,
    pub status: CycleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CycleOutcome {
    fn of(job: &Job, status: CycleStatus, error: Option<String>) -> Self {
        Self {
            job_id: job.id,
            job_type: job.job_type,
            step: job.step.clone(),
            status,
            error,
        }
    }
}

/// Executes one job step per cycle: select, lock, dispatch under a
/// timeout, interpret, persist, unlock.
#[derive(Clone)]
pub struct JobRunner {
    store: Arc<dyn JobStore>,
    lock: JobLock,
    dispatcher: Arc<StepRegistry>,
    registry: Arc<WorkflowRegistry>,
    cfg: RunnerConfig,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn JobStore>,
        lock: JobLock,
        dispatcher: Arc<StepRegistry>,
        registry: Arc<WorkflowRegistry>,
        cfg: RunnerConfig,
    ) -> Self {
        Self {
            store,
            lock,
            dispatcher,
            registry,
            cfg,
        }
    }

    /// One processing cycle. `None` means no actionable job was found and
    /// the caller should stop looping. Never returns an error: handler
    /// and store failures are absorbed into the outcome, logged where the
    /// outcome cannot carry them.
    pub async fn process_next_job(&self, exclude: &[Uuid]) -> Option<CycleOutcome> {
        let job = match self.store.next_actionable(exclude).await {
            Ok(Some(job)) => job,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "job selection failed");
                return None;
            }
        };

        // Selection and locking are separate operations; losing the lock
        // race to a concurrent runner is a normal skipped outcome.
        match self.lock.acquire(job.id).await {
            Ok(true) => {}
            Ok(false) => return Some(CycleOutcome::of(&job, CycleStatus::Skipped, None)),
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "lock acquire failed");
                return Some(CycleOutcome::of(&job, CycleStatus::Skipped, None));
            }
        }

        let outcome = self.run_locked(&job).await;

        // Unconditional release; a leaked lock self-heals via TTL but
        // holds the job hostage until then.
        if let Err(e) = self.lock.release(job.id).await {
            warn!(job_id = %job.id, error = %e, "lock release failed");
        }

        Some(outcome)
    }

    async fn run_locked(&self, job: &Job) -> CycleOutcome {
        if let Err(e) = self.store.mark_running(job.id).await {
            warn!(job_id = %job.id, error = %e, "failed to mark job running");
            return CycleOutcome::of(job, CycleStatus::Failed, Some(e.to_string()));
        }

        let step_result = match timeout(self.cfg.step_timeout, self.dispatcher.dispatch(job)).await
        {
            Ok(result) => result,
            Err(_) => StepResult::fail(format!(
                "step '{}' timed out after {}ms",
                job.step,
                self.cfg.step_timeout.as_millis()
            )),
        };

        match step_result {
            StepResult::Success { data, next_step } => {
                let advance_to = match next_step {
                    Some(next) if !self.registry.contains_step(job.job_type, &next) => {
                        // Override pointing outside the workflow is a
                        // handler bug; route it through the failure path.
                        return self
                            .record_failure(
                                job,
                                format!(
                                    "step '{}' returned next_step '{next}' not in the {} workflow",
                                    job.step, job.job_type
                                ),
                            )
                            .await;
                    }
                    Some(next) => Some(next),
                    None => self
                        .registry
                        .next_step(job.job_type, &job.step)
                        .map(str::to_string),
                };

                if let Err(e) = self
                    .store
                    .record_step_success(job.id, &job.step, data, advance_to.as_deref())
                    .await
                {
                    warn!(job_id = %job.id, error = %e, "failed to record step success");
                    return CycleOutcome::of(job, CycleStatus::Failed, Some(e.to_string()));
                }

                CycleOutcome::of(job, CycleStatus::Ok, None)
            }
            StepResult::Failure { error } => self.record_failure(job, error).await,
        }
    }

    async fn record_failure(&self, job: &Job, error: String) -> CycleOutcome {
        let attempts = job.attempts + 1;
        let status = if attempts >= self.cfg.max_attempts {
            JobStatus::Failed
        } else {
            JobStatus::Pending
        };

        if let Err(e) = self
            .store
            .record_step_failure(job.id, &error, attempts, status)
            .await
        {
            // Best effort: the job may sit running until its lock
            // expires, at which point selection picks it back up.
            warn!(job_id = %job.id, error = %e, "failed to record step failure");
        }

        CycleOutcome::of(job, CycleStatus::Failed, Some(error))
    }
}
