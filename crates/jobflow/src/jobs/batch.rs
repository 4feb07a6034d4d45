use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::jobs::runner::{CycleOutcome, CycleStatus, JobRunner};

/// Aggregate of one bounded batch run, suitable for logging/alerting by
/// the external trigger.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub details: Vec<CycleOutcome>,
}

/// Drives the runner in a bounded loop. The unit an external scheduler
/// invokes; it owns no scheduling logic of its own and never returns an
/// error.
#[derive(Clone)]
pub struct BatchCoordinator {
    runner: JobRunner,
}

impl BatchCoordinator {
    pub fn new(runner: JobRunner) -> Self {
        Self { runner }
    }

    /// Run up to `limit` cycles, stopping early when the queue drains.
    /// Jobs skipped for lock contention are excluded from re-selection
    /// for the remainder of this batch so the loop cannot spin on them.
    pub async fn process_batch(&self, limit: usize) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let mut skipped_ids: Vec<Uuid> = Vec::new();

        for _ in 0..limit {
            let Some(outcome) = self.runner.process_next_job(&skipped_ids).await else {
                break;
            };

            summary.processed += 1;
            match outcome.status {
                CycleStatus::Ok => summary.succeeded += 1,
                CycleStatus::Failed => summary.failed += 1,
                CycleStatus::Skipped => {
                    summary.skipped += 1;
                    skipped_ids.push(outcome.job_id);
                }
            }
            summary.details.push(outcome);
        }

        info!(
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "batch complete"
        );

        summary
    }
}
