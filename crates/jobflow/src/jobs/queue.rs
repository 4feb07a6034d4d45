use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::error::EnqueueError;
use crate::jobs::idempotency::{payload_hash, IdempotencyGuard};
use crate::jobs::model::{EnqueueOptions, Job, NewJob};
use crate::jobs::store::JobStore;
use crate::workflow::{JobType, WorkflowRegistry};

/// Enqueue-side entry point: validation, deduplication, insertion.
///
/// Order matters: validation happens before any side effect, and the
/// idempotency marker is set only after the insert succeeds, so a failed
/// insert leaves nothing behind and the caller may retry immediately.
#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    guard: IdempotencyGuard,
    registry: Arc<WorkflowRegistry>,
}

impl JobQueue {
    pub fn new(
        store: Arc<dyn JobStore>,
        guard: IdempotencyGuard,
        registry: Arc<WorkflowRegistry>,
    ) -> Self {
        Self {
            store,
            guard,
            registry,
        }
    }

    pub async fn enqueue(
        &self,
        job_type: JobType,
        raw_payload: Value,
        opts: EnqueueOptions,
    ) -> Result<Job, EnqueueError> {
        let first_step = self
            .registry
            .first_step(job_type)
            .ok_or_else(|| EnqueueError::UnknownJobType(job_type.to_string()))?;

        let payload = self
            .registry
            .validate_payload(job_type, &raw_payload)
            .map_err(|detail| EnqueueError::InvalidPayload {
                job_type: job_type.to_string(),
                detail,
            })?;

        let hash = payload_hash(&payload);

        if self.guard.check(job_type, &hash).await? {
            return Err(EnqueueError::DuplicateJob {
                job_type: job_type.to_string(),
            });
        }

        let job = self
            .store
            .insert(NewJob {
                job_type,
                step: first_step.to_string(),
                payload,
                priority: opts.priority,
            })
            .await?;

        // The job row exists either way; a marker write failure only
        // weakens dedupe, so it must not fail the enqueue.
        if let Err(e) = self.guard.mark(job_type, &hash, opts.dedupe_ttl).await {
            warn!(job_id = %job.id, error = %e, "failed to set idempotency marker");
        }

        Ok(job)
    }
}
