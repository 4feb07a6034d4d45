use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::kv::KvStore;
use crate::workflow::JobType;

pub const DEFAULT_DEDUPE_TTL: Duration = Duration::from_secs(300);

/// Deterministic hash of a validated payload.
///
/// serde_json serializes object keys in sorted order, so two payloads
/// that differ only in field order hash identically. Callers must pass
/// the post-validation payload; hashing raw input would let unknown
/// fields defeat deduplication.
pub fn payload_hash(payload: &Value) -> String {
    let digest = Sha256::digest(payload.to_string().as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn marker_key(job_type: JobType, hash: &str) -> String {
    format!("jobflow:idem:{}:{hash}", job_type.as_str())
}

/// Best-effort, TTL-bounded enqueue deduplication. A duplicate submitted
/// after the window expires is accepted as a new job.
#[derive(Clone)]
pub struct IdempotencyGuard {
    kv: Arc<dyn KvStore>,
    default_ttl: Duration,
}

impl IdempotencyGuard {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            default_ttl: DEFAULT_DEDUPE_TTL,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// True if an identical (type, hash) enqueue happened within the
    /// active window.
    pub async fn check(&self, job_type: JobType, hash: &str) -> anyhow::Result<bool> {
        self.kv.exists(&marker_key(job_type, hash)).await
    }

    /// Record the marker. Set only after the job row insert succeeds, so
    /// a failed insert leaves the caller free to retry immediately.
    pub async fn mark(
        &self,
        job_type: JobType,
        hash: &str,
        ttl: Option<Duration>,
    ) -> anyhow::Result<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.kv.set_nx(&marker_key(job_type, hash), ttl).await?;
        Ok(())
    }
}
