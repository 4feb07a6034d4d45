use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::kv::KvStore;

pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(30);

fn lock_key(job_id: Uuid) -> String {
    format!("jobflow:lock:{job_id}")
}

/// TTL-based mutual exclusion per job id.
///
/// Acquired by the runner immediately before executing a step and
/// released after the cycle finishes. A runner that crashes mid-step
/// abandons the marker; expiry makes the job runnable again, which is the
/// whole crash-recovery story. The lock is not linearizable under clock
/// skew or store failover; lock contention is a normal skipped outcome,
/// not a fault.
#[derive(Clone)]
pub struct JobLock {
    kv: Arc<dyn KvStore>,
    ttl: Duration,
}

impl JobLock {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            ttl: DEFAULT_LOCK_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Try to take the lock. False means another runner holds it.
    pub async fn acquire(&self, job_id: Uuid) -> anyhow::Result<bool> {
        self.kv.set_nx(&lock_key(job_id), self.ttl).await
    }

    pub async fn release(&self, job_id: Uuid) -> anyhow::Result<()> {
        self.kv.delete(&lock_key(job_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;

    #[tokio::test]
    async fn second_acquire_fails_until_release() {
        let lock = JobLock::new(Arc::new(MemoryKv::new()));
        let id = Uuid::new_v4();

        assert!(lock.acquire(id).await.unwrap());
        assert!(!lock.acquire(id).await.unwrap());

        lock.release(id).await.unwrap();
        assert!(lock.acquire(id).await.unwrap());
    }

    #[tokio::test]
    async fn locks_are_per_job() {
        let lock = JobLock::new(Arc::new(MemoryKv::new()));
        assert!(lock.acquire(Uuid::new_v4()).await.unwrap());
        assert!(lock.acquire(Uuid::new_v4()).await.unwrap());
    }
}
