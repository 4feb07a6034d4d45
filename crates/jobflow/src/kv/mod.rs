use std::time::Duration;

use async_trait::async_trait;

pub mod memory;
pub mod pg;

pub use memory::MemoryKv;
pub use pg::PgKv;

/// TTL-capable key-value marker store.
///
/// Backs both the idempotency guard and the per-job distributed lock.
/// Markers are presence sentinels: the key existing (and not yet expired)
/// is the whole signal. This store is never a source of truth about jobs;
/// the jobs table is.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Atomically set `key` if it is absent (or expired). Returns true if
    /// this call created the marker, false if a live marker was already
    /// present.
    async fn set_nx(&self, key: &str, ttl: Duration) -> anyhow::Result<bool>;

    /// True if a live (unexpired) marker exists for `key`.
    async fn exists(&self, key: &str) -> anyhow::Result<bool>;

    /// Remove the marker. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}
