use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::KvStore;

/// In-process marker store. Suitable for single-node deployments and the
/// test harness; multi-runner deployments want [`super::PgKv`] so locks
/// are visible across processes.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Instant>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn set_nx(&self, key: &str, ttl: Duration) -> anyhow::Result<bool> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get(key) {
            Some(expires_at) if *expires_at > now => Ok(false),
            _ => {
                entries.insert(key.to_string(), now + ttl);
                Ok(true)
            }
        }
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let entries = self.entries.lock().await;
        Ok(entries
            .get(key)
            .map(|expires_at| *expires_at > Instant::now())
            .unwrap_or(false))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
