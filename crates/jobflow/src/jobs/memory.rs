use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::jobs::model::{Job, JobStatus, NewJob};
use crate::jobs::store::JobStore;

/// In-process job store. Rows live in insertion order, which doubles as
/// the FIFO tiebreak when `created_at` values collide within one tick.
#[derive(Default)]
pub struct MemoryJobStore {
    rows: RwLock<Vec<Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, new: NewJob) -> anyhow::Result<Job> {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            job_type: new.job_type,
            step: new.step,
            status: JobStatus::Pending,
            payload: new.payload,
            result: Map::new(),
            attempts: 0,
            priority: new.priority,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        self.rows.write().await.push(job.clone());
        Ok(job)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Job>> {
        Ok(self.rows.read().await.iter().find(|j| j.id == id).cloned())
    }

    async fn next_actionable(&self, exclude: &[Uuid]) -> anyhow::Result<Option<Job>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|j| !j.status.is_terminal() && !exclude.contains(&j.id))
            .min_by_key(|j| j.created_at)
            .cloned())
    }

    async fn mark_running(&self, id: Uuid) -> anyhow::Result<()> {
        let mut rows = self.rows.write().await;
        if let Some(job) = rows.iter_mut().find(|j| j.id == id) {
            job.status = JobStatus::Running;
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn record_step_success(
        &self,
        id: Uuid,
        step: &str,
        output: Value,
        advance_to: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut rows = self.rows.write().await;
        let Some(job) = rows.iter_mut().find(|j| j.id == id) else {
            anyhow::bail!("no such job: {id}");
        };
        job.result.insert(step.to_string(), output);
        job.last_error = None;
        match advance_to {
            Some(next) => {
                job.status = JobStatus::Running;
                job.step = next.to_string();
            }
            None => job.status = JobStatus::Done,
        }
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn record_step_failure(
        &self,
        id: Uuid,
        error: &str,
        attempts: i32,
        status: JobStatus,
    ) -> anyhow::Result<()> {
        let mut rows = self.rows.write().await;
        let Some(job) = rows.iter_mut().find(|j| j.id == id) else {
            anyhow::bail!("no such job: {id}");
        };
        job.status = status;
        job.attempts = attempts;
        job.last_error = Some(error.to_string());
        job.updated_at = Utc::now();
        Ok(())
    }
}
