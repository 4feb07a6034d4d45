use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::jobs::model::{Job, JobStatus, NewJob};
use crate::jobs::store::JobStore;
use crate::workflow::JobType;

/// Raw row shape; `job_type`/`status` come back as TEXT and are parsed
/// into their enums on the way out.
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    job_type: String,
    step: String,
    status: String,
    payload_json: Value,
    result_json: Value,
    attempts: i32,
    priority: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = anyhow::Error;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let job_type: JobType = row
            .job_type
            .parse()
            .map_err(|e: String| anyhow::anyhow!("corrupt jobs row {}: {e}", row.id))?;
        let status: JobStatus = row
            .status
            .parse()
            .map_err(|e: String| anyhow::anyhow!("corrupt jobs row {}: {e}", row.id))?;
        let result: Map<String, Value> = match row.result_json {
            Value::Object(map) => map,
            other => anyhow::bail!("corrupt jobs row {}: result_json is {other}", row.id),
        };

        Ok(Job {
            id: row.id,
            job_type,
            step: row.step,
            status,
            payload: row.payload_json,
            result,
            attempts: row.attempts,
            priority: row.priority,
            last_error: row.last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Per-status row counts, for ops tooling.
    pub async fn status_counts(&self) -> anyhow::Result<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM jobs GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, new: NewJob) -> anyhow::Result<Job> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs (job_type, step, status, payload_json, result_json, attempts, priority)
            VALUES ($1, $2, $3, $4, '{}'::jsonb, 0, $5)
            RETURNING *
            "#,
        )
        .bind(new.job_type.as_str())
        .bind(&new.step)
        .bind(JobStatus::Pending.as_str())
        .bind(&new.payload)
        .bind(new.priority)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Job::try_from).transpose()
    }

    async fn next_actionable(&self, exclude: &[Uuid]) -> anyhow::Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT *
            FROM jobs
            WHERE status IN ('pending', 'running')
              AND id <> ALL($1)
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(exclude)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Job::try_from).transpose()
    }

    async fn mark_running(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'running',
                updated_at = now()
            WHERE id = $1
              AND status <> 'running'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_step_success(
        &self,
        id: Uuid,
        step: &str,
        output: Value,
        advance_to: Option<&str>,
    ) -> anyhow::Result<()> {
        // Single round trip: merge the step output, clear the error, and
        // pick the terminal vs advance branch off the NULLness of $4.
        sqlx::query(
            r#"
            UPDATE jobs
            SET result_json = result_json || jsonb_build_object($2::text, $3::jsonb),
                last_error = NULL,
                status = CASE WHEN $4::text IS NULL THEN 'done' ELSE 'running' END,
                step = COALESCE($4::text, step),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(step)
        .bind(&output)
        .bind(advance_to)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_step_failure(
        &self,
        id: Uuid,
        error: &str,
        attempts: i32,
        status: JobStatus,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = $2,
                attempts = $3,
                last_error = $4,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(attempts)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
