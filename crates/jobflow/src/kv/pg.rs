use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use super::KvStore;

/// Marker store over the `kv_markers` table, shared by every runner
/// process pointed at the same database.
///
/// Atomicity comes from the upsert: the `DO UPDATE .. WHERE expired`
/// branch lets exactly one writer claim a dead key, so `set_nx` is a
/// single round trip with set-if-absent semantics.
#[derive(Clone)]
pub struct PgKv {
    pool: PgPool,
}

impl PgKv {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Drop expired markers. The engine never reads expired rows, so this
    /// is purely a size control, safe to run on any interval.
    pub async fn purge_expired(&self) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM kv_markers WHERE expires_at < now()")
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}

#[async_trait]
impl KvStore for PgKv {
    async fn set_nx(&self, key: &str, ttl: Duration) -> anyhow::Result<bool> {
        let claimed: Option<String> = sqlx::query_scalar(
            r#"
            INSERT INTO kv_markers (key, expires_at)
            VALUES ($1, now() + ($2::bigint * interval '1 millisecond'))
            ON CONFLICT (key) DO UPDATE
                SET expires_at = EXCLUDED.expires_at
                WHERE kv_markers.expires_at < now()
            RETURNING key
            "#,
        )
        .bind(key)
        .bind(ttl.as_millis() as i64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(claimed.is_some())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let hit: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM kv_markers WHERE key = $1 AND expires_at > now()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(hit.is_some())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM kv_markers WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
