use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use jobflow::jobs::{BatchCoordinator, JobLock, JobRunner, PgJobStore, RunnerConfig};
use jobflow::kv::PgKv;
use jobflow::workflow::WorkflowRegistry;
use jobflow::Config;

mod handlers;
use handlers::build_step_registry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = Config::from_env()?;
    info!(
        max_attempts = cfg.max_attempts,
        step_timeout_ms = cfg.step_timeout.as_millis() as u64,
        lock_ttl_secs = cfg.lock_ttl.as_secs(),
        batch_limit = cfg.batch_limit,
        poll_interval_ms = cfg.poll_interval.as_millis() as u64,
        "jobflow worker starting"
    );

    let pool = jobflow::db::make_pool(&cfg.database_url).await?;
    if cfg.migrate_on_startup {
        jobflow::db::run_migrations(&pool).await?;
    }

    let store = Arc::new(PgJobStore::new(pool.clone()));
    let kv = Arc::new(PgKv::new(pool.clone()));
    let registry = Arc::new(WorkflowRegistry::standard());

    let runner = JobRunner::new(
        store,
        JobLock::new(kv.clone()).with_ttl(cfg.lock_ttl),
        Arc::new(build_step_registry()),
        registry,
        RunnerConfig {
            max_attempts: cfg.max_attempts,
            step_timeout: cfg.step_timeout,
        },
    );
    let coordinator = BatchCoordinator::new(runner);

    // ---- Marker purge task ----
    let purge_kv = kv.clone();
    tokio::spawn(async move {
        loop {
            match purge_kv.purge_expired().await {
                Ok(n) if n > 0 => info!(purged = n, "purged expired markers"),
                Ok(_) => {}
                Err(e) => error!(error = %e, "marker purge failed"),
            }
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
    });

    // ---- Batch loop ----
    // Stand-in for the external scheduler: one bounded batch per tick.
    let mut tick = tokio::time::interval(cfg.poll_interval);
    loop {
        tick.tick().await;
        let summary = coordinator.process_batch(cfg.batch_limit).await;
        if summary.failed > 0 {
            error!(
                failed = summary.failed,
                details = %serde_json::to_string(&summary.details).unwrap_or_default(),
                "batch had failures"
            );
        }
    }
}
