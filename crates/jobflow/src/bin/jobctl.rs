use std::env;
use std::sync::Arc;

use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};

use jobflow::jobs::{
    boxed, BatchCoordinator, EnqueueOptions, IdempotencyGuard, JobLock, JobQueue, JobRunner,
    PgJobStore, RunnerConfig, StepRegistry, StepResult,
};
use jobflow::kv::PgKv;
use jobflow::workflow::{JobType, WorkflowRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "jobctl <command>\n\
             Commands:\n\
             - reset\n\
             - seed <n>\n\
             - enqueue <type> <payload-json>\n\
             - run <limit>\n\
             - show\n\
             \n\
             Uses DATABASE_URL or TEST_DATABASE_URL.\n"
        );
        std::process::exit(2);
    }

    let url = env::var("DATABASE_URL")
        .or_else(|_| env::var("TEST_DATABASE_URL"))
        .expect("DATABASE_URL or TEST_DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    match args[1].as_str() {
        "reset" => reset(&pool).await?,
        "seed" => {
            let n: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);
            seed(&pool, n).await?;
        }
        "enqueue" => {
            let ty = args.get(2).expect("usage: jobctl enqueue <type> <payload-json>");
            let raw = args.get(3).expect("usage: jobctl enqueue <type> <payload-json>");
            enqueue(&pool, ty, raw).await?;
        }
        "run" => {
            let limit: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);
            run_batch(&pool, limit).await?;
        }
        "show" => show(&pool).await?,
        other => {
            eprintln!("Unknown command: {other}");
            std::process::exit(2);
        }
    }

    Ok(())
}

async fn reset(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query("TRUNCATE TABLE kv_markers, jobs")
        .execute(pool)
        .await?;
    println!("reset OK");
    Ok(())
}

async fn seed(pool: &PgPool, n: usize) -> anyhow::Result<()> {
    let queue = build_queue(pool);
    for i in 0..n {
        let job = queue
            .enqueue(
                JobType::ImageGen,
                json!({"postId": format!("seed-{i}")}),
                EnqueueOptions::default(),
            )
            .await?;
        println!("+ enqueued {} id={}", job.job_type, job.id);
    }
    Ok(())
}

async fn enqueue(pool: &PgPool, ty: &str, raw: &str) -> anyhow::Result<()> {
    let job_type: JobType = ty
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let payload: Value = serde_json::from_str(raw)?;

    let queue = build_queue(pool);
    match queue
        .enqueue(job_type, payload, EnqueueOptions::default())
        .await
    {
        Ok(job) => println!("enqueued {} id={} step={}", job.job_type, job.id, job.step),
        Err(e) => {
            eprintln!("rejected [{}]: {e}", e.code());
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn run_batch(pool: &PgPool, limit: usize) -> anyhow::Result<()> {
    let store = Arc::new(PgJobStore::new(pool.clone()));
    let kv: Arc<PgKv> = Arc::new(PgKv::new(pool.clone()));
    let registry = Arc::new(WorkflowRegistry::standard());

    // Echo handlers for every registered step, so a batch can be driven
    // end to end from the CLI without the worker's real handlers.
    let mut steps = StepRegistry::new();
    for ty in JobType::ALL {
        if let Some(names) = registry.steps_for(ty) {
            for name in names {
                let step_name = *name;
                steps.register(ty, step_name, move |_job| {
                    boxed(async move { StepResult::ok(json!({ "echo": step_name })) })
                });
            }
        }
    }

    let runner = JobRunner::new(
        store,
        JobLock::new(kv),
        Arc::new(steps),
        registry,
        RunnerConfig::default(),
    );
    let summary = BatchCoordinator::new(runner).process_batch(limit).await;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn show(pool: &PgPool) -> anyhow::Result<()> {
    let store = PgJobStore::new(pool.clone());
    for (status, count) in store.status_counts().await? {
        println!("{status}: {count}");
    }

    let markers: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM kv_markers WHERE expires_at > now()")
            .fetch_one(pool)
            .await?;
    println!("live markers: {markers}");
    Ok(())
}

fn build_queue(pool: &PgPool) -> JobQueue {
    let store = Arc::new(PgJobStore::new(pool.clone()));
    let kv: Arc<PgKv> = Arc::new(PgKv::new(pool.clone()));
    JobQueue::new(
        store,
        IdempotencyGuard::new(kv),
        Arc::new(WorkflowRegistry::standard()),
    )
}
