mod common;

use std::time::Duration;

use common::{echo_steps, failing_steps, slow_steps, Harness};
use serde_json::json;

use jobflow::jobs::{CycleStatus, EnqueueOptions, JobLock, JobStore, RunnerConfig};
use jobflow::workflow::JobType;

#[tokio::test]
async fn concurrent_runners_advance_a_job_exactly_once() {
    let h = Harness::new();
    // The slow handler holds the lock long enough that the second
    // runner's acquire lands inside the first one's cycle.
    let runner_a = h.runner(
        slow_steps(&h.registry, Duration::from_millis(150)),
        RunnerConfig::default(),
    );
    let runner_b = runner_a.clone();

    let job = h
        .queue
        .enqueue(
            JobType::ImageGen,
            json!({"postId": "p1"}),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        runner_a.process_next_job(&[]),
        runner_b.process_next_job(&[])
    );
    let mut statuses = [a.unwrap().status, b.unwrap().status];
    statuses.sort_by_key(|s| *s != CycleStatus::Ok);
    assert_eq!(statuses, [CycleStatus::Ok, CycleStatus::Skipped]);

    // Exactly one state transition happened.
    let row = h.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(row.step, "prompt");
    assert_eq!(row.result.len(), 1);
    assert_eq!(row.attempts, 0);
}

#[tokio::test]
async fn held_lock_yields_a_skip_and_batch_moves_on() {
    let h = Harness::new();
    let coordinator = h.coordinator(echo_steps(&h.registry), RunnerConfig::default());

    let blocked = h
        .queue
        .enqueue(
            JobType::ImageGen,
            json!({"postId": "p1"}),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();
    let free = h
        .queue
        .enqueue(
            JobType::BlogAutopublish,
            json!({"postId": "p2"}),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();

    // Simulate another runner holding the older job's lock.
    let foreign_lock = JobLock::new(h.kv.clone());
    assert!(foreign_lock.acquire(blocked.id).await.unwrap());

    let summary = coordinator.process_batch(10).await;

    // The blocked job is skipped once and not re-polled within the
    // batch; the younger job still drains completely.
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(
        summary
            .details
            .iter()
            .filter(|d| d.job_id == blocked.id)
            .count(),
        1
    );

    let row = h.store.get(blocked.id).await.unwrap().unwrap();
    assert_eq!(row.step, "extract");
    assert!(row.result.is_empty());
    let row = h.store.get(free.id).await.unwrap().unwrap();
    assert_eq!(row.status, jobflow::JobStatus::Done);

    // Once the foreign lock is gone the job processes normally.
    foreign_lock.release(blocked.id).await.unwrap();
    let summary = coordinator.process_batch(10).await;
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.skipped, 0);
}

#[tokio::test]
async fn lock_is_released_after_success_and_failure() {
    let h = Harness::new();
    let probe = JobLock::new(h.kv.clone());

    let ok_runner = h.runner(echo_steps(&h.registry), RunnerConfig::default());
    let job = h
        .queue
        .enqueue(
            JobType::ImageGen,
            json!({"postId": "p1"}),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(
        ok_runner.process_next_job(&[]).await.unwrap().status,
        CycleStatus::Ok
    );
    assert!(probe.acquire(job.id).await.unwrap(), "lock leaked after success");
    probe.release(job.id).await.unwrap();

    let fail_runner = h.runner(failing_steps(&h.registry), RunnerConfig::default());
    assert_eq!(
        fail_runner.process_next_job(&[]).await.unwrap().status,
        CycleStatus::Failed
    );
    assert!(probe.acquire(job.id).await.unwrap(), "lock leaked after failure");
    probe.release(job.id).await.unwrap();
}

#[tokio::test]
async fn expired_lock_self_heals() {
    let h = Harness::new();
    let runner_steps = echo_steps(&h.registry);

    let job = h
        .queue
        .enqueue(
            JobType::BlogAutopublish,
            json!({"postId": "p1"}),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();

    // A crashed runner left a short-TTL lock behind.
    let abandoned = JobLock::new(h.kv.clone()).with_ttl(Duration::from_millis(30));
    assert!(abandoned.acquire(job.id).await.unwrap());

    let runner = h.runner(runner_steps, RunnerConfig::default());
    assert_eq!(
        runner.process_next_job(&[]).await.unwrap().status,
        CycleStatus::Skipped
    );

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(
        runner.process_next_job(&[]).await.unwrap().status,
        CycleStatus::Ok
    );

    let row = h.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(row.step, "publish");
}

#[tokio::test]
async fn lock_contention_is_reported_not_raised() {
    let h = Harness::new();
    let runner_a = h.runner(
        slow_steps(&h.registry, Duration::from_millis(50)),
        RunnerConfig::default(),
    );
    let runner_b = runner_a.clone();

    let older = h
        .queue
        .enqueue(
            JobType::ImageGen,
            json!({"postId": "p1"}),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();

    // Both runners contend on the single oldest job; the loser reports
    // skipped rather than erroring or double-running it.
    let (a, b) = tokio::join!(
        runner_a.process_next_job(&[]),
        runner_b.process_next_job(&[])
    );
    let outcomes = [a.unwrap(), b.unwrap()];
    assert!(outcomes.iter().all(|o| o.job_id == older.id));
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| o.status == CycleStatus::Skipped)
            .count(),
        1
    );
}
