mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::{echo_steps, Harness};
use serde_json::json;

use jobflow::jobs::{
    boxed, CycleStatus, EnqueueOptions, JobStatus, JobStore, RunnerConfig, StepRegistry,
    StepResult,
};
use jobflow::workflow::JobType;

#[tokio::test]
async fn job_advances_through_every_step_in_order() {
    let h = Harness::new();
    let runner = h.runner(echo_steps(&h.registry), RunnerConfig::default());

    let job = h
        .queue
        .enqueue(
            JobType::ImageGen,
            json!({"postId": "p1"}),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();

    let expected = ["extract", "prompt", "generate", "store"];
    for (i, step) in expected.iter().enumerate() {
        let outcome = runner.process_next_job(&[]).await.unwrap();
        assert_eq!(outcome.status, CycleStatus::Ok);
        assert_eq!(outcome.step, *step);

        let row = h.store.get(job.id).await.unwrap().unwrap();
        if i + 1 < expected.len() {
            assert_eq!(row.status, JobStatus::Running);
            assert_eq!(row.step, expected[i + 1]);
        } else {
            assert_eq!(row.status, JobStatus::Done);
        }
    }

    let row = h.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(row.attempts, 0);
    assert!(row.last_error.is_none());
    let mut keys: Vec<&str> = row.result.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["extract", "generate", "prompt", "store"]);
    for step in expected {
        assert_eq!(row.result[step], json!({"ran": step}));
    }
}

#[tokio::test]
async fn one_batch_drains_a_multi_step_job() {
    let h = Harness::new();
    let coordinator = h.coordinator(echo_steps(&h.registry), RunnerConfig::default());

    h.queue
        .enqueue(
            JobType::ImageGen,
            json!({"postId": "p1"}),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();

    let summary = coordinator.process_batch(10).await;
    assert_eq!(summary.processed, 4);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 0);

    // Terminal jobs are never reselected.
    let again = coordinator.process_batch(10).await;
    assert_eq!(again.processed, 0);
}

#[tokio::test]
async fn batch_respects_the_limit() {
    let h = Harness::new();
    let coordinator = h.coordinator(echo_steps(&h.registry), RunnerConfig::default());

    h.queue
        .enqueue(
            JobType::ImageGen,
            json!({"postId": "p1"}),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();

    let summary = coordinator.process_batch(2).await;
    assert_eq!(summary.processed, 2);
}

#[tokio::test]
async fn oldest_job_runs_first() {
    let h = Harness::new();
    let runner = h.runner(echo_steps(&h.registry), RunnerConfig::default());

    let first = h
        .queue
        .enqueue(
            JobType::ImageGen,
            json!({"postId": "p1"}),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();
    h.queue
        .enqueue(
            JobType::ImageGen,
            json!({"postId": "p2"}),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();

    let outcome = runner.process_next_job(&[]).await.unwrap();
    assert_eq!(outcome.job_id, first.id);

    // Mid-workflow jobs compete on equal FIFO footing, so the older job
    // keeps winning until it completes.
    let outcome = runner.process_next_job(&[]).await.unwrap();
    assert_eq!(outcome.job_id, first.id);
}

#[tokio::test]
async fn next_step_override_skips_remaining_steps() {
    let h = Harness::new();

    let mut steps = StepRegistry::new();
    steps.register(JobType::Distribution, "prepare", |_job| {
        boxed(async move { StepResult::ok_with_next(json!({"channels": []}), "confirm") })
    });
    steps.register(JobType::Distribution, "confirm", |_job| {
        boxed(async move { StepResult::ok(json!({"confirmed": true})) })
    });
    let runner = h.runner(steps, RunnerConfig::default());

    let job = h
        .queue
        .enqueue(
            JobType::Distribution,
            json!({"postId": "p1", "channels": []}),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(
        runner.process_next_job(&[]).await.unwrap().status,
        CycleStatus::Ok
    );
    let row = h.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(row.step, "confirm");

    assert_eq!(
        runner.process_next_job(&[]).await.unwrap().status,
        CycleStatus::Ok
    );
    let row = h.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(row.status, JobStatus::Done);
    assert!(row.result.contains_key("prepare"));
    assert!(row.result.contains_key("confirm"));
    assert!(!row.result.contains_key("publish"));
}

#[tokio::test]
async fn next_step_override_outside_workflow_is_a_failure() {
    let h = Harness::new();

    let mut steps = StepRegistry::new();
    steps.register(JobType::ImageGen, "extract", |_job| {
        boxed(async move { StepResult::ok_with_next(json!({}), "teleport") })
    });
    let runner = h.runner(steps, RunnerConfig::default());

    let job = h
        .queue
        .enqueue(
            JobType::ImageGen,
            json!({"postId": "p1"}),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();

    let outcome = runner.process_next_job(&[]).await.unwrap();
    assert_eq!(outcome.status, CycleStatus::Failed);
    assert!(outcome.error.unwrap().contains("teleport"));

    let row = h.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(row.step, "extract");
    assert_eq!(row.attempts, 1);
    assert_eq!(row.status, JobStatus::Pending);
}

#[tokio::test]
async fn success_clears_error_but_not_attempts() {
    let h = Harness::new();

    let failed_once = Arc::new(AtomicBool::new(false));
    let flag = failed_once.clone();
    let mut steps = StepRegistry::new();
    steps.register(JobType::BlogAutopublish, "validate", move |_job| {
        let flag = flag.clone();
        boxed(async move {
            if !flag.swap(true, Ordering::SeqCst) {
                StepResult::fail("transient store hiccup")
            } else {
                StepResult::ok(json!({"checked": true}))
            }
        })
    });
    steps.register(JobType::BlogAutopublish, "publish", |_job| {
        boxed(async move { StepResult::ok(json!({"published": true})) })
    });
    let runner = h.runner(steps, RunnerConfig::default());

    let job = h
        .queue
        .enqueue(
            JobType::BlogAutopublish,
            json!({"postId": "p1"}),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(
        runner.process_next_job(&[]).await.unwrap().status,
        CycleStatus::Failed
    );
    let row = h.store.get(job.id).await.unwrap().unwrap();
    assert_eq!(row.attempts, 1);
    assert!(row.last_error.is_some());
    assert_eq!(row.step, "validate");

    assert_eq!(
        runner.process_next_job(&[]).await.unwrap().status,
        CycleStatus::Ok
    );
    let row = h.store.get(job.id).await.unwrap().unwrap();
    assert!(row.last_error.is_none());
    assert_eq!(row.attempts, 1);
    assert_eq!(row.step, "publish");
}
