use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use jobflow::jobs::{
    boxed, BatchCoordinator, IdempotencyGuard, JobLock, JobQueue, JobRunner, MemoryJobStore,
    RunnerConfig, StepRegistry, StepResult,
};
use jobflow::kv::MemoryKv;
use jobflow::workflow::{JobType, WorkflowRegistry};

/// Fully in-memory engine: real registry, queue, lock, and runner wiring,
/// with stores that need no external services.
#[allow(dead_code)]
pub struct Harness {
    pub store: Arc<MemoryJobStore>,
    pub kv: Arc<MemoryKv>,
    pub registry: Arc<WorkflowRegistry>,
    pub queue: JobQueue,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_registry(WorkflowRegistry::standard())
    }

    pub fn with_registry(registry: WorkflowRegistry) -> Self {
        let store = Arc::new(MemoryJobStore::new());
        let kv = Arc::new(MemoryKv::new());
        let registry = Arc::new(registry);
        let queue = JobQueue::new(
            store.clone(),
            IdempotencyGuard::new(kv.clone()),
            registry.clone(),
        );
        Self {
            store,
            kv,
            registry,
            queue,
        }
    }

    #[allow(dead_code)]
    pub fn runner(&self, steps: StepRegistry, cfg: RunnerConfig) -> JobRunner {
        JobRunner::new(
            self.store.clone(),
            JobLock::new(self.kv.clone()),
            Arc::new(steps),
            self.registry.clone(),
            cfg,
        )
    }

    #[allow(dead_code)]
    pub fn coordinator(&self, steps: StepRegistry, cfg: RunnerConfig) -> BatchCoordinator {
        BatchCoordinator::new(self.runner(steps, cfg))
    }
}

/// A handler for every registered step that trivially succeeds, tagging
/// its output with the step name.
#[allow(dead_code)]
pub fn echo_steps(registry: &WorkflowRegistry) -> StepRegistry {
    let mut steps = StepRegistry::new();
    for ty in JobType::ALL {
        if let Some(names) = registry.steps_for(ty) {
            for name in names {
                let step_name = *name;
                steps.register(ty, step_name, move |_job| {
                    boxed(async move { StepResult::ok(json!({ "ran": step_name })) })
                });
            }
        }
    }
    steps
}

/// A handler for every registered step that always fails.
#[allow(dead_code)]
pub fn failing_steps(registry: &WorkflowRegistry) -> StepRegistry {
    let mut steps = StepRegistry::new();
    for ty in JobType::ALL {
        if let Some(names) = registry.steps_for(ty) {
            for name in names {
                let step_name = *name;
                steps.register(ty, step_name, move |_job| {
                    boxed(async move { StepResult::fail(format!("{step_name} exploded")) })
                });
            }
        }
    }
    steps
}

/// Echo handlers that also sleep, to widen the lock-contention window.
#[allow(dead_code)]
pub fn slow_steps(registry: &WorkflowRegistry, delay: Duration) -> StepRegistry {
    let mut steps = StepRegistry::new();
    for ty in JobType::ALL {
        if let Some(names) = registry.steps_for(ty) {
            for name in names {
                let step_name = *name;
                steps.register(ty, step_name, move |_job| {
                    boxed(async move {
                        tokio::time::sleep(delay).await;
                        StepResult::ok(json!({ "ran": step_name }))
                    })
                });
            }
        }
    }
    steps
}
