use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::jobs::model::Job;
use crate::workflow::JobType;

pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

type StepFn = dyn for<'a> Fn(&'a Job) -> BoxFuture<'a, StepResult> + Send + Sync;

/// Outcome of one step execution.
///
/// Handlers are pure-ish functions of the job: they read the payload and
/// the accumulated result map and report back here. They never write job
/// state; only the runner does.
#[derive(Debug, Clone)]
pub enum StepResult {
    Success {
        data: Value,
        /// Explicit short-circuit: jump to this step instead of the
        /// registry's next entry. Must name a step in the type's list.
        next_step: Option<String>,
    },
    Failure {
        error: String,
    },
}

impl StepResult {
    pub fn ok(data: Value) -> Self {
        StepResult::Success {
            data,
            next_step: None,
        }
    }

    pub fn ok_with_next(data: Value, next_step: impl Into<String>) -> Self {
        StepResult::Success {
            data,
            next_step: Some(next_step.into()),
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        StepResult::Failure {
            error: error.into(),
        }
    }
}

/// Adapter for async closures; mirrors the registration call sites.
pub fn boxed<'a, T>(fut: impl std::future::Future<Output = T> + Send + 'a) -> BoxFuture<'a, T> {
    Box::pin(fut)
}

/// Step handler lookup keyed by (job type, step name).
///
/// Populated once at process start by whichever module owns the business
/// logic; the engine only requires the `(job) -> StepResult` contract.
#[derive(Clone, Default)]
pub struct StepRegistry {
    handlers: HashMap<(JobType, String), Arc<StepFn>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, job_type: JobType, step: &str, handler: F)
    where
        F: for<'a> Fn(&'a Job) -> BoxFuture<'a, StepResult> + Send + Sync + 'static,
    {
        self.handlers
            .insert((job_type, step.to_string()), Arc::new(handler));
    }

    pub fn is_registered(&self, job_type: JobType, step: &str) -> bool {
        self.handlers.contains_key(&(job_type, step.to_string()))
    }

    /// Run the handler for the job's current step. An unregistered
    /// (type, step) pair is a failure result, not a panic, so the
    /// runner's uniform failure path applies.
    pub async fn dispatch(&self, job: &Job) -> StepResult {
        match self.handlers.get(&(job.job_type, job.step.clone())) {
            Some(handler) => handler(job).await,
            None => StepResult::fail(format!(
                "no handler registered for {}/{}",
                job.job_type, job.step
            )),
        }
    }
}
