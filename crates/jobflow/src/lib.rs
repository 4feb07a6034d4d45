//! jobflow — background job execution engine for the CMS.
//!
//! A durable, multi-step workflow runner: each job is one persisted row
//! that advances through its type's ordered step list under a per-job
//! distributed lock, with idempotent enqueueing, bounded retries, and
//! per-step timeouts. HTTP delivery and the business logic inside step
//! handlers live elsewhere; collaborators only enqueue jobs and trigger
//! batch processing on a schedule.

pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod kv;
pub mod workflow;

pub use config::Config;
pub use error::EnqueueError;
pub use jobs::batch::{BatchCoordinator, BatchSummary};
pub use jobs::dispatch::{StepRegistry, StepResult};
pub use jobs::model::{EnqueueOptions, Job, JobStatus};
pub use jobs::queue::JobQueue;
pub use jobs::runner::{CycleOutcome, CycleStatus, JobRunner, RunnerConfig};
pub use jobs::store::JobStore;
pub use kv::KvStore;
pub use workflow::{JobType, WorkflowRegistry};
