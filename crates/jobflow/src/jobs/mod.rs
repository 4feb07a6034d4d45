pub mod batch;
pub mod dispatch;
pub mod idempotency;
pub mod lock;
pub mod memory;
pub mod model;
pub mod pg;
pub mod queue;
pub mod runner;
pub mod store;

pub use batch::{BatchCoordinator, BatchSummary};
pub use dispatch::{boxed, StepRegistry, StepResult};
pub use idempotency::{payload_hash, IdempotencyGuard, DEFAULT_DEDUPE_TTL};
pub use lock::{JobLock, DEFAULT_LOCK_TTL};
pub use memory::MemoryJobStore;
pub use model::{EnqueueOptions, Job, JobStatus, NewJob};
pub use pg::PgJobStore;
pub use queue::JobQueue;
pub use runner::{CycleOutcome, CycleStatus, JobRunner, RunnerConfig};
pub use store::JobStore;
