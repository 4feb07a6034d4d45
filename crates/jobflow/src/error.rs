use thiserror::Error;

/// Rejections surfaced synchronously to enqueue callers.
///
/// All three variants are caller errors: nothing was inserted and no
/// idempotency marker was set when one of these comes back.
#[derive(Debug, Error)]
pub enum EnqueueError {
    #[error("unknown job type: {0}")]
    UnknownJobType(String),

    #[error("invalid payload for {job_type}: {detail}")]
    InvalidPayload { job_type: String, detail: String },

    #[error("duplicate job: identical {job_type} payload enqueued within the deduplication window")]
    DuplicateJob { job_type: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl EnqueueError {
    /// Stable machine-readable code, for callers that log or map rejections.
    pub fn code(&self) -> &'static str {
        match self {
            EnqueueError::UnknownJobType(_) => "UNKNOWN_JOB_TYPE",
            EnqueueError::InvalidPayload { .. } => "INVALID_PAYLOAD",
            EnqueueError::DuplicateJob { .. } => "DUPLICATE_JOB",
            EnqueueError::Store(_) => "STORE_ERROR",
        }
    }
}
