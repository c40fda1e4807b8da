use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::enums::visio_states::VisioState;

/// Failure taxonomy shared by the ledgers, the session state machine and the turn pipeline.
#[derive(Debug, Error)]
pub enum VisioError {
    /// Missing or invalid provider credentials. Fatal, never retried.
    #[error("provider configuration error: {0}")]
    Config(String),

    #[error("provider rejected the upload: {0}")]
    Upload(String),

    #[error("provider rejected the generation: {0}")]
    Generate(String),

    #[error("job {job_id} did not complete within {waited_ms} ms")]
    Timeout { job_id: String, waited_ms: u64 },

    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition { from: VisioState, to: VisioState },

    #[error("monthly visio quota exhausted ({remaining_seconds}s remaining)")]
    QuotaExceeded { remaining_seconds: i32 },

    #[error("insufficient credits: balance {balance}, required {required}")]
    InsufficientCredits { balance: i32, required: i32 },

    #[error("operation not supported: {0}")]
    NotSupported(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("session {0} has already ended")]
    SessionEnded(Uuid),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type VisioResult<T> = std::result::Result<T, VisioError>;
