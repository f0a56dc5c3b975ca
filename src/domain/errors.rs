//! Domain errors for the drover orchestration engine.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur while driving a goal fleet.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Executor failed: {0}")]
    ExecutorFailed(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Policy drift on resumed session {session}: {field} was {persisted}, caller requested {requested}")]
    PolicyDrift {
        session: Uuid,
        field: String,
        persisted: String,
        requested: String,
    },

    #[error("Unsupported document schema version {found} (expected <= {supported})")]
    UnsupportedSchemaVersion { found: u32, supported: u32 },

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::StoreError(err.to_string())
    }
}
