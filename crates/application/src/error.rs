//! Application-layer error payloads.

use serde_json::{Value, json};
use thiserror::Error;

use matricula_core::DomainError;

use crate::ports::RepositoryError;

/// Expected failures of a use case, each with a stable machine-readable code
/// for transport-level mapping (HTTP status, client handling, monitoring).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApplicationError {
    /// The identified aggregate does not exist.
    #[error("enrollment not found: {enrollment_id}")]
    EnrollmentNotFound { enrollment_id: String },

    /// A domain guard or invariant rejected the command.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The persistence adapter failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ApplicationError {
    pub fn enrollment_not_found(enrollment_id: impl Into<String>) -> Self {
        Self::EnrollmentNotFound {
            enrollment_id: enrollment_id.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &str {
        match self {
            Self::EnrollmentNotFound { .. } => "enrollment_not_found",
            Self::Domain(err) => err.code(),
            Self::Repository(RepositoryError::VersionConflict { .. }) => "version_conflict",
            Self::Repository(RepositoryError::Storage(_)) => "storage_failure",
        }
    }

    /// Serializable `{code, message, details}` payload.
    pub fn to_payload(&self) -> Value {
        match self {
            Self::Domain(err) => err.to_payload(),
            Self::EnrollmentNotFound { enrollment_id } => json!({
                "code": self.code(),
                "message": self.to_string(),
                "details": {"enrollment_id": enrollment_id},
            }),
            Self::Repository(_) => json!({
                "code": self.code(),
                "message": self.to_string(),
                "details": Value::Null,
            }),
        }
    }
}
