//! Domain error model.
//!
//! Every failure carries a stable machine-readable `code`, a human-readable
//! `message` and an optional structured `details` map. Codes are the contract
//! an API layer maps to transport-level statuses; they never change once
//! published.

use serde_json::{Value, json};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business/domain failures (construction
/// invariants, illegal transitions, policy vetoes). Infrastructure concerns
/// belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// A construction or rehydration invariant failed (`invalid_id`,
    /// `invalid_state`, `invalid_version`, `missing_<field>`,
    /// `inconsistent_timestamps`, `invalid_actor_id`, `invalid_verdict_state`).
    #[error("{code}: {message}")]
    Validation {
        code: String,
        message: String,
        details: Option<Value>,
    },

    /// A command that requires the ACTIVE state was attempted elsewhere.
    #[error("enrollment_not_active: {message}")]
    NotActive {
        message: String,
        details: Option<Value>,
    },

    /// Conclusion vetoed by an externally computed policy verdict.
    #[error("conclusion_not_allowed: {message}")]
    ConclusionNotAllowed {
        message: String,
        details: Option<Value>,
    },

    /// A mandatory justification was missing or blank.
    #[error("{code}: {message}")]
    JustificationRequired {
        code: &'static str,
        message: String,
        details: Option<Value>,
    },

    /// Illegal state-machine edge (`invalid_state_transition`) or event
    /// construction misuse (`invalid_event_state`).
    #[error("{code}: {message}")]
    InvalidTransition {
        code: &'static str,
        message: String,
        details: Option<Value>,
    },

    /// Optimistic concurrency conflict (stale version at save time).
    #[error("version_conflict: {message}")]
    Conflict {
        message: String,
        details: Option<Value>,
    },
}

impl DomainError {
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self::Validation {
            code: code.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn not_active(message: impl Into<String>, details: Value) -> Self {
        Self::NotActive {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn conclusion_not_allowed(message: impl Into<String>, details: Value) -> Self {
        Self::ConclusionNotAllowed {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn justification_required(
        code: &'static str,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self::JustificationRequired {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn invalid_transition(
        code: &'static str,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self::InvalidTransition {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &str {
        match self {
            Self::Validation { code, .. } => code,
            Self::NotActive { .. } => "enrollment_not_active",
            Self::ConclusionNotAllowed { .. } => "conclusion_not_allowed",
            Self::JustificationRequired { code, .. } => code,
            Self::InvalidTransition { code, .. } => code,
            Self::Conflict { .. } => "version_conflict",
        }
    }

    /// Human-readable message (operator-safe, no internals).
    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. }
            | Self::NotActive { message, .. }
            | Self::ConclusionNotAllowed { message, .. }
            | Self::JustificationRequired { message, .. }
            | Self::InvalidTransition { message, .. }
            | Self::Conflict { message, .. } => message,
        }
    }

    /// Structured context for clients and monitoring.
    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Validation { details, .. }
            | Self::NotActive { details, .. }
            | Self::ConclusionNotAllowed { details, .. }
            | Self::JustificationRequired { details, .. }
            | Self::InvalidTransition { details, .. }
            | Self::Conflict { details, .. } => details.as_ref(),
        }
    }

    /// Serializable `{code, message, details}` payload for outward mapping.
    pub fn to_payload(&self) -> Value {
        json!({
            "code": self.code(),
            "message": self.message(),
            "details": self.details().cloned().unwrap_or(Value::Null),
        })
    }
}
