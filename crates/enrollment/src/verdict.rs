use serde::Serialize;
use serde_json::json;

use matricula_core::{DomainError, DomainResult, ValueObject};

/// Value object: policy decision gating conclusion.
///
/// Computed outside the aggregate (attendance, grades, period closure, etc.)
/// and consumed by `Enrollment::conclude`.
///
/// Invariants:
/// - allowed  => `reasons` is empty
/// - denied   => `requires_justification` is false and `reasons` is non-empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConclusionVerdict {
    is_allowed: bool,
    reasons: Vec<String>,
    requires_justification: bool,
}

impl ConclusionVerdict {
    /// Checked constructor for rehydration/deserialization paths.
    pub fn new(
        is_allowed: bool,
        reasons: Vec<String>,
        requires_justification: bool,
    ) -> DomainResult<Self> {
        if is_allowed {
            if !reasons.is_empty() {
                return Err(DomainError::validation_with(
                    "invalid_verdict_state",
                    "Allowed verdict cannot contain reasons",
                    json!({"reasons": reasons}),
                ));
            }
        } else {
            if requires_justification {
                return Err(DomainError::validation_with(
                    "invalid_verdict_state",
                    "Denied verdict cannot require justification",
                    json!({"requires_justification": requires_justification}),
                ));
            }
            if reasons.is_empty() {
                return Err(DomainError::validation_with(
                    "invalid_verdict_state",
                    "Denied verdict must contain at least one reason",
                    json!({"reasons": reasons}),
                ));
            }
        }

        Ok(Self {
            is_allowed,
            reasons,
            requires_justification,
        })
    }

    /// Success verdict, optionally demanding a justification from the actor.
    pub fn allowed(requires_justification: bool) -> Self {
        Self {
            is_allowed: true,
            reasons: Vec::new(),
            requires_justification,
        }
    }

    /// Denied verdict with the policy's reasons.
    pub fn denied(reasons: Vec<String>) -> DomainResult<Self> {
        Self::new(false, reasons, false)
    }

    pub fn is_allowed(&self) -> bool {
        self.is_allowed
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn requires_justification(&self) -> bool {
        self.requires_justification
    }
}

impl ValueObject for ConclusionVerdict {}
