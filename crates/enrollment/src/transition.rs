use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use matricula_core::{DomainError, DomainResult, ValueObject};

use crate::state::EnrollmentState;

/// Fixed UUIDv5 namespace for deterministic transition identifiers.
const TRANSITION_NAMESPACE: Uuid = Uuid::from_u128(0x8f0c1a6e_4b2d_4d57_9c3a_5d1e02e7a914);

/// Value object: one recorded state change.
///
/// Immutable once constructed. The constructor rejects blank actors and
/// self-transitions; `occurred_at` is never defaulted here - the aggregate
/// command layer resolves "now" before building the value object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTransition {
    from_state: EnrollmentState,
    to_state: EnrollmentState,
    actor_id: String,
    occurred_at: DateTime<Utc>,
    justification: Option<String>,
}

impl StateTransition {
    pub fn new(
        from_state: EnrollmentState,
        to_state: EnrollmentState,
        actor_id: impl Into<String>,
        occurred_at: DateTime<Utc>,
        justification: Option<String>,
    ) -> DomainResult<Self> {
        let actor_id = actor_id.into();
        if actor_id.trim().is_empty() {
            return Err(DomainError::validation_with(
                "invalid_actor_id",
                "actor_id cannot be empty",
                json!({"actor_id": actor_id}),
            ));
        }
        if from_state == to_state {
            return Err(DomainError::invalid_transition(
                "invalid_state_transition",
                "from_state and to_state cannot be the same",
                json!({
                    "from_state": from_state.as_str(),
                    "to_state": to_state.as_str(),
                }),
            ));
        }

        Ok(Self {
            from_state,
            to_state,
            actor_id,
            occurred_at,
            justification,
        })
    }

    pub fn from_state(&self) -> EnrollmentState {
        self.from_state
    }

    pub fn to_state(&self) -> EnrollmentState {
        self.to_state
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn justification(&self) -> Option<&str> {
        self.justification.as_deref()
    }
}

impl ValueObject for StateTransition {}

/// Deterministic identifier for a logical transition.
///
/// Same inputs always yield the same UUID, so consumers that deduplicate on it
/// are safe under at-least-once delivery. `justification` of `None` and `""`
/// collapse to the same fingerprint.
pub fn transition_id(
    aggregate_id: &str,
    action: &str,
    from_state: EnrollmentState,
    to_state: EnrollmentState,
    occurred_at: DateTime<Utc>,
    actor_id: &str,
    justification: Option<&str>,
) -> Uuid {
    let just = justification.unwrap_or("").trim();
    let fingerprint = format!(
        "enrollment:{aggregate_id}|action:{action}|from:{}|to:{}|at:{}|actor:{actor_id}|just:{just}",
        from_state.as_str(),
        to_state.as_str(),
        occurred_at.to_rfc3339(),
    );
    Uuid::new_v5(&TRANSITION_NAMESPACE, fingerprint.as_bytes())
}
