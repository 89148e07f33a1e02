use chrono::{DateTime, FixedOffset, Utc};
use serde_json::json;

use matricula_core::{AggregateRoot, DomainError, DomainResult};

use crate::events::{
    EnrollmentCancelled, EnrollmentConcluded, EnrollmentEvent, EnrollmentReactivated,
    EnrollmentSuspended,
};
use crate::state::EnrollmentState;
use crate::transition::StateTransition;
use crate::verdict::ConclusionVerdict;

/// Lifecycle timestamp fields, used by the state-integrity matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleField {
    ConcludedAt,
    CancelledAt,
    SuspendedAt,
}

impl LifecycleField {
    fn name(self) -> &'static str {
        match self {
            LifecycleField::ConcludedAt => "concluded_at",
            LifecycleField::CancelledAt => "cancelled_at",
            LifecycleField::SuspendedAt => "suspended_at",
        }
    }
}

/// State consistency matrix: for each state, the lifecycle timestamp that must
/// be set and the ones that must be null. Total over all four states, so a new
/// state cannot be added without extending it.
fn integrity_rule(
    state: EnrollmentState,
) -> (&'static [LifecycleField], &'static [LifecycleField]) {
    use LifecycleField::*;
    match state {
        EnrollmentState::Active => (&[], &[ConcludedAt, CancelledAt, SuspendedAt]),
        EnrollmentState::Suspended => (&[SuspendedAt], &[ConcludedAt, CancelledAt]),
        EnrollmentState::Concluded => (&[ConcludedAt], &[CancelledAt, SuspendedAt]),
        EnrollmentState::Cancelled => (&[CancelledAt], &[ConcludedAt, SuspendedAt]),
    }
}

/// Flat rehydration input for [`Enrollment`], as a storage mapper sees it.
///
/// Timestamps are offset-aware; `rehydrate` normalizes them to UTC. `state` is
/// the canonical lowercase string. Adapters holding naive timestamps must tag
/// them UTC before building the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentSnapshot {
    pub id: String,
    pub student_id: String,
    pub class_group_id: String,
    pub academic_period_id: String,
    pub state: String,
    pub created_at: DateTime<FixedOffset>,
    pub concluded_at: Option<DateTime<FixedOffset>>,
    pub cancelled_at: Option<DateTime<FixedOffset>>,
    pub suspended_at: Option<DateTime<FixedOffset>>,
    pub version: u64,
    pub transitions: Vec<StateTransition>,
}

/// Aggregate root: Enrollment.
///
/// Mutable projection of the current lifecycle state plus an append-only
/// transition log. All mutation goes through the four command methods;
/// invariants are checked on every construction, so a rehydrated instance is
/// as trustworthy as a fresh one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    id: String,
    student_id: String,
    class_group_id: String,
    academic_period_id: String,
    state: EnrollmentState,
    created_at: DateTime<Utc>,
    concluded_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    suspended_at: Option<DateTime<Utc>>,
    version: u64,
    transitions: Vec<StateTransition>,
    pending_events: Vec<EnrollmentEvent>,
}

impl Enrollment {
    /// Create a fresh enrollment in the ACTIVE state, version 1, no history.
    pub fn new(
        id: impl Into<String>,
        student_id: impl Into<String>,
        class_group_id: impl Into<String>,
        academic_period_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let enrollment = Self {
            id: id.into(),
            student_id: student_id.into(),
            class_group_id: class_group_id.into(),
            academic_period_id: academic_period_id.into(),
            state: EnrollmentState::Active,
            created_at,
            concluded_at: None,
            cancelled_at: None,
            suspended_at: None,
            version: 1,
            transitions: Vec::new(),
            pending_events: Vec::new(),
        };
        enrollment.validate()?;
        Ok(enrollment)
    }

    /// Rebuild the aggregate from persisted state, re-running every invariant.
    ///
    /// Violated snapshots are rejected, never silently repaired.
    pub fn rehydrate(snapshot: EnrollmentSnapshot) -> DomainResult<Self> {
        let state: EnrollmentState = snapshot.state.parse()?;

        let enrollment = Self {
            id: snapshot.id,
            student_id: snapshot.student_id,
            class_group_id: snapshot.class_group_id,
            academic_period_id: snapshot.academic_period_id,
            state,
            created_at: snapshot.created_at.with_timezone(&Utc),
            concluded_at: snapshot.concluded_at.map(|dt| dt.with_timezone(&Utc)),
            cancelled_at: snapshot.cancelled_at.map(|dt| dt.with_timezone(&Utc)),
            suspended_at: snapshot.suspended_at.map(|dt| dt.with_timezone(&Utc)),
            version: snapshot.version,
            transitions: snapshot.transitions,
            pending_events: Vec::new(),
        };
        enrollment.validate()?;
        Ok(enrollment)
    }

    /// Flatten the aggregate back into its persisted shape (inverse of
    /// [`Enrollment::rehydrate`]). Pending events are deliberately not part of
    /// the snapshot; they are drained, not stored.
    pub fn snapshot(&self) -> EnrollmentSnapshot {
        EnrollmentSnapshot {
            id: self.id.clone(),
            student_id: self.student_id.clone(),
            class_group_id: self.class_group_id.clone(),
            academic_period_id: self.academic_period_id.clone(),
            state: self.state.as_str().to_string(),
            created_at: self.created_at.fixed_offset(),
            concluded_at: self.concluded_at.map(|dt| dt.fixed_offset()),
            cancelled_at: self.cancelled_at.map(|dt| dt.fixed_offset()),
            suspended_at: self.suspended_at.map(|dt| dt.fixed_offset()),
            version: self.version,
            transitions: self.transitions.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> DomainResult<()> {
        self.validate_identity()?;
        self.validate_version()?;
        self.validate_state_integrity()
    }

    fn validate_identity(&self) -> DomainResult<()> {
        if self.id.trim().is_empty() {
            return Err(DomainError::validation(
                "invalid_id",
                "Enrollment must have a valid ID",
            ));
        }
        Ok(())
    }

    fn validate_version(&self) -> DomainResult<()> {
        if self.version < 1 {
            return Err(DomainError::validation_with(
                "invalid_version",
                "Enrollment version must be >= 1",
                json!({"version": self.version}),
            ));
        }
        Ok(())
    }

    fn lifecycle_field(&self, field: LifecycleField) -> Option<DateTime<Utc>> {
        match field {
            LifecycleField::ConcludedAt => self.concluded_at,
            LifecycleField::CancelledAt => self.cancelled_at,
            LifecycleField::SuspendedAt => self.suspended_at,
        }
    }

    fn validate_state_integrity(&self) -> DomainResult<()> {
        let (required, forbidden) = integrity_rule(self.state);

        for field in required {
            if self.lifecycle_field(*field).is_none() {
                return Err(DomainError::validation_with(
                    format!("missing_{}", field.name()),
                    format!(
                        "Enrollment {} requires {} to be set",
                        self.state,
                        field.name()
                    ),
                    json!({"state": self.state.as_str(), "missing_field": field.name()}),
                ));
            }
        }

        for field in forbidden {
            if self.lifecycle_field(*field).is_some() {
                return Err(DomainError::validation_with(
                    "inconsistent_timestamps",
                    format!(
                        "Enrollment {} cannot carry the {} field",
                        self.state,
                        field.name()
                    ),
                    json!({"state": self.state.as_str(), "forbidden_field": field.name()}),
                ));
            }
        }

        Ok(())
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn class_group_id(&self) -> &str {
        &self.class_group_id
    }

    pub fn academic_period_id(&self) -> &str {
        &self.academic_period_id
    }

    pub fn state(&self) -> EnrollmentState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn concluded_at(&self) -> Option<DateTime<Utc>> {
        self.concluded_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn suspended_at(&self) -> Option<DateTime<Utc>> {
        self.suspended_at
    }

    /// Full audit trail, oldest first. Never trimmed.
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Read-only view of the not-yet-drained event buffer.
    pub fn pending_events(&self) -> &[EnrollmentEvent] {
        &self.pending_events
    }

    /// True iff the enrollment is in a terminal state.
    pub fn is_final(&self) -> bool {
        self.state.is_terminal()
    }

    /// Drain the pending event buffer, oldest first.
    ///
    /// The aggregate never dispatches events itself; the application layer
    /// pulls them after a successful save and hands them to the publisher.
    pub fn pull_domain_events(&mut self) -> Vec<EnrollmentEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// ACTIVE -> CONCLUDED, gated by an externally computed policy verdict.
    ///
    /// Idempotent: concluding an already concluded enrollment is a no-op.
    pub fn conclude(
        &mut self,
        actor_id: &str,
        verdict: &ConclusionVerdict,
        occurred_at: Option<DateTime<Utc>>,
        justification: Option<&str>,
    ) -> DomainResult<()> {
        if self.state == EnrollmentState::Concluded {
            return Ok(());
        }

        if self.state != EnrollmentState::Active {
            return Err(DomainError::not_active(
                format!("Cannot conclude enrollment in state {}", self.state),
                json!({
                    "current_state": self.state.as_str(),
                    "required_state": EnrollmentState::Active.as_str(),
                    "attempted_action": "conclude",
                }),
            ));
        }

        if !verdict.is_allowed() {
            return Err(DomainError::conclusion_not_allowed(
                "Conclusion blocked by policy",
                json!({
                    "reasons": verdict.reasons(),
                    "attempted_action": "conclude",
                }),
            ));
        }

        if verdict.requires_justification() && !has_text(justification) {
            return Err(DomainError::justification_required(
                "justification_required",
                "Justification required by verdict",
                json!({"policy": "requires_justification"}),
            ));
        }

        self.apply_transition(
            EnrollmentState::Concluded,
            actor_id,
            occurred_at,
            justification,
        )
    }

    /// {ACTIVE, SUSPENDED} -> CANCELLED.
    ///
    /// Idempotent: cancelling an already cancelled enrollment is a no-op.
    pub fn cancel(
        &mut self,
        actor_id: &str,
        justification: &str,
        occurred_at: Option<DateTime<Utc>>,
    ) -> DomainResult<()> {
        if self.state == EnrollmentState::Cancelled {
            return Ok(());
        }

        if self.is_final() {
            return Err(DomainError::invalid_transition(
                "invalid_state_transition",
                format!("Cannot cancel from terminal state {}", self.state),
                json!({
                    "current_state": self.state.as_str(),
                    "attempted_action": "cancel",
                    "allowed_from_states": ["active", "suspended"],
                    "forbidden_reason": self.state.as_str(),
                }),
            ));
        }

        self.require_justification(justification, "cancellation")?;

        self.apply_transition(
            EnrollmentState::Cancelled,
            actor_id,
            occurred_at,
            Some(justification),
        )
    }

    /// ACTIVE -> SUSPENDED.
    ///
    /// Idempotent: suspending an already suspended enrollment is a no-op.
    pub fn suspend(
        &mut self,
        actor_id: &str,
        justification: &str,
        occurred_at: Option<DateTime<Utc>>,
    ) -> DomainResult<()> {
        if self.state == EnrollmentState::Suspended {
            return Ok(());
        }

        if self.state != EnrollmentState::Active {
            return Err(DomainError::invalid_transition(
                "invalid_state_transition",
                format!("Only active enrollments can be suspended, current: {}", self.state),
                json!({
                    "current_state": self.state.as_str(),
                    "attempted_action": "suspend",
                    "allowed_from_states": ["active"],
                    "forbidden_reason": self.state.as_str(),
                }),
            ));
        }

        self.require_justification(justification, "suspension")?;

        self.apply_transition(
            EnrollmentState::Suspended,
            actor_id,
            occurred_at,
            Some(justification),
        )
    }

    /// SUSPENDED -> ACTIVE, clearing all lifecycle timestamps.
    ///
    /// Idempotent: reactivating an already active enrollment is a no-op.
    pub fn reactivate(
        &mut self,
        actor_id: &str,
        justification: &str,
        occurred_at: Option<DateTime<Utc>>,
    ) -> DomainResult<()> {
        if self.state == EnrollmentState::Active {
            return Ok(());
        }

        if self.state != EnrollmentState::Suspended {
            return Err(DomainError::invalid_transition(
                "invalid_state_transition",
                format!(
                    "Reactivation is only allowed for suspended enrollments, current: {}",
                    self.state
                ),
                json!({
                    "current_state": self.state.as_str(),
                    "required_state": EnrollmentState::Suspended.as_str(),
                    "attempted_action": "reactivate",
                }),
            ));
        }

        self.require_justification(justification, "reactivation")?;

        self.apply_transition(
            EnrollmentState::Active,
            actor_id,
            occurred_at,
            Some(justification),
        )
    }

    fn require_justification(&self, justification: &str, action: &str) -> DomainResult<()> {
        if !has_text(Some(justification)) {
            return Err(DomainError::justification_required(
                "required_justification",
                format!("Justification required for {action}"),
                json!({"policy": "justification_required"}),
            ));
        }
        Ok(())
    }

    /// Atomic transition: validate and construct everything first, mutate last.
    ///
    /// The transition VO and the target event both self-validate on
    /// construction; nothing after them can fail, so a failure at any step
    /// leaves the aggregate untouched.
    fn apply_transition(
        &mut self,
        to_state: EnrollmentState,
        actor_id: &str,
        occurred_at: Option<DateTime<Utc>>,
        justification: Option<&str>,
    ) -> DomainResult<()> {
        let occurred_at = occurred_at.unwrap_or_else(Utc::now);
        let from_state = self.state;
        let justification = justification.map(str::to_string);

        let transition = StateTransition::new(
            from_state,
            to_state,
            actor_id,
            occurred_at,
            justification.clone(),
        )?;

        // The target state picks the event type: reactivation is the only
        // command that moves back to ACTIVE.
        let event: EnrollmentEvent = match to_state {
            EnrollmentState::Concluded => EnrollmentConcluded::new(
                &self.id,
                actor_id,
                from_state,
                to_state,
                occurred_at,
                justification,
            )?
            .into(),
            EnrollmentState::Cancelled => EnrollmentCancelled::new(
                &self.id,
                actor_id,
                from_state,
                to_state,
                occurred_at,
                justification,
            )?
            .into(),
            EnrollmentState::Suspended => EnrollmentSuspended::new(
                &self.id,
                actor_id,
                from_state,
                to_state,
                occurred_at,
                justification,
            )?
            .into(),
            EnrollmentState::Active => EnrollmentReactivated::new(
                &self.id,
                actor_id,
                from_state,
                to_state,
                occurred_at,
                justification,
            )?
            .into(),
        };

        // Happy path from here on: nothing below may fail.
        self.concluded_at = None;
        self.cancelled_at = None;
        self.suspended_at = None;

        self.state = to_state;
        match to_state {
            EnrollmentState::Concluded => self.concluded_at = Some(occurred_at),
            EnrollmentState::Cancelled => self.cancelled_at = Some(occurred_at),
            EnrollmentState::Suspended => self.suspended_at = Some(occurred_at),
            EnrollmentState::Active => {}
        }

        self.transitions.push(transition);
        self.pending_events.push(event);
        Ok(())
    }
}

impl AggregateRoot for Enrollment {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use matricula_core::Event;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        "2024-03-01T12:00:00Z".parse().unwrap()
    }

    fn snapshot_in(state: EnrollmentState) -> EnrollmentSnapshot {
        let now = test_time().fixed_offset();
        EnrollmentSnapshot {
            id: "enr-1".to_string(),
            student_id: "stu-1".to_string(),
            class_group_id: "cls-1".to_string(),
            academic_period_id: "per-1".to_string(),
            state: state.as_str().to_string(),
            created_at: now,
            concluded_at: (state == EnrollmentState::Concluded).then_some(now),
            cancelled_at: (state == EnrollmentState::Cancelled).then_some(now),
            suspended_at: (state == EnrollmentState::Suspended).then_some(now),
            version: 1,
            transitions: Vec::new(),
        }
    }

    fn make_enrollment(state: EnrollmentState) -> Enrollment {
        Enrollment::rehydrate(snapshot_in(state)).unwrap()
    }

    #[test]
    fn new_enrollment_starts_active_at_version_one() {
        let enrollment =
            Enrollment::new("enr-1", "stu-1", "cls-1", "per-1", test_time()).unwrap();
        assert_eq!(enrollment.state(), EnrollmentState::Active);
        assert_eq!(enrollment.version(), 1);
        assert!(enrollment.transitions().is_empty());
        assert!(enrollment.pending_events().is_empty());
        assert!(!enrollment.is_final());
    }

    #[test]
    fn blank_id_is_rejected() {
        let err =
            Enrollment::new("   ", "stu-1", "cls-1", "per-1", test_time()).unwrap_err();
        assert_eq!(err.code(), "invalid_id");
    }

    #[test]
    fn version_zero_is_rejected() {
        let mut snapshot = snapshot_in(EnrollmentState::Active);
        snapshot.version = 0;
        let err = Enrollment::rehydrate(snapshot).unwrap_err();
        assert_eq!(err.code(), "invalid_version");
    }

    #[test]
    fn unknown_state_string_is_rejected_on_rehydration() {
        let mut snapshot = snapshot_in(EnrollmentState::Active);
        snapshot.state = "graduated".to_string();
        let err = Enrollment::rehydrate(snapshot).unwrap_err();
        assert_eq!(err.code(), "invalid_state");
    }

    #[test]
    fn rehydration_normalizes_timestamps_to_utc() {
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let local = test_time().with_timezone(&offset);
        let mut snapshot = snapshot_in(EnrollmentState::Concluded);
        snapshot.created_at = local;
        snapshot.concluded_at = Some(local);

        let enrollment = Enrollment::rehydrate(snapshot).unwrap();
        assert_eq!(enrollment.created_at(), test_time());
        assert_eq!(enrollment.concluded_at(), Some(test_time()));
    }

    // Exactly-one-timestamp invariant: across the 4x4 state x timestamp-set
    // grid, only the matching combination rehydrates.
    #[test]
    fn state_integrity_matrix_is_total() {
        let now = test_time().fixed_offset();
        let timestamp_sets: [(Option<&str>, &str); 4] = [
            (None, "none"),
            (Some("concluded_at"), "concluded_at"),
            (Some("cancelled_at"), "cancelled_at"),
            (Some("suspended_at"), "suspended_at"),
        ];

        for state in EnrollmentState::ALL {
            for (set_field, label) in timestamp_sets {
                let mut snapshot = snapshot_in(state);
                snapshot.concluded_at = (set_field == Some("concluded_at")).then_some(now);
                snapshot.cancelled_at = (set_field == Some("cancelled_at")).then_some(now);
                snapshot.suspended_at = (set_field == Some("suspended_at")).then_some(now);

                let expected_field = match state {
                    EnrollmentState::Active => None,
                    EnrollmentState::Suspended => Some("suspended_at"),
                    EnrollmentState::Concluded => Some("concluded_at"),
                    EnrollmentState::Cancelled => Some("cancelled_at"),
                };

                let result = Enrollment::rehydrate(snapshot);
                if set_field == expected_field {
                    assert!(result.is_ok(), "state {state} with {label} should rehydrate");
                } else {
                    let err = result.unwrap_err();
                    assert!(
                        err.code().starts_with("missing_")
                            || err.code() == "inconsistent_timestamps",
                        "state {state} with {label} gave {}",
                        err.code()
                    );
                }
            }
        }
    }

    // Scenario E.
    #[test]
    fn concluded_without_concluded_at_reports_missing_field() {
        let mut snapshot = snapshot_in(EnrollmentState::Concluded);
        snapshot.concluded_at = None;
        let err = Enrollment::rehydrate(snapshot).unwrap_err();
        assert_eq!(err.code(), "missing_concluded_at");
    }

    #[test]
    fn active_with_stray_timestamp_reports_inconsistency() {
        let mut snapshot = snapshot_in(EnrollmentState::Active);
        snapshot.suspended_at = Some(test_time().fixed_offset());
        let err = Enrollment::rehydrate(snapshot).unwrap_err();
        assert_eq!(err.code(), "inconsistent_timestamps");
        assert_eq!(err.details().unwrap()["forbidden_field"], "suspended_at");
    }

    // Scenario A.
    #[test]
    fn cancel_active_records_transition_and_event() {
        let mut enrollment = make_enrollment(EnrollmentState::Active);
        enrollment.cancel("u-1", "valid reason", None).unwrap();

        assert_eq!(enrollment.state(), EnrollmentState::Cancelled);
        assert!(enrollment.cancelled_at().is_some());
        assert!(enrollment.is_final());

        assert_eq!(enrollment.transitions().len(), 1);
        let transition = &enrollment.transitions()[0];
        assert_eq!(transition.from_state(), EnrollmentState::Active);
        assert_eq!(transition.to_state(), EnrollmentState::Cancelled);

        assert_eq!(enrollment.pending_events().len(), 1);
        match &enrollment.pending_events()[0] {
            EnrollmentEvent::EnrollmentCancelled(event) => {
                assert_eq!(event.aggregate_id(), "enr-1");
                assert_eq!(event.actor_id(), "u-1");
                assert_eq!(event.justification(), Some("valid reason"));
            }
            other => panic!("expected EnrollmentCancelled, got {other:?}"),
        }
    }

    // Scenario B.
    #[test]
    fn cancel_from_concluded_is_rejected_without_mutation() {
        let mut enrollment = make_enrollment(EnrollmentState::Concluded);
        let before = enrollment.clone();

        let err = enrollment.cancel("u-1", "reason", None).unwrap_err();
        assert_eq!(err.code(), "invalid_state_transition");
        let details = err.details().unwrap();
        assert_eq!(details["current_state"], "concluded");
        assert_eq!(details["attempted_action"], "cancel");
        assert_eq!(details["allowed_from_states"], serde_json::json!(["active", "suspended"]));
        assert_eq!(details["forbidden_reason"], "concluded");

        assert_eq!(enrollment, before);
    }

    // Scenario C.
    #[test]
    fn conclude_blocked_by_policy_is_rejected_without_mutation() {
        let mut enrollment = make_enrollment(EnrollmentState::Active);
        let before = enrollment.clone();
        let verdict = ConclusionVerdict::denied(vec!["low attendance".to_string()]).unwrap();

        let err = enrollment.conclude("u-1", &verdict, None, None).unwrap_err();
        assert_eq!(err.code(), "conclusion_not_allowed");
        let details = err.details().unwrap();
        assert_eq!(details["reasons"], serde_json::json!(["low attendance"]));
        assert_eq!(details["attempted_action"], "conclude");

        assert_eq!(enrollment, before);
    }

    // Scenario D.
    #[test]
    fn suspend_with_blank_justification_is_rejected() {
        let mut enrollment = make_enrollment(EnrollmentState::Active);
        let before = enrollment.clone();

        let err = enrollment.suspend("u-1", "", None).unwrap_err();
        assert_eq!(err.code(), "required_justification");
        assert_eq!(err.details().unwrap()["policy"], "justification_required");

        assert_eq!(enrollment.state(), EnrollmentState::Active);
        assert!(enrollment.suspended_at().is_none());
        assert_eq!(enrollment, before);
    }

    #[test]
    fn conclude_active_with_allowed_verdict_succeeds() {
        let mut enrollment = make_enrollment(EnrollmentState::Active);
        let verdict = ConclusionVerdict::allowed(false);

        enrollment
            .conclude("u-1", &verdict, Some(test_time()), None)
            .unwrap();

        assert_eq!(enrollment.state(), EnrollmentState::Concluded);
        assert_eq!(enrollment.concluded_at(), Some(test_time()));
        assert!(enrollment.cancelled_at().is_none());
        assert!(enrollment.suspended_at().is_none());
        assert_eq!(enrollment.transitions().len(), 1);
        assert_eq!(enrollment.pending_events().len(), 1);
    }

    #[test]
    fn conclude_requiring_justification_rejects_blank() {
        let mut enrollment = make_enrollment(EnrollmentState::Active);
        let before = enrollment.clone();
        let verdict = ConclusionVerdict::allowed(true);

        let err = enrollment
            .conclude("u-1", &verdict, None, Some("   "))
            .unwrap_err();
        assert_eq!(err.code(), "justification_required");
        assert_eq!(err.details().unwrap()["policy"], "requires_justification");
        assert_eq!(enrollment, before);

        enrollment
            .conclude("u-1", &verdict, None, Some("all requirements met"))
            .unwrap();
        assert_eq!(enrollment.state(), EnrollmentState::Concluded);
    }

    #[test]
    fn conclude_outside_active_reports_not_active() {
        let mut enrollment = make_enrollment(EnrollmentState::Suspended);
        let before = enrollment.clone();
        let verdict = ConclusionVerdict::allowed(false);

        let err = enrollment.conclude("u-1", &verdict, None, None).unwrap_err();
        assert_eq!(err.code(), "enrollment_not_active");
        let details = err.details().unwrap();
        assert_eq!(details["current_state"], "suspended");
        assert_eq!(details["required_state"], "active");
        assert_eq!(details["attempted_action"], "conclude");
        assert_eq!(enrollment, before);
    }

    #[test]
    fn cancel_from_suspended_is_allowed() {
        let mut enrollment = make_enrollment(EnrollmentState::Suspended);
        enrollment.cancel("u-1", "no-show", None).unwrap();

        assert_eq!(enrollment.state(), EnrollmentState::Cancelled);
        assert!(enrollment.cancelled_at().is_some());
        assert!(enrollment.suspended_at().is_none());
        assert_eq!(enrollment.transitions()[0].from_state(), EnrollmentState::Suspended);
    }

    #[test]
    fn suspend_from_terminal_states_is_rejected() {
        for state in [EnrollmentState::Concluded, EnrollmentState::Cancelled] {
            let mut enrollment = make_enrollment(state);
            let before = enrollment.clone();

            let err = enrollment.suspend("u-1", "non-payment", None).unwrap_err();
            assert_eq!(err.code(), "invalid_state_transition");
            let details = err.details().unwrap();
            assert_eq!(details["allowed_from_states"], serde_json::json!(["active"]));
            assert_eq!(details["forbidden_reason"], state.as_str());
            assert_eq!(enrollment, before);
        }
    }

    #[test]
    fn reactivate_suspended_clears_all_lifecycle_timestamps() {
        let mut enrollment = make_enrollment(EnrollmentState::Suspended);
        enrollment
            .reactivate("u-1", "payment settled", Some(test_time()))
            .unwrap();

        assert_eq!(enrollment.state(), EnrollmentState::Active);
        assert!(enrollment.concluded_at().is_none());
        assert!(enrollment.cancelled_at().is_none());
        assert!(enrollment.suspended_at().is_none());
        assert_eq!(enrollment.transitions().len(), 1);
        match &enrollment.pending_events()[0] {
            EnrollmentEvent::EnrollmentReactivated(event) => {
                assert_eq!(event.from_state(), EnrollmentState::Suspended);
                assert_eq!(event.to_state(), EnrollmentState::Active);
            }
            other => panic!("expected EnrollmentReactivated, got {other:?}"),
        }
    }

    #[test]
    fn reactivate_outside_suspended_is_rejected() {
        for state in [EnrollmentState::Concluded, EnrollmentState::Cancelled] {
            let mut enrollment = make_enrollment(state);
            let before = enrollment.clone();

            let err = enrollment.reactivate("u-1", "reason", None).unwrap_err();
            assert_eq!(err.code(), "invalid_state_transition");
            let details = err.details().unwrap();
            assert_eq!(details["required_state"], "suspended");
            assert_eq!(details["attempted_action"], "reactivate");
            assert_eq!(enrollment, before);
        }
    }

    #[test]
    fn commands_are_idempotent_in_their_target_state() {
        let verdict = ConclusionVerdict::allowed(false);

        let mut concluded = make_enrollment(EnrollmentState::Concluded);
        let before = concluded.clone();
        concluded.conclude("u-1", &verdict, None, None).unwrap();
        assert_eq!(concluded, before);

        let mut cancelled = make_enrollment(EnrollmentState::Cancelled);
        let before = cancelled.clone();
        cancelled.cancel("u-1", "again", None).unwrap();
        assert_eq!(cancelled, before);

        let mut suspended = make_enrollment(EnrollmentState::Suspended);
        let before = suspended.clone();
        suspended.suspend("u-1", "again", None).unwrap();
        assert_eq!(suspended, before);

        let mut active = make_enrollment(EnrollmentState::Active);
        let before = active.clone();
        active.reactivate("u-1", "again", None).unwrap();
        assert_eq!(active, before);
    }

    #[test]
    fn last_transition_and_event_agree() {
        let mut enrollment = make_enrollment(EnrollmentState::Active);
        enrollment.suspend("u-1", "non-payment", Some(test_time())).unwrap();
        enrollment.reactivate("u-2", "payment settled", None).unwrap();

        let transition = enrollment.transitions().last().unwrap();
        let event = enrollment.pending_events().last().unwrap();

        assert_eq!(event.occurred_at(), transition.occurred_at());
        assert_eq!(event.from_state(), transition.from_state());
        assert_eq!(event.to_state(), transition.to_state());
        assert_eq!(event.actor_id(), transition.actor_id());
        assert_eq!(event.justification(), transition.justification());
    }

    #[test]
    fn pull_domain_events_drains_once() {
        let mut enrollment = make_enrollment(EnrollmentState::Active);
        assert!(enrollment.pull_domain_events().is_empty());

        enrollment.cancel("u-1", "valid reason", None).unwrap();
        let state_before = enrollment.state();
        let transitions_before = enrollment.transitions().len();

        let pulled = enrollment.pull_domain_events();
        let pulled_again = enrollment.pull_domain_events();

        assert_eq!(pulled.len(), 1);
        assert!(pulled_again.is_empty());
        assert_eq!(pulled[0].aggregate_id(), "enr-1");
        assert_eq!(enrollment.state(), state_before);
        assert_eq!(enrollment.transitions().len(), transitions_before);
    }

    #[test]
    fn event_buffer_preserves_command_order() {
        let mut enrollment = make_enrollment(EnrollmentState::Active);
        enrollment.suspend("u-1", "non-payment", None).unwrap();
        enrollment.reactivate("u-1", "payment settled", None).unwrap();
        enrollment.cancel("u-1", "withdrawal", None).unwrap();

        let types: Vec<_> = enrollment
            .pull_domain_events()
            .iter()
            .map(matricula_core::Event::event_type)
            .collect();
        assert_eq!(
            types,
            [
                "enrollment.suspended",
                "enrollment.reactivated",
                "enrollment.cancelled"
            ]
        );
    }

    #[test]
    fn snapshot_round_trips() {
        let mut enrollment = make_enrollment(EnrollmentState::Active);
        enrollment.suspend("u-1", "non-payment", Some(test_time())).unwrap();
        enrollment.pull_domain_events();

        let rehydrated = Enrollment::rehydrate(enrollment.snapshot()).unwrap();
        assert_eq!(rehydrated, enrollment);
    }

    fn assert_exactly_one_matching_timestamp(enrollment: &Enrollment) {
        let set = [
            enrollment.concluded_at().is_some(),
            enrollment.cancelled_at().is_some(),
            enrollment.suspended_at().is_some(),
        ];
        let expected = match enrollment.state() {
            EnrollmentState::Active => [false, false, false],
            EnrollmentState::Concluded => [true, false, false],
            EnrollmentState::Cancelled => [false, true, false],
            EnrollmentState::Suspended => [false, false, true],
        };
        assert_eq!(set, expected, "state {:?}", enrollment.state());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: any sequence of commands, legal or not, leaves the
        /// aggregate with exactly the timestamp matching its state and keeps
        /// the transition log aligned with the event buffer.
        #[test]
        fn command_sequences_preserve_integrity(
            commands in prop::collection::vec(0u8..4, 1..20)
        ) {
            let mut enrollment = make_enrollment(EnrollmentState::Active);
            let verdict = ConclusionVerdict::allowed(false);

            for command in commands {
                let _ = match command {
                    0 => enrollment.conclude("u-1", &verdict, None, None),
                    1 => enrollment.cancel("u-1", "reason", None),
                    2 => enrollment.suspend("u-1", "reason", None),
                    _ => enrollment.reactivate("u-1", "reason", None),
                };

                assert_exactly_one_matching_timestamp(&enrollment);
                prop_assert_eq!(
                    enrollment.transitions().len(),
                    enrollment.pending_events().len()
                );
            }

            for (transition, event) in enrollment
                .transitions()
                .iter()
                .zip(enrollment.pending_events())
            {
                prop_assert_eq!(transition.to_state(), event.to_state());
                prop_assert_eq!(transition.occurred_at(), event.occurred_at());
            }
        }
    }
}
