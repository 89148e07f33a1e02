//! Enrollment domain events.
//!
//! Immutable integration-event records, buffered by the aggregate and drained
//! by the application layer after a successful save. Each concrete event
//! validates on construction that its `to_state` matches its semantic target -
//! this catches construction misuse, not business rules (the aggregate guards
//! those before building the event).

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use matricula_core::{DomainError, DomainResult, Event};

use crate::state::EnrollmentState;

macro_rules! enrollment_event {
    ($name:ident, $target:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
        pub struct $name {
            aggregate_id: String,
            event_id: Uuid,
            occurred_at: DateTime<Utc>,
            actor_id: String,
            from_state: EnrollmentState,
            to_state: EnrollmentState,
            justification: Option<String>,
        }

        impl $name {
            pub fn new(
                aggregate_id: impl Into<String>,
                actor_id: impl Into<String>,
                from_state: EnrollmentState,
                to_state: EnrollmentState,
                occurred_at: DateTime<Utc>,
                justification: Option<String>,
            ) -> DomainResult<Self> {
                if to_state != $target {
                    return Err(DomainError::invalid_transition(
                        "invalid_event_state",
                        concat!(stringify!($name), " event must target its own state"),
                        json!({
                            "event": stringify!($name),
                            "actual_state": to_state.as_str(),
                            "expected_state": $target.as_str(),
                        }),
                    ));
                }

                Ok(Self {
                    aggregate_id: aggregate_id.into(),
                    event_id: Uuid::new_v4(),
                    occurred_at,
                    actor_id: actor_id.into(),
                    from_state,
                    to_state,
                    justification,
                })
            }

            pub fn aggregate_id(&self) -> &str {
                &self.aggregate_id
            }

            pub fn event_id(&self) -> Uuid {
                self.event_id
            }

            pub fn occurred_at(&self) -> DateTime<Utc> {
                self.occurred_at
            }

            pub fn actor_id(&self) -> &str {
                &self.actor_id
            }

            pub fn from_state(&self) -> EnrollmentState {
                self.from_state
            }

            pub fn to_state(&self) -> EnrollmentState {
                self.to_state
            }

            pub fn justification(&self) -> Option<&str> {
                self.justification.as_deref()
            }
        }

        impl From<$name> for EnrollmentEvent {
            fn from(event: $name) -> Self {
                EnrollmentEvent::$name(event)
            }
        }
    };
}

enrollment_event!(EnrollmentConcluded, EnrollmentState::Concluded);
enrollment_event!(EnrollmentCancelled, EnrollmentState::Cancelled);
enrollment_event!(EnrollmentSuspended, EnrollmentState::Suspended);
enrollment_event!(EnrollmentReactivated, EnrollmentState::Active);

/// Closed set of enrollment integration events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EnrollmentEvent {
    EnrollmentConcluded(EnrollmentConcluded),
    EnrollmentCancelled(EnrollmentCancelled),
    EnrollmentSuspended(EnrollmentSuspended),
    EnrollmentReactivated(EnrollmentReactivated),
}

macro_rules! delegate {
    ($self:expr, $method:ident) => {
        match $self {
            EnrollmentEvent::EnrollmentConcluded(e) => e.$method(),
            EnrollmentEvent::EnrollmentCancelled(e) => e.$method(),
            EnrollmentEvent::EnrollmentSuspended(e) => e.$method(),
            EnrollmentEvent::EnrollmentReactivated(e) => e.$method(),
        }
    };
}

impl EnrollmentEvent {
    pub fn aggregate_id(&self) -> &str {
        delegate!(self, aggregate_id)
    }

    pub fn event_id(&self) -> Uuid {
        delegate!(self, event_id)
    }

    pub fn actor_id(&self) -> &str {
        delegate!(self, actor_id)
    }

    pub fn from_state(&self) -> EnrollmentState {
        delegate!(self, from_state)
    }

    pub fn to_state(&self) -> EnrollmentState {
        delegate!(self, to_state)
    }

    pub fn justification(&self) -> Option<&str> {
        delegate!(self, justification)
    }
}

impl Event for EnrollmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            EnrollmentEvent::EnrollmentConcluded(_) => "enrollment.concluded",
            EnrollmentEvent::EnrollmentCancelled(_) => "enrollment.cancelled",
            EnrollmentEvent::EnrollmentSuspended(_) => "enrollment.suspended",
            EnrollmentEvent::EnrollmentReactivated(_) => "enrollment.reactivated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        delegate!(self, occurred_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        "2024-03-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn concluded_event_requires_concluded_target() {
        let err = EnrollmentConcluded::new(
            "enr-1",
            "u-1",
            EnrollmentState::Active,
            EnrollmentState::Cancelled,
            test_time(),
            None,
        )
        .unwrap_err();
        assert_eq!(err.code(), "invalid_event_state");
        assert_eq!(err.details().unwrap()["expected_state"], "concluded");
        assert_eq!(err.details().unwrap()["actual_state"], "cancelled");
    }

    #[test]
    fn reactivated_event_targets_active() {
        let event = EnrollmentReactivated::new(
            "enr-1",
            "u-1",
            EnrollmentState::Suspended,
            EnrollmentState::Active,
            test_time(),
            Some("payment settled".to_string()),
        )
        .unwrap();
        assert_eq!(event.to_state(), EnrollmentState::Active);
        assert_eq!(event.from_state(), EnrollmentState::Suspended);
    }

    #[test]
    fn each_event_gets_a_unique_event_id() {
        let make = || {
            EnrollmentSuspended::new(
                "enr-1",
                "u-1",
                EnrollmentState::Active,
                EnrollmentState::Suspended,
                test_time(),
                None,
            )
            .unwrap()
        };
        assert_ne!(make().event_id(), make().event_id());
    }

    #[test]
    fn event_payload_shape_is_stable() {
        let event: EnrollmentEvent = EnrollmentCancelled::new(
            "enr-1",
            "u-1",
            EnrollmentState::Active,
            EnrollmentState::Cancelled,
            test_time(),
            Some("withdrawal".to_string()),
        )
        .unwrap()
        .into();

        let payload = serde_json::to_value(&event).unwrap();
        assert_eq!(payload["aggregate_id"], "enr-1");
        assert_eq!(payload["actor_id"], "u-1");
        assert_eq!(payload["from_state"], "active");
        assert_eq!(payload["to_state"], "cancelled");
        assert_eq!(payload["justification"], "withdrawal");
        assert_eq!(payload["occurred_at"], "2024-03-01T12:00:00Z");
        assert!(payload["event_id"].is_string());
        assert_eq!(event.event_type(), "enrollment.cancelled");
    }
}
