//! Outcome contract for enrollment use cases.

use matricula_enrollment::{EnrollmentEvent, EnrollmentState};

/// Result of a successfully executed use case.
///
/// The changed/unchanged contract is carried by the shape itself: an
/// `Unchanged` outcome cannot hold events or a new state, and a `Changed`
/// outcome always names the post-command state. Expected failures travel as
/// `Err(ApplicationError)` alongside this type.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplicationResult {
    /// The command transitioned the aggregate; it was persisted and its
    /// pending events were drained into `events` (oldest first, non-empty).
    Changed {
        aggregate_id: String,
        new_state: EnrollmentState,
        events: Vec<EnrollmentEvent>,
    },
    /// Idempotent no-op: the aggregate was already in the target state.
    /// Nothing was persisted and no events were produced.
    Unchanged { aggregate_id: String },
}

impl ApplicationResult {
    pub fn aggregate_id(&self) -> &str {
        match self {
            Self::Changed { aggregate_id, .. } | Self::Unchanged { aggregate_id } => aggregate_id,
        }
    }

    pub fn changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }

    pub fn new_state(&self) -> Option<EnrollmentState> {
        match self {
            Self::Changed { new_state, .. } => Some(*new_state),
            Self::Unchanged { .. } => None,
        }
    }

    pub fn events(&self) -> &[EnrollmentEvent] {
        match self {
            Self::Changed { events, .. } => events,
            Self::Unchanged { .. } => &[],
        }
    }
}
