//! `matricula-enrollment` — the Enrollment aggregate and its satellites.
//!
//! State-transition engine for a student enrollment: a fixed four-state
//! machine (active, suspended, concluded, cancelled) whose transitions are
//! guarded by business rules, recorded as an immutable audit trail and
//! published as domain events for downstream consumers (billing,
//! certificates, etc.).

pub mod enrollment;
pub mod events;
pub mod state;
pub mod transition;
pub mod verdict;

pub use enrollment::{Enrollment, EnrollmentSnapshot};
pub use events::{
    EnrollmentCancelled, EnrollmentConcluded, EnrollmentEvent, EnrollmentReactivated,
    EnrollmentSuspended,
};
pub use state::EnrollmentState;
pub use transition::{StateTransition, transition_id};
pub use verdict::ConclusionVerdict;
