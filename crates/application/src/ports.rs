//! Port (contract) for Enrollment persistence.

use thiserror::Error;

use matricula_enrollment::Enrollment;

/// Failures surfaced by a repository adapter.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepositoryError {
    /// The stored version advanced since the aggregate was loaded.
    #[error("version conflict for enrollment {enrollment_id}: expected {expected}, stored {stored}")]
    VersionConflict {
        enrollment_id: String,
        expected: u64,
        stored: u64,
    },

    /// Adapter-specific storage failure.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Repository port for the Enrollment aggregate.
///
/// Responsibilities:
/// - Retrieve an Enrollment aggregate by id.
/// - Persist an Enrollment aggregate state, appending new transitions and
///   bumping `version` by one, failing with [`RepositoryError::VersionConflict`]
///   when the stored version has advanced since load.
///
/// Non-responsibilities:
/// - Must not enforce business rules (the domain does).
/// - Must not emit domain events (the application layer pulls them).
pub trait EnrollmentRepository {
    /// Return the enrollment if found, otherwise `None`.
    fn get_by_id(&self, enrollment_id: &str) -> Result<Option<Enrollment>, RepositoryError>;

    /// Persist the current state of the aggregate.
    fn save(&self, enrollment: &Enrollment) -> Result<(), RepositoryError>;
}
