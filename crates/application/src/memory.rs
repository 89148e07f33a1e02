//! In-memory repository adapter, for tests and local wiring.

use std::collections::HashMap;
use std::sync::Mutex;

use matricula_core::{AggregateRoot, ExpectedVersion};
use matricula_enrollment::{Enrollment, EnrollmentSnapshot};

use crate::ports::{EnrollmentRepository, RepositoryError};

/// HashMap-backed [`EnrollmentRepository`] with the same optimistic-concurrency
/// contract a database adapter must honor: a save only succeeds when the
/// incoming aggregate carries the stored version, and every successful save
/// bumps the stored version by one.
#[derive(Debug, Default)]
pub struct InMemoryEnrollmentRepository {
    inner: Mutex<HashMap<String, EnrollmentSnapshot>>,
}

impl InMemoryEnrollmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an aggregate as-is, bypassing the version handshake.
    pub fn insert(&self, enrollment: &Enrollment) {
        self.inner
            .lock()
            .unwrap()
            .insert(enrollment.id().to_string(), enrollment.snapshot());
    }

    /// Stored version for an id, if present.
    pub fn stored_version(&self, enrollment_id: &str) -> Option<u64> {
        self.inner
            .lock()
            .unwrap()
            .get(enrollment_id)
            .map(|snapshot| snapshot.version)
    }
}

impl EnrollmentRepository for InMemoryEnrollmentRepository {
    fn get_by_id(&self, enrollment_id: &str) -> Result<Option<Enrollment>, RepositoryError> {
        let guard = self.inner.lock().unwrap();
        match guard.get(enrollment_id) {
            None => Ok(None),
            Some(snapshot) => Enrollment::rehydrate(snapshot.clone())
                .map(Some)
                .map_err(|err| RepositoryError::Storage(err.to_string())),
        }
    }

    fn save(&self, enrollment: &Enrollment) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().unwrap();
        let mut snapshot = enrollment.snapshot();

        if let Some(stored) = guard.get(enrollment.id()) {
            ExpectedVersion::Exact(stored.version)
                .check(enrollment.version())
                .map_err(|_| RepositoryError::VersionConflict {
                    enrollment_id: snapshot.id.clone(),
                    expected: enrollment.version(),
                    stored: stored.version,
                })?;
            snapshot.version = stored.version + 1;
        }

        guard.insert(snapshot.id.clone(), snapshot);
        Ok(())
    }
}
