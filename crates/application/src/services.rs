//! Enrollment use cases.

use chrono::{DateTime, Utc};

use matricula_core::DomainResult;
use matricula_enrollment::{ConclusionVerdict, Enrollment};

use crate::error::ApplicationError;
use crate::ports::EnrollmentRepository;
use crate::result::ApplicationResult;

/// Application service wrapping the four enrollment commands.
///
/// Each use case loads the aggregate, delegates the business decision to the
/// domain, persists only when the state actually changed and then drains the
/// event buffer for publication. Idempotent no-ops skip persistence entirely.
pub struct EnrollmentService<R: EnrollmentRepository> {
    repo: R,
}

impl<R: EnrollmentRepository> EnrollmentService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn conclude(
        &self,
        enrollment_id: &str,
        actor_id: &str,
        verdict: &ConclusionVerdict,
        occurred_at: Option<DateTime<Utc>>,
        justification: Option<&str>,
    ) -> Result<ApplicationResult, ApplicationError> {
        self.execute(enrollment_id, "conclude", |enrollment| {
            enrollment.conclude(actor_id, verdict, occurred_at, justification)
        })
    }

    pub fn cancel(
        &self,
        enrollment_id: &str,
        actor_id: &str,
        justification: &str,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Result<ApplicationResult, ApplicationError> {
        self.execute(enrollment_id, "cancel", |enrollment| {
            enrollment.cancel(actor_id, justification, occurred_at)
        })
    }

    pub fn suspend(
        &self,
        enrollment_id: &str,
        actor_id: &str,
        justification: &str,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Result<ApplicationResult, ApplicationError> {
        self.execute(enrollment_id, "suspend", |enrollment| {
            enrollment.suspend(actor_id, justification, occurred_at)
        })
    }

    pub fn reactivate(
        &self,
        enrollment_id: &str,
        actor_id: &str,
        justification: &str,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Result<ApplicationResult, ApplicationError> {
        self.execute(enrollment_id, "reactivate", |enrollment| {
            enrollment.reactivate(actor_id, justification, occurred_at)
        })
    }

    fn execute<F>(
        &self,
        enrollment_id: &str,
        action: &'static str,
        command: F,
    ) -> Result<ApplicationResult, ApplicationError>
    where
        F: FnOnce(&mut Enrollment) -> DomainResult<()>,
    {
        let mut enrollment = self
            .repo
            .get_by_id(enrollment_id)?
            .ok_or_else(|| ApplicationError::enrollment_not_found(enrollment_id))?;

        let before_state = enrollment.state();
        command(&mut enrollment).inspect_err(|err| {
            tracing::warn!(enrollment_id, action, code = err.code(), "command rejected");
        })?;

        if enrollment.state() == before_state {
            tracing::debug!(enrollment_id, action, "no state change");
            return Ok(ApplicationResult::Unchanged {
                aggregate_id: enrollment.id().to_string(),
            });
        }

        self.repo.save(&enrollment)?;
        let events = enrollment.pull_domain_events();
        tracing::info!(
            enrollment_id,
            action,
            from = before_state.as_str(),
            to = enrollment.state().as_str(),
            events = events.len(),
            "enrollment transitioned"
        );

        Ok(ApplicationResult::Changed {
            aggregate_id: enrollment.id().to_string(),
            new_state: enrollment.state(),
            events,
        })
    }
}
