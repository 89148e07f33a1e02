//! `matricula-application` — use-case orchestration around the Enrollment
//! aggregate.
//!
//! Each use case follows the same shape: load the aggregate through the
//! repository port, invoke one command, persist and drain events when the
//! state changed, report an unchanged outcome otherwise. Business rules live
//! in the domain; this layer only sequences them.

pub mod error;
pub mod memory;
pub mod ports;
pub mod result;
pub mod services;

pub use error::ApplicationError;
pub use memory::InMemoryEnrollmentRepository;
pub use ports::{EnrollmentRepository, RepositoryError};
pub use result::ApplicationResult;
pub use services::EnrollmentService;
