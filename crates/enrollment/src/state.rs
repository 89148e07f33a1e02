use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;

use matricula_core::DomainError;

/// Enrollment lifecycle states.
///
/// `Concluded` and `Cancelled` are terminal: no further transition is
/// permitted out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentState {
    Active,
    Suspended,
    Concluded,
    Cancelled,
}

impl EnrollmentState {
    pub const ALL: [EnrollmentState; 4] = [
        EnrollmentState::Active,
        EnrollmentState::Suspended,
        EnrollmentState::Concluded,
        EnrollmentState::Cancelled,
    ];

    /// Canonical lowercase string, as persisted and exposed in error details.
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentState::Active => "active",
            EnrollmentState::Suspended => "suspended",
            EnrollmentState::Concluded => "concluded",
            EnrollmentState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, EnrollmentState::Concluded | EnrollmentState::Cancelled)
    }
}

impl core::fmt::Display for EnrollmentState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EnrollmentState::Active),
            "suspended" => Ok(EnrollmentState::Suspended),
            "concluded" => Ok(EnrollmentState::Concluded),
            "cancelled" => Ok(EnrollmentState::Cancelled),
            other => Err(DomainError::validation_with(
                "invalid_state",
                "Enrollment state is invalid",
                json!({"state": other}),
            )),
        }
    }
}
