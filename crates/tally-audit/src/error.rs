//! Audit error types.

use tally_core::error::TallyError;

/// Reasons an audit entry is discarded or a maintenance call is refused.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit entry is missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("retention of {days} days is out of range")]
    RetentionOutOfRange { days: u32 },
}

impl From<AuditError> for TallyError {
    fn from(err: AuditError) -> Self {
        TallyError::Validation {
            message: err.to_string(),
        }
    }
}
