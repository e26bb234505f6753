//! Authorization error types.

use tally_core::error::TallyError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("system role '{name}' cannot be deleted")]
    SystemRoleDeletion { name: String },

    #[error("system role '{name}' cannot be renamed")]
    SystemRoleRename { name: String },

    #[error("role name must not be empty")]
    EmptyRoleName,

    #[error("role name '{name}' is reserved for a system role")]
    ReservedRoleName { name: String },

    #[error("unknown permission ids: {0:?}")]
    UnknownPermissions(Vec<Uuid>),
}

impl From<AuthzError> for TallyError {
    fn from(err: AuthzError) -> Self {
        TallyError::Validation {
            message: err.to_string(),
        }
    }
}
