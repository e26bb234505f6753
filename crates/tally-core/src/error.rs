//! Error types for the Tally system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TallyError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TallyError {
    /// Whether the error stems from caller input rather than a fault in
    /// the system (a 4xx-class response at the HTTP layer).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TallyError::NotFound { .. }
                | TallyError::AlreadyExists { .. }
                | TallyError::AuthorizationDenied { .. }
                | TallyError::Validation { .. }
        )
    }
}

pub type TallyResult<T> = Result<T, TallyError>;
