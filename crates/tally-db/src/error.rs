//! Database-specific error types and conversions.

use tally_core::error::TallyError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity}")]
    AlreadyExists { entity: String },
}

impl DbError {
    /// Classify a statement error returned by `Response::check`.
    ///
    /// Unique-index violations become [`DbError::AlreadyExists`]; anything
    /// else is reported as a failed query.
    pub(crate) fn from_check(entity: &str, err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") {
            DbError::AlreadyExists {
                entity: entity.into(),
            }
        } else {
            DbError::Query(message)
        }
    }
}

impl From<DbError> for TallyError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => TallyError::NotFound { entity, id },
            DbError::AlreadyExists { entity } => TallyError::AlreadyExists { entity },
            other => TallyError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_domain_not_found() {
        let err: TallyError = DbError::NotFound {
            entity: "role".into(),
            id: "x".into(),
        }
        .into();
        assert!(matches!(err, TallyError::NotFound { .. }));
    }

    #[test]
    fn corrupt_record_maps_to_database_error() {
        let err: TallyError = DbError::Corrupt("bad uuid".into()).into();
        assert!(matches!(err, TallyError::Database(_)));
    }
}
