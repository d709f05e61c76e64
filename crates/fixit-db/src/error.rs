//! Database-specific error types and conversions.

use fixit_core::error::FixItError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Stored record is corrupt: {0}")]
    Corrupt(String),
}

impl From<DbError> for FixItError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => FixItError::NotFound { entity, id },
            DbError::Corrupt(_) => FixItError::Internal(err.to_string()),
            other => FixItError::Database(other.to_string()),
        }
    }
}
