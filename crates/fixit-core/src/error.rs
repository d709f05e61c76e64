//! Error types for the FixItNow ticket engine.
//!
//! Every variant except the infrastructure ones (`Database`, `Storage`,
//! `Internal`) is an expected outcome that the HTTP layer shows to the
//! end user verbatim.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixItError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("{reason}")]
    Unauthorized { reason: String },

    #[error("{reason}")]
    Forbidden { reason: String },

    #[error("Cannot transition from {from} to {to} with your role")]
    InvalidTransition {
        from: String,
        to: String,
        role: String,
    },

    #[error("User is not associated with a building")]
    MissingBuilding,

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Ticket {id} was modified concurrently, please retry")]
    Conflict { id: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FixItError {
    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        FixItError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// HTTP status code the route layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            FixItError::NotFound { .. } => 404,
            FixItError::Unauthorized { .. } => 401,
            FixItError::Forbidden { .. } => 403,
            FixItError::InvalidTransition { .. }
            | FixItError::MissingBuilding
            | FixItError::Validation { .. } => 400,
            FixItError::Conflict { .. } => 409,
            FixItError::Database(_) | FixItError::Storage(_) | FixItError::Internal(_) => 500,
        }
    }

    /// Whether this is a business outcome rather than an infrastructure
    /// failure.
    pub fn is_expected(&self) -> bool {
        self.status_code() < 500
    }

    /// Message safe to return to the end user. Infrastructure failures
    /// carry no detail.
    pub fn public_message(&self) -> String {
        if self.is_expected() {
            self.to_string()
        } else {
            "Internal server error".into()
        }
    }
}

pub type FixItResult<T> = Result<T, FixItError>;
