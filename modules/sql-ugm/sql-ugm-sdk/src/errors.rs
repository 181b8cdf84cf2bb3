use thiserror::Error;

use crate::models::PrincipalKind;

/// Errors surfaced to callers of [`crate::UgmClientV1`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UgmError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The backend failed a statement, e.g. a broken connection or a
    /// constraint the engine did not anticipate.
    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl UgmError {
    #[must_use]
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn principal_not_found(kind: PrincipalKind, id: &str) -> Self {
        Self::not_found(kind.as_str(), id)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
