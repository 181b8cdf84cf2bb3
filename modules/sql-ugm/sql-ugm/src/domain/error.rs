use sql_ugm_sdk::{PrincipalKind, UgmError};
use ugm_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl DomainError {
    #[must_use]
    pub fn principal_not_found(kind: PrincipalKind, id: &str) -> Self {
        Self::NotFound {
            kind: kind.as_str(),
            id: id.to_owned(),
        }
    }

    #[must_use]
    pub fn membership_not_found(group_id: &str, user_id: &str) -> Self {
        Self::NotFound {
            kind: "membership",
            id: format!("{user_id} in {group_id}"),
        }
    }

    #[must_use]
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::InvalidCredentials(message.into())
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::Database(DbError::Sea(e))
    }
}

impl From<DomainError> for UgmError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound { kind, id } => Self::not_found(kind, id),
            DomainError::InvalidCredentials(msg) => Self::InvalidCredentials(msg),
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::Unsupported(msg) => Self::Unsupported(msg),
            DomainError::Internal(msg) => Self::Internal(msg),
            DomainError::Database(e @ (DbError::SessionClosed | DbError::InvalidConfig(_))) => {
                Self::internal(e.to_string())
            }
            DomainError::Database(e) => {
                tracing::error!(error = %e, "database failure surfaced to client");
                Self::database(e.to_string())
            }
        }
    }
}
