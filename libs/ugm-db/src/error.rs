use thiserror::Error;

/// Errors raised by session handling and migrations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sea(#[from] sea_orm::DbErr),

    #[error("session is closed")]
    SessionClosed,

    #[error("invalid database configuration: {0}")]
    InvalidConfig(String),

    #[error("migration '{name}' failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: sea_orm::DbErr,
    },

    #[error("query build failed: {0}")]
    Query(String),
}
