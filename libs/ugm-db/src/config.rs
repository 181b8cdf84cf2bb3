//! Connection configuration.

use serde::{Deserialize, Serialize};

/// Database section of the application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DbConfig {
    /// Connection URL, e.g. `sqlite::memory:` or `postgres://user@host/db`.
    pub url: String,

    pub max_conns: Option<u32>,

    pub min_conns: Option<u32>,

    /// Initial commit policy. `None` falls back to the `UGM_SQL_USE_TM`
    /// environment variable.
    pub use_tm: Option<bool>,

    /// Emit sqlx statement logs.
    pub sqlx_logging: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_owned(),
            max_conns: Some(1),
            min_conns: Some(1),
            use_tm: None,
            sqlx_logging: false,
        }
    }
}

impl DbConfig {
    #[must_use]
    pub fn connect_opts(&self) -> ConnectOpts {
        ConnectOpts {
            max_conns: self.max_conns,
            min_conns: self.min_conns,
            sqlx_logging: self.sqlx_logging,
        }
    }
}

/// Pool options passed to [`crate::connect_db`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectOpts {
    pub max_conns: Option<u32>,
    pub min_conns: Option<u32>,
    pub sqlx_logging: bool,
}
