//! Session factory and connection setup.

use std::future::Future;
use std::sync::Arc;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use tracing::{debug, info, warn};

use crate::config::{ConnectOpts, DbConfig};
use crate::error::DbError;
use crate::session::{Session, TxMode};

/// Callback run for every newly opened session.
pub type SetupHandler = Arc<dyn Fn(&Session) + Send + Sync>;

/// Open a connection pool.
///
/// # Errors
/// Returns [`DbError::InvalidConfig`] for an empty URL or the backend error
/// raised while connecting.
pub async fn connect_db(url: &str, opts: ConnectOpts) -> Result<DatabaseConnection, DbError> {
    if url.trim().is_empty() {
        return Err(DbError::InvalidConfig("database url is empty".to_owned()));
    }

    let mut options = ConnectOptions::new(url.to_owned());
    if let Some(max) = opts.max_conns {
        options.max_connections(max);
    }
    if let Some(min) = opts.min_conns {
        options.min_connections(min);
    }
    options.sqlx_logging(opts.sqlx_logging);

    let conn = Database::connect(options).await?;
    info!(engine = ?conn.get_database_backend(), "database connected");
    Ok(conn)
}

/// Hands out one [`Session`] per unit of work.
#[derive(Clone)]
pub struct SessionFactory {
    conn: DatabaseConnection,
    tx_mode: TxMode,
    handlers: Vec<SetupHandler>,
}

impl std::fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("tx_mode", &self.tx_mode)
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

impl SessionFactory {
    #[must_use]
    pub fn new(conn: DatabaseConnection, tx_mode: TxMode) -> Self {
        Self {
            conn,
            tx_mode,
            handlers: Vec::new(),
        }
    }

    /// Connect according to `cfg` and resolve the commit policy.
    ///
    /// # Errors
    /// See [`connect_db`].
    pub async fn connect(cfg: &DbConfig) -> Result<Self, DbError> {
        let conn = connect_db(&cfg.url, cfg.connect_opts()).await?;
        let tx_mode = TxMode::resolve(cfg.use_tm);
        debug!(
            transaction_managed = tx_mode.is_transaction_managed(),
            "session factory ready"
        );
        Ok(Self::new(conn, tx_mode))
    }

    /// Register a callback invoked with every session this factory opens.
    #[must_use]
    pub fn with_setup_handler(mut self, handler: SetupHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Shared commit policy handle.
    #[must_use]
    pub fn tx_mode(&self) -> TxMode {
        self.tx_mode.clone()
    }

    /// Pool handle for privileged setup such as migrations.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Open a new session and run the setup handlers on it.
    #[must_use]
    pub fn open(&self) -> Arc<Session> {
        let session = Session::new(self.conn.clone());
        for handler in &self.handlers {
            handler(&session);
        }
        Arc::new(session)
    }

    /// Run `f` with a fresh session and close it afterwards, on success and
    /// on error alike.
    ///
    /// Anything `f` did not commit is rolled back by the close.
    ///
    /// # Errors
    /// Returns the error of `f`; a close failure is returned only when `f`
    /// succeeded.
    pub async fn scoped<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(Arc<Session>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<DbError>,
    {
        let session = self.open();
        let result = f(Arc::clone(&session)).await;
        let closed = session.close().await;
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!(error = %close_err, "session close failed after unit of work error");
                Err(e)
            }
        }
    }
}
