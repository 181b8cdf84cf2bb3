//! Unit-of-work session.
//!
//! A [`Session`] owns one pooled connection handle and at most one open
//! transaction. The transaction is begun lazily by [`Session::runner`]; every
//! statement of the unit of work runs inside it, so writes are visible to later
//! reads of the same session immediately.
//!
//! ```text
//!  dirty ──apply(TransactionManaged)──▶ flushed-pending ──rollback──▶ discarded
//!    │
//!    └────apply(SelfManaged)─────────▶ committed-durable
//! ```

use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sea_orm::{DatabaseConnection, DatabaseTransaction, DbBackend, TransactionTrait};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::DbError;

/// Environment variable holding the initial commit policy (`"1"` selects
/// transaction-managed mode).
pub const USE_TM_ENV: &str = "UGM_SQL_USE_TM";

/// Shared flush-vs-commit policy.
///
/// Clones share the same flag. Consumers must call
/// [`TxMode::is_transaction_managed`] at the moment they apply, never cache
/// the answer.
#[derive(Debug, Clone, Default)]
pub struct TxMode(Arc<AtomicBool>);

impl TxMode {
    #[must_use]
    pub fn transaction_managed() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    #[must_use]
    pub fn self_managed() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Resolve from [`USE_TM_ENV`]; anything other than `"1"` is self-managed.
    #[must_use]
    pub fn from_env() -> Self {
        let managed = env::var(USE_TM_ENV).is_ok_and(|v| v == "1");
        Self(Arc::new(AtomicBool::new(managed)))
    }

    /// Explicit setting wins, environment otherwise.
    #[must_use]
    pub fn resolve(explicit: Option<bool>) -> Self {
        match explicit {
            Some(true) => Self::transaction_managed(),
            Some(false) => Self::self_managed(),
            None => Self::from_env(),
        }
    }

    #[must_use]
    pub fn is_transaction_managed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set_transaction_managed(&self, managed: bool) {
        self.0.store(managed, Ordering::SeqCst);
    }
}

/// Database session for one unit of work.
pub struct Session {
    conn: DatabaseConnection,
    tx: Mutex<Option<DatabaseTransaction>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Session {
    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self {
            conn,
            tx: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn backend(&self) -> DbBackend {
        use sea_orm::ConnectionTrait;
        self.conn.get_database_backend()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Whether a transaction is currently open.
    pub async fn in_transaction(&self) -> bool {
        self.tx.lock().await.is_some()
    }

    /// Borrow the open transaction, beginning one if needed.
    ///
    /// The guard must be dropped before calling any other session method;
    /// holding it across another `runner()` call on the same session
    /// deadlocks.
    ///
    /// # Errors
    /// Returns [`DbError::SessionClosed`] after [`Session::close`], or the
    /// backend error raised while beginning the transaction.
    pub async fn runner(&self) -> Result<MappedMutexGuard<'_, DatabaseTransaction>, DbError> {
        if self.is_closed() {
            return Err(DbError::SessionClosed);
        }
        let mut guard = self.tx.lock().await;
        if guard.is_none() {
            debug!("beginning transaction");
            *guard = Some(self.conn.begin().await?);
        }
        MutexGuard::try_map(guard, Option::as_mut).map_err(|_| DbError::SessionClosed)
    }

    /// Push pending changes to the backend without ending the transaction.
    ///
    /// Statements are executed eagerly inside the open transaction, so there
    /// is nothing left to send; this only marks the flush point.
    ///
    /// # Errors
    /// Returns [`DbError::SessionClosed`] after [`Session::close`].
    pub async fn flush(&self) -> Result<(), DbError> {
        if self.is_closed() {
            return Err(DbError::SessionClosed);
        }
        let open = self.in_transaction().await;
        debug!(open_transaction = open, "flush");
        Ok(())
    }

    /// Durably end the open transaction. The next statement begins a new one.
    ///
    /// # Errors
    /// Returns the backend commit error, or [`DbError::SessionClosed`].
    pub async fn commit(&self) -> Result<(), DbError> {
        if self.is_closed() {
            return Err(DbError::SessionClosed);
        }
        let tx = self.tx.lock().await.take();
        if let Some(tx) = tx {
            tx.commit().await?;
            info!("transaction committed");
        } else {
            debug!("commit without open transaction");
        }
        Ok(())
    }

    /// Discard the open transaction, if any.
    ///
    /// # Errors
    /// Returns the backend rollback error, or [`DbError::SessionClosed`].
    pub async fn rollback(&self) -> Result<(), DbError> {
        if self.is_closed() {
            return Err(DbError::SessionClosed);
        }
        let tx = self.tx.lock().await.take();
        if let Some(tx) = tx {
            tx.rollback().await?;
            info!("transaction rolled back");
        }
        Ok(())
    }

    /// Flush under transaction-managed mode, commit otherwise.
    ///
    /// # Errors
    /// Propagates the errors of [`Session::flush`] and [`Session::commit`].
    pub async fn apply(&self, mode: &TxMode) -> Result<(), DbError> {
        if mode.is_transaction_managed() {
            self.flush().await
        } else {
            self.commit().await
        }
    }

    /// Roll back anything uncommitted and refuse further use.
    ///
    /// Closing twice is a no-op.
    ///
    /// # Errors
    /// Returns the backend rollback error.
    pub async fn close(&self) -> Result<(), DbError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let tx = self.tx.lock().await.take();
        if let Some(tx) = tx {
            debug!("closing session with open transaction, rolling back");
            tx.rollback().await?;
        }
        debug!("session closed");
        Ok(())
    }
}
