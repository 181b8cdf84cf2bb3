use std::fmt;
use std::sync::Arc;

use tracing::debug;
use ugm_db::{Session, TxMode};

use super::error::DomainError;
use super::password::PasswordHasher;
use super::repo::PrincipalsRepository;
use crate::config::UgmConfig;

/// State shared by the UGM root, its collections and every node handed out
/// for one unit of work.
pub struct UgmCtx {
    pub session: Arc<Session>,
    pub repo: Arc<dyn PrincipalsRepository>,
    pub config: UgmConfig,
    pub tx_mode: TxMode,
    pub hasher: PasswordHasher,
}

impl fmt::Debug for UgmCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UgmCtx")
            .field("session", &self.session)
            .field("config", &self.config)
            .field("tx_mode", &self.tx_mode)
            .finish_non_exhaustive()
    }
}

impl UgmCtx {
    #[must_use]
    pub fn new(
        session: Arc<Session>,
        repo: Arc<dyn PrincipalsRepository>,
        config: UgmConfig,
        tx_mode: TxMode,
    ) -> Self {
        let hasher = PasswordHasher::new(config.salt_len);
        Self {
            session,
            repo,
            config,
            tx_mode,
            hasher,
        }
    }

    /// Flush or commit, depending on the commit policy at this moment.
    ///
    /// # Errors
    /// Propagates the session error.
    pub async fn apply(&self) -> Result<(), DomainError> {
        debug!(
            transaction_managed = self.tx_mode.is_transaction_managed(),
            "applying pending changes"
        );
        self.session.apply(&self.tx_mode).await?;
        Ok(())
    }
}
