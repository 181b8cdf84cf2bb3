//! Root of the UGM tree: the `users` and `groups` collections plus role
//! helpers that work on either kind of principal.

use std::sync::Arc;

use async_trait::async_trait;
use sql_ugm_sdk::{PrincipalKind, PrincipalRef};
use tracing::debug;
use ugm_db::{Session, TxMode};

use super::context::UgmCtx;
use super::error::DomainError;
use super::node::{Group, PrincipalNode, User};
use super::principals::{Groups, Users};
use super::repo::PrincipalsRepository;
use crate::config::UgmConfig;
use crate::infra::storage::SeaOrmPrincipalsRepository;

pub const USERS_KEY: &str = "users";
pub const GROUPS_KEY: &str = "groups";

/// A child of the root, as returned by [`Ugm::get`].
#[derive(Debug, Clone, Copy)]
pub enum UgmChild<'a> {
    Users(&'a Users),
    Groups(&'a Groups),
}

/// Either kind of principal, for callers that only deal with roles.
#[derive(Debug)]
pub enum Principal {
    User(User),
    Group(Group),
}

#[async_trait]
impl PrincipalNode for Principal {
    fn kind(&self) -> PrincipalKind {
        match self {
            Self::User(u) => u.kind(),
            Self::Group(g) => g.kind(),
        }
    }

    fn id(&self) -> &str {
        match self {
            Self::User(u) => PrincipalNode::id(u),
            Self::Group(g) => PrincipalNode::id(g),
        }
    }

    fn own_roles(&self) -> Vec<String> {
        match self {
            Self::User(u) => u.own_roles(),
            Self::Group(g) => g.own_roles(),
        }
    }

    async fn load_own_roles(&mut self) -> Result<Vec<String>, DomainError> {
        match self {
            Self::User(u) => u.load_own_roles().await,
            Self::Group(g) => g.load_own_roles().await,
        }
    }

    async fn set_own_roles(&mut self, roles: Vec<String>) -> Result<(), DomainError> {
        match self {
            Self::User(u) => u.set_own_roles(roles).await,
            Self::Group(g) => g.set_own_roles(roles).await,
        }
    }

    async fn roles(&self) -> Result<Vec<String>, DomainError> {
        match self {
            Self::User(u) => u.roles().await,
            Self::Group(g) => g.roles().await,
        }
    }
}

#[derive(Debug)]
pub struct Ugm {
    ctx: Arc<UgmCtx>,
    users: Users,
    groups: Groups,
}

impl Ugm {
    /// Root backed by the `SeaORM` repository.
    #[must_use]
    pub fn new(session: Arc<Session>, config: UgmConfig, tx_mode: TxMode) -> Self {
        Self::with_repository(
            session,
            Arc::new(SeaOrmPrincipalsRepository::new()),
            config,
            tx_mode,
        )
    }

    #[must_use]
    pub fn with_repository(
        session: Arc<Session>,
        repo: Arc<dyn PrincipalsRepository>,
        config: UgmConfig,
        tx_mode: TxMode,
    ) -> Self {
        let ctx = Arc::new(UgmCtx::new(session, repo, config, tx_mode));
        Self {
            users: Users::new(Arc::clone(&ctx)),
            groups: Groups::new(Arc::clone(&ctx)),
            ctx,
        }
    }

    #[must_use]
    pub fn users(&self) -> &Users {
        &self.users
    }

    #[must_use]
    pub fn groups(&self) -> &Groups {
        &self.groups
    }

    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.ctx.session
    }

    #[must_use]
    pub fn tx_mode(&self) -> &TxMode {
        &self.ctx.tx_mode
    }

    /// Load the principal a reference points at.
    ///
    /// # Errors
    /// `NotFound` for an unknown principal.
    pub async fn principal(&self, reference: &PrincipalRef) -> Result<Principal, DomainError> {
        match reference.kind {
            PrincipalKind::User => self.users.get(&reference.id).await.map(Principal::User),
            PrincipalKind::Group => self.groups.get(&reference.id).await.map(Principal::Group),
        }
    }

    /// # Errors
    /// Backend failures.
    #[allow(clippy::unused_self)] // Role helpers live on the root next to the collections
    pub async fn add_role<P>(&self, role: &str, principal: &mut P) -> Result<(), DomainError>
    where
        P: PrincipalNode + ?Sized,
    {
        principal.add_role(role).await
    }

    /// # Errors
    /// Backend failures.
    #[allow(clippy::unused_self)] // Role helpers live on the root next to the collections
    pub async fn remove_role<P>(&self, role: &str, principal: &mut P) -> Result<(), DomainError>
    where
        P: PrincipalNode + ?Sized,
    {
        principal.remove_role(role).await
    }

    /// # Errors
    /// Backend failures.
    #[allow(clippy::unused_self)] // Role helpers live on the root next to the collections
    pub async fn roles<P>(&self, principal: &P) -> Result<Vec<String>, DomainError>
    where
        P: PrincipalNode + ?Sized,
    {
        principal.roles().await
    }

    /// # Errors
    /// Backend failures.
    pub async fn apply(&self) -> Result<(), DomainError> {
        self.ctx.apply().await
    }

    /// # Errors
    /// `NotFound` for anything but `users` and `groups`.
    pub fn get(&self, name: &str) -> Result<UgmChild<'_>, DomainError> {
        match name {
            USERS_KEY => Ok(UgmChild::Users(&self.users)),
            GROUPS_KEY => Ok(UgmChild::Groups(&self.groups)),
            other => Err(DomainError::NotFound {
                kind: "collection",
                id: other.to_owned(),
            }),
        }
    }

    #[must_use]
    #[allow(clippy::unused_self)] // Mapping-style API; the keys are fixed
    pub fn keys(&self) -> [&'static str; 2] {
        [USERS_KEY, GROUPS_KEY]
    }

    /// # Errors
    /// Always `Unsupported`; the root's children are fixed.
    #[allow(clippy::unused_self)] // Mapping-style API; the keys are fixed
    pub fn insert(&self, name: &str) -> Result<(), DomainError> {
        Err(DomainError::unsupported(format!(
            "cannot add '{name}' to the ugm root"
        )))
    }

    /// # Errors
    /// Always `Unsupported`; the root's children are fixed.
    #[allow(clippy::unused_self)] // Mapping-style API; the keys are fixed
    pub fn remove(&self, name: &str) -> Result<(), DomainError> {
        Err(DomainError::unsupported(format!(
            "cannot remove '{name}' from the ugm root"
        )))
    }

    /// Drop cached state of one child, or of both with `None`.
    ///
    /// # Errors
    /// `NotFound` for an unknown key.
    pub fn invalidate(&self, key: Option<&str>) -> Result<(), DomainError> {
        match key {
            None => {
                self.users.invalidate();
                self.groups.invalidate();
            }
            Some(name) => match self.get(name)? {
                UgmChild::Users(users) => users.invalidate(),
                UgmChild::Groups(groups) => groups.invalidate(),
            },
        }
        debug!(?key, "ugm invalidated");
        Ok(())
    }
}
