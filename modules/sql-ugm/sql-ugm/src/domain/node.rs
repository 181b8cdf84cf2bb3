//! User and group views over loaded records.
//!
//! A node holds a snapshot of its record. Writes go straight into the
//! session's open transaction and touch only what they change: a column write
//! sets that one column, and `data` or the role list is re-read from the
//! session before being rewritten. Several views of one principal therefore
//! see each other's writes. A failed write leaves the snapshot untouched.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::entity::prelude::Json;
use sql_ugm_sdk::{AttrMap, AttrValue, PrincipalKind};
use tracing::{debug, info};

use super::attributes::{self, Written};
use super::context::UgmCtx;
use super::error::DomainError;
use super::principals::Users;
use super::stored::StoredRow;
use crate::infra::storage::entity::{group, principal, user};
use crate::infra::storage::record::{PrincipalRecord, PrincipalRow, role_names};

/// Role handling shared by users and groups.
#[async_trait]
pub trait PrincipalNode: Send + Sync {
    fn kind(&self) -> PrincipalKind;

    fn id(&self) -> &str;

    /// Roles assigned directly to this principal, as of the last load.
    fn own_roles(&self) -> Vec<String>;

    /// Re-read the own roles from the session.
    ///
    /// # Errors
    /// `NotFound` when the principal was deleted meanwhile.
    async fn load_own_roles(&mut self) -> Result<Vec<String>, DomainError>;

    /// Replace the own roles.
    ///
    /// # Errors
    /// Backend failures.
    async fn set_own_roles(&mut self, roles: Vec<String>) -> Result<(), DomainError>;

    /// Effective roles, recomputed on every call.
    ///
    /// # Errors
    /// Backend failures.
    async fn roles(&self) -> Result<Vec<String>, DomainError>;

    /// Add `role`. An already present role still rewrites the column.
    ///
    /// # Errors
    /// Backend failures.
    async fn add_role(&mut self, role: &str) -> Result<(), DomainError> {
        let mut roles = self.load_own_roles().await?;
        if !roles.iter().any(|r| r == role) {
            roles.push(role.to_owned());
        }
        self.set_own_roles(roles).await
    }

    /// Remove `role`; an absent role is ignored.
    ///
    /// # Errors
    /// Backend failures.
    async fn remove_role(&mut self, role: &str) -> Result<(), DomainError> {
        let roles = self.load_own_roles().await?;
        if !roles.iter().any(|r| r == role) {
            return Ok(());
        }
        self.set_own_roles(roles.into_iter().filter(|r| r != role).collect())
            .await
    }
}

/// View over one principal record.
pub struct Node<T> {
    ctx: Arc<UgmCtx>,
    record: PrincipalRecord<T>,
}

pub type User = Node<user::Model>;
pub type Group = Node<group::Model>;

impl<T: PrincipalRow> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &T::KIND)
            .field("id", &self.record.id())
            .field("guid", &self.record.guid())
            .finish_non_exhaustive()
    }
}

impl<T: StoredRow> Node<T> {
    pub(super) fn new(ctx: Arc<UgmCtx>, record: PrincipalRecord<T>) -> Self {
        Self { ctx, record }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        self.record.id()
    }

    #[must_use]
    pub fn guid(&self) -> &str {
        self.record.guid()
    }

    #[must_use]
    pub fn record(&self) -> &PrincipalRecord<T> {
        &self.record
    }

    /// # Errors
    /// `Internal` when a stored binary attribute is corrupt.
    pub fn attr(&self, name: &str) -> Result<AttrValue, DomainError> {
        attributes::get(&self.ctx.config, &self.record, name)
    }

    #[must_use]
    pub fn attr_names(&self) -> Vec<String> {
        attributes::names(T::configured_attrs(&self.ctx.config), &self.record)
    }

    /// Every exposed attribute.
    ///
    /// # Errors
    /// `Internal` when a stored binary attribute is corrupt.
    pub fn attrs(&self) -> Result<AttrMap, DomainError> {
        attributes::select(&self.ctx.config, &self.record, &self.attr_names())
    }

    /// Write one attribute into the open transaction.
    ///
    /// # Errors
    /// - `Unsupported` for technical columns and `created`
    /// - `Validation` when the value does not fit the attribute
    pub async fn set_attr(
        &mut self,
        name: &str,
        value: impl Into<AttrValue> + Send,
    ) -> Result<(), DomainError> {
        let mut next = self.record.clone();
        next.principal = self.load_principal().await?;
        match attributes::set(&self.ctx.config, &mut next, name, value.into())? {
            Written::Principal => {
                self.ctx
                    .repo
                    .update_data(&self.ctx.session, next.guid(), &next.principal.data)
                    .await?;
            }
            Written::Row => next.row.write_column(&self.ctx, name).await?,
        }
        debug!(id = %next.id(), attr = name, "attribute written");
        self.record = next;
        Ok(())
    }

    async fn load_principal(&self) -> Result<principal::Model, DomainError> {
        self.ctx
            .repo
            .find_principal(&self.ctx.session, self.guid())
            .await?
            .ok_or_else(|| DomainError::principal_not_found(T::KIND, self.id()))
    }

    async fn reload_own_roles(&mut self) -> Result<Vec<String>, DomainError> {
        self.record.principal = self.load_principal().await?;
        Ok(self.record.own_roles())
    }

    async fn write_own_roles(&mut self, roles: Vec<String>) -> Result<(), DomainError> {
        let roles = Json::Array(roles.into_iter().map(Json::String).collect());
        self.ctx
            .repo
            .update_roles(&self.ctx.session, self.guid(), &roles)
            .await?;
        self.record.principal.principal_roles = roles;
        Ok(())
    }

    /// Reload the snapshot.
    ///
    /// # Errors
    /// `NotFound` when the record was deleted meanwhile.
    pub async fn refresh(&mut self) -> Result<(), DomainError> {
        self.record = T::find(&self.ctx, self.record.id())
            .await?
            .ok_or_else(|| DomainError::principal_not_found(T::KIND, self.record.id()))?;
        Ok(())
    }

    /// Flush or commit according to the commit policy.
    ///
    /// # Errors
    /// Backend failures.
    pub async fn apply(&self) -> Result<(), DomainError> {
        self.ctx.apply().await
    }
}

impl User {
    /// Ids of the groups this user belongs to, ordered by id.
    ///
    /// # Errors
    /// Backend failures.
    pub async fn group_ids(&self) -> Result<Vec<String>, DomainError> {
        let groups = self
            .ctx
            .repo
            .groups_of_user(&self.ctx.session, self.guid())
            .await?;
        Ok(groups.into_iter().map(|g| g.row.id).collect())
    }

    /// # Errors
    /// Backend failures.
    pub async fn groups(&self) -> Result<Vec<Group>, DomainError> {
        let groups = self
            .ctx
            .repo
            .groups_of_user(&self.ctx.session, self.guid())
            .await?;
        Ok(groups
            .into_iter()
            .map(|record| Node::new(Arc::clone(&self.ctx), record))
            .collect())
    }

    /// # Errors
    /// Backend failures.
    pub async fn authenticate(&self, password: &str) -> Result<bool, DomainError> {
        Users::new(Arc::clone(&self.ctx))
            .authenticate(self.id(), password)
            .await
    }

    /// Change this user's password and reload the snapshot.
    ///
    /// # Errors
    /// `InvalidCredentials` when `old` does not verify.
    pub async fn passwd(&mut self, old: Option<&str>, new: &str) -> Result<(), DomainError> {
        Users::new(Arc::clone(&self.ctx))
            .passwd(self.record.id(), old, new)
            .await?;
        self.refresh().await
    }
}

impl Group {
    /// Ids of the members, ordered by id.
    ///
    /// # Errors
    /// Backend failures.
    pub async fn member_ids(&self) -> Result<Vec<String>, DomainError> {
        let members = self
            .ctx
            .repo
            .members_of_group(&self.ctx.session, self.guid())
            .await?;
        Ok(members.into_iter().map(|u| u.row.id).collect())
    }

    /// # Errors
    /// Backend failures.
    pub async fn users(&self) -> Result<Vec<User>, DomainError> {
        let members = self
            .ctx
            .repo
            .members_of_group(&self.ctx.session, self.guid())
            .await?;
        Ok(members
            .into_iter()
            .map(|record| Node::new(Arc::clone(&self.ctx), record))
            .collect())
    }

    async fn user_record(
        &self,
        user_id: &str,
    ) -> Result<PrincipalRecord<user::Model>, DomainError> {
        user::Model::find(&self.ctx, user_id)
            .await?
            .ok_or_else(|| DomainError::principal_not_found(PrincipalKind::User, user_id))
    }

    /// Add a member. Adding an existing member is a no-op.
    ///
    /// # Errors
    /// `NotFound` for an unknown user.
    pub async fn add(&self, user_id: &str) -> Result<(), DomainError> {
        let user = self.user_record(user_id).await?;
        let added = self
            .ctx
            .repo
            .add_assignment(&self.ctx.session, self.guid(), user.guid())
            .await?;
        if added {
            info!(group = %self.id(), user = %user_id, "member added");
        }
        Ok(())
    }

    /// The member `user_id`.
    ///
    /// # Errors
    /// `NotFound` for an unknown user or one that is not a member.
    pub async fn get(&self, user_id: &str) -> Result<User, DomainError> {
        let user = self.user_record(user_id).await?;
        let member = self
            .ctx
            .repo
            .has_assignment(&self.ctx.session, self.guid(), user.guid())
            .await?;
        if !member {
            return Err(DomainError::membership_not_found(self.id(), user_id));
        }
        Ok(Node::new(Arc::clone(&self.ctx), user))
    }

    /// # Errors
    /// Backend failures.
    pub async fn contains(&self, user_id: &str) -> Result<bool, DomainError> {
        match self.get(user_id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove a member by deleting the edge row.
    ///
    /// # Errors
    /// `NotFound` for an unknown user or one that is not a member.
    pub async fn remove(&self, user_id: &str) -> Result<(), DomainError> {
        let user = self.user_record(user_id).await?;
        let removed = self
            .ctx
            .repo
            .remove_assignment(&self.ctx.session, self.guid(), user.guid())
            .await?;
        if !removed {
            return Err(DomainError::membership_not_found(self.id(), user_id));
        }
        info!(group = %self.id(), user = %user_id, "member removed");
        Ok(())
    }

    /// Members are added with [`Group::add`] only.
    ///
    /// # Errors
    /// Always `Unsupported`.
    pub fn insert(&self, user_id: &str, _user: &User) -> Result<(), DomainError> {
        Err(DomainError::unsupported(format!(
            "cannot assign '{user_id}' into group '{}', use add()",
            self.id()
        )))
    }
}

#[async_trait]
impl PrincipalNode for User {
    fn kind(&self) -> PrincipalKind {
        PrincipalKind::User
    }

    fn id(&self) -> &str {
        self.record.id()
    }

    fn own_roles(&self) -> Vec<String> {
        self.record.own_roles()
    }

    async fn load_own_roles(&mut self) -> Result<Vec<String>, DomainError> {
        self.reload_own_roles().await
    }

    async fn set_own_roles(&mut self, roles: Vec<String>) -> Result<(), DomainError> {
        self.write_own_roles(roles).await
    }

    /// Stored own roles plus the own roles of every current group,
    /// deduplicated.
    async fn roles(&self) -> Result<Vec<String>, DomainError> {
        let stored = self.load_principal().await?;
        let mut roles: BTreeSet<String> =
            role_names(&stored.principal_roles).into_iter().collect();
        let groups = self
            .ctx
            .repo
            .groups_of_user(&self.ctx.session, self.guid())
            .await?;
        for group in &groups {
            roles.extend(group.own_roles());
        }
        Ok(roles.into_iter().collect())
    }
}

#[async_trait]
impl PrincipalNode for Group {
    fn kind(&self) -> PrincipalKind {
        PrincipalKind::Group
    }

    fn id(&self) -> &str {
        self.record.id()
    }

    fn own_roles(&self) -> Vec<String> {
        self.record.own_roles()
    }

    async fn load_own_roles(&mut self) -> Result<Vec<String>, DomainError> {
        self.reload_own_roles().await
    }

    async fn set_own_roles(&mut self, roles: Vec<String>) -> Result<(), DomainError> {
        self.write_own_roles(roles).await
    }

    async fn roles(&self) -> Result<Vec<String>, DomainError> {
        let stored = self.load_principal().await?;
        Ok(role_names(&stored.principal_roles))
    }
}
