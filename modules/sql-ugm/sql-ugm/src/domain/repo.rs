use async_trait::async_trait;
use sea_orm::entity::prelude::Json;
use sql_ugm_sdk::Criteria;
use time::OffsetDateTime;
use ugm_db::Session;

use super::error::DomainError;
use crate::infra::storage::entity::principal;
use crate::infra::storage::record::{GroupRecord, UserRecord};

/// One writable column of the `user` row with its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserColumn {
    Id(String),
    Login(Option<String>),
    Password(Option<String>),
    FirstLogin(Option<OffsetDateTime>),
    LastLogin(Option<OffsetDateTime>),
}

/// Persistence of principal records.
///
/// Every call runs inside the session's open transaction, so writes are
/// visible to the next call on the same session right away.
#[async_trait]
pub trait PrincipalsRepository: Send + Sync {
    async fn find_user(&self, session: &Session, id: &str)
    -> Result<Option<UserRecord>, DomainError>;

    async fn find_group(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<Option<GroupRecord>, DomainError>;

    /// User ids in creation order.
    async fn list_user_ids(&self, session: &Session) -> Result<Vec<String>, DomainError>;

    /// Group ids in creation order.
    async fn list_group_ids(&self, session: &Session) -> Result<Vec<String>, DomainError>;

    async fn count_users(&self, session: &Session) -> Result<u64, DomainError>;

    async fn count_groups(&self, session: &Session) -> Result<u64, DomainError>;

    async fn insert_user(&self, session: &Session, record: &UserRecord) -> Result<(), DomainError>;

    async fn insert_group(&self, session: &Session, record: &GroupRecord)
    -> Result<(), DomainError>;

    /// Delete the user and every membership edge referencing it.
    async fn delete_user(&self, session: &Session, record: &UserRecord) -> Result<(), DomainError>;

    /// Delete the group and every membership edge referencing it.
    async fn delete_group(&self, session: &Session, record: &GroupRecord)
    -> Result<(), DomainError>;

    /// The shared principal row, by guid.
    async fn find_principal(
        &self,
        session: &Session,
        guid: &str,
    ) -> Result<Option<principal::Model>, DomainError>;

    /// Write `data` only; `principal_roles` is left alone.
    async fn update_data(&self, session: &Session, guid: &str, data: &Json)
    -> Result<(), DomainError>;

    /// Write `principal_roles` only; `data` is left alone.
    async fn update_roles(
        &self,
        session: &Session,
        guid: &str,
        roles: &Json,
    ) -> Result<(), DomainError>;

    /// Set the listed `user` columns; every other column keeps its stored
    /// value.
    async fn update_user_columns(
        &self,
        session: &Session,
        guid: &str,
        columns: &[UserColumn],
    ) -> Result<(), DomainError>;

    async fn update_group_id(&self, session: &Session, guid: &str, id: &str)
    -> Result<(), DomainError>;

    /// Groups the user belongs to, ordered by group id.
    async fn groups_of_user(
        &self,
        session: &Session,
        user_guid: &str,
    ) -> Result<Vec<GroupRecord>, DomainError>;

    /// Members of the group, ordered by user id.
    async fn members_of_group(
        &self,
        session: &Session,
        group_guid: &str,
    ) -> Result<Vec<UserRecord>, DomainError>;

    async fn has_assignment(
        &self,
        session: &Session,
        group_guid: &str,
        user_guid: &str,
    ) -> Result<bool, DomainError>;

    /// Returns `false` when the edge already existed.
    async fn add_assignment(
        &self,
        session: &Session,
        group_guid: &str,
        user_guid: &str,
    ) -> Result<bool, DomainError>;

    /// Returns `false` when there was no such edge.
    async fn remove_assignment(
        &self,
        session: &Session,
        group_guid: &str,
        user_guid: &str,
    ) -> Result<bool, DomainError>;

    /// Users matching `criteria`, ordered by id. `id` and `login` compare
    /// against columns, other keys against `data`.
    async fn search_users(
        &self,
        session: &Session,
        criteria: &Criteria,
        exact_match: bool,
        or_search: bool,
    ) -> Result<Vec<UserRecord>, DomainError>;

    /// Groups matching `criteria`, ordered by id. Only `id` is a column.
    async fn search_groups(
        &self,
        session: &Session,
        criteria: &Criteria,
        exact_match: bool,
        or_search: bool,
    ) -> Result<Vec<GroupRecord>, DomainError>;

    /// Ids of users whose `data[login]` equals `value`, ordered by id.
    async fn user_ids_by_login(
        &self,
        session: &Session,
        value: &str,
    ) -> Result<Vec<String>, DomainError>;
}
