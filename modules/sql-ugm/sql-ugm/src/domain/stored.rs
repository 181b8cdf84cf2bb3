//! Per-subtype dispatch onto the repository.

use async_trait::async_trait;
use sql_ugm_sdk::Criteria;

use super::attributes::RowAttrs;
use super::context::UgmCtx;
use super::error::DomainError;
use super::repo::UserColumn;
use crate::config::UgmConfig;
use crate::infra::storage::entity::{group, user};
use crate::infra::storage::record::PrincipalRecord;

#[async_trait]
pub trait StoredRow: RowAttrs + 'static {
    /// Fixed fields reported next to the `data` keys when a search asks for
    /// every attribute.
    const RESULT_COLUMNS: &'static [&'static str];

    fn configured_attrs(config: &UgmConfig) -> &[String];

    async fn find(ctx: &UgmCtx, id: &str) -> Result<Option<PrincipalRecord<Self>>, DomainError>;

    async fn list_ids(ctx: &UgmCtx) -> Result<Vec<String>, DomainError>;

    async fn count(ctx: &UgmCtx) -> Result<u64, DomainError>;

    async fn insert(ctx: &UgmCtx, record: &PrincipalRecord<Self>) -> Result<(), DomainError>;

    async fn delete(ctx: &UgmCtx, record: &PrincipalRecord<Self>) -> Result<(), DomainError>;

    async fn search(
        ctx: &UgmCtx,
        criteria: &Criteria,
        exact_match: bool,
        or_search: bool,
    ) -> Result<Vec<PrincipalRecord<Self>>, DomainError>;

    /// Write the current value of column `name` and nothing else.
    async fn write_column(&self, ctx: &UgmCtx, name: &str) -> Result<(), DomainError>;
}

#[async_trait]
impl StoredRow for user::Model {
    const RESULT_COLUMNS: &'static [&'static str] = &["login"];

    fn configured_attrs(config: &UgmConfig) -> &[String] {
        &config.user_attrs
    }

    async fn find(ctx: &UgmCtx, id: &str) -> Result<Option<PrincipalRecord<Self>>, DomainError> {
        ctx.repo.find_user(&ctx.session, id).await
    }

    async fn list_ids(ctx: &UgmCtx) -> Result<Vec<String>, DomainError> {
        ctx.repo.list_user_ids(&ctx.session).await
    }

    async fn count(ctx: &UgmCtx) -> Result<u64, DomainError> {
        ctx.repo.count_users(&ctx.session).await
    }

    async fn insert(ctx: &UgmCtx, record: &PrincipalRecord<Self>) -> Result<(), DomainError> {
        ctx.repo.insert_user(&ctx.session, record).await
    }

    async fn delete(ctx: &UgmCtx, record: &PrincipalRecord<Self>) -> Result<(), DomainError> {
        ctx.repo.delete_user(&ctx.session, record).await
    }

    async fn search(
        ctx: &UgmCtx,
        criteria: &Criteria,
        exact_match: bool,
        or_search: bool,
    ) -> Result<Vec<PrincipalRecord<Self>>, DomainError> {
        ctx.repo
            .search_users(&ctx.session, criteria, exact_match, or_search)
            .await
    }

    async fn write_column(&self, ctx: &UgmCtx, name: &str) -> Result<(), DomainError> {
        let column = match name {
            "id" => UserColumn::Id(self.id.clone()),
            "login" => UserColumn::Login(self.login.clone()),
            "first_login" => UserColumn::FirstLogin(self.first_login),
            "last_login" => UserColumn::LastLogin(self.last_login),
            other => {
                return Err(DomainError::validation(format!(
                    "'{other}' is not a user column"
                )));
            }
        };
        ctx.repo
            .update_user_columns(&ctx.session, &self.guid, &[column])
            .await
    }
}

#[async_trait]
impl StoredRow for group::Model {
    const RESULT_COLUMNS: &'static [&'static str] = &[];

    fn configured_attrs(config: &UgmConfig) -> &[String] {
        &config.group_attrs
    }

    async fn find(ctx: &UgmCtx, id: &str) -> Result<Option<PrincipalRecord<Self>>, DomainError> {
        ctx.repo.find_group(&ctx.session, id).await
    }

    async fn list_ids(ctx: &UgmCtx) -> Result<Vec<String>, DomainError> {
        ctx.repo.list_group_ids(&ctx.session).await
    }

    async fn count(ctx: &UgmCtx) -> Result<u64, DomainError> {
        ctx.repo.count_groups(&ctx.session).await
    }

    async fn insert(ctx: &UgmCtx, record: &PrincipalRecord<Self>) -> Result<(), DomainError> {
        ctx.repo.insert_group(&ctx.session, record).await
    }

    async fn delete(ctx: &UgmCtx, record: &PrincipalRecord<Self>) -> Result<(), DomainError> {
        ctx.repo.delete_group(&ctx.session, record).await
    }

    async fn search(
        ctx: &UgmCtx,
        criteria: &Criteria,
        exact_match: bool,
        or_search: bool,
    ) -> Result<Vec<PrincipalRecord<Self>>, DomainError> {
        ctx.repo
            .search_groups(&ctx.session, criteria, exact_match, or_search)
            .await
    }

    async fn write_column(&self, ctx: &UgmCtx, name: &str) -> Result<(), DomainError> {
        if name != "id" {
            return Err(DomainError::validation(format!(
                "'{name}' is not a group column"
            )));
        }
        ctx.repo.update_group_id(&ctx.session, &self.guid, &self.id).await
    }
}
