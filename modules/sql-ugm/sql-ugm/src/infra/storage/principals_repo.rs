use async_trait::async_trait;
use sea_orm::entity::prelude::Json;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, DatabaseTransaction, DbBackend, EntityTrait,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};
use sql_ugm_sdk::{Criteria, CriterionValue};
use tracing::{debug, instrument};
use ugm_db::{Session, guid};

use super::entity::{group, group_assignment, principal, user};
use super::json_path::{JsonKind, data_is, data_text, like_pattern, login_text};
use super::record::{GroupRecord, PrincipalRecord, UserRecord};
use crate::domain::error::DomainError;
use crate::domain::repo::{PrincipalsRepository, UserColumn};

/// `SeaORM` implementation of [`PrincipalsRepository`].
#[derive(Clone, Debug, Default)]
pub struct SeaOrmPrincipalsRepository;

impl SeaOrmPrincipalsRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn pair<T>(
    row: T,
    principal: Option<principal::Model>,
) -> Result<PrincipalRecord<T>, DomainError> {
    let principal =
        principal.ok_or_else(|| DomainError::internal("principal row missing for subtype row"))?;
    guid::decode(Some(principal.guid.as_str()))
        .map_err(|e| DomainError::internal(e.to_string()))?;
    Ok(PrincipalRecord { principal, row })
}

fn pairs<T>(
    rows: Vec<(T, Option<principal::Model>)>,
) -> Result<Vec<PrincipalRecord<T>>, DomainError> {
    rows.into_iter().map(|(row, p)| pair(row, p)).collect()
}

fn principal_am(row: &principal::Model) -> principal::ActiveModel {
    principal::ActiveModel {
        guid: Set(row.guid.clone()),
        discriminator: Set(row.discriminator.clone()),
        data: Set(row.data.clone()),
        principal_roles: Set(row.principal_roles.clone()),
        created: Set(row.created),
    }
}

/// Comparison on a schema column.
fn column_cmp<C: ColumnTrait>(col: C, value: &CriterionValue, exact_match: bool) -> SimpleExpr {
    match value {
        CriterionValue::Text(s) if !exact_match => col.like(like_pattern(s)),
        other => col.eq(other.to_text()),
    }
}

/// Comparison on a key of `principal.data`, read as text. Equality also
/// requires the stored JSON type to match the criterion's.
fn data_cmp(
    backend: DbBackend,
    key: &str,
    value: &CriterionValue,
    exact_match: bool,
) -> SimpleExpr {
    let field = Expr::expr(data_text(backend, key));
    match value {
        CriterionValue::Text(s) if !exact_match => field.like(like_pattern(s)),
        CriterionValue::Text(s) => {
            data_is(backend, key, JsonKind::Text).and(field.eq(s.as_str()))
        }
        CriterionValue::Int(n) => {
            data_is(backend, key, JsonKind::Integer).and(field.eq(n.to_string()))
        }
    }
}

/// Combine `exprs` with AND, or OR when `or_search`. `None` for no criteria.
fn combine(exprs: Vec<SimpleExpr>, or_search: bool) -> Option<Condition> {
    if exprs.is_empty() {
        return None;
    }
    let base = if or_search {
        Condition::any()
    } else {
        Condition::all()
    };
    Some(exprs.into_iter().fold(base, Condition::add))
}

fn user_condition(
    backend: DbBackend,
    criteria: &Criteria,
    exact_match: bool,
    or_search: bool,
) -> Option<Condition> {
    let exprs = criteria
        .iter()
        .map(|(key, value)| match key {
            "id" => column_cmp(user::Column::Id, value, exact_match),
            "login" => column_cmp(user::Column::Login, value, exact_match),
            _ => data_cmp(backend, key, value, exact_match),
        })
        .collect();
    combine(exprs, or_search)
}

fn group_condition(
    backend: DbBackend,
    criteria: &Criteria,
    exact_match: bool,
    or_search: bool,
) -> Option<Condition> {
    let exprs = criteria
        .iter()
        .map(|(key, value)| match key {
            "id" => column_cmp(group::Column::Id, value, exact_match),
            _ => data_cmp(backend, key, value, exact_match),
        })
        .collect();
    combine(exprs, or_search)
}

async fn edge_exists(
    tx: &DatabaseTransaction,
    group_guid: &str,
    user_guid: &str,
) -> Result<bool, DomainError> {
    let found = group_assignment::Entity::find_by_id((group_guid.to_owned(), user_guid.to_owned()))
        .one(tx)
        .await?;
    Ok(found.is_some())
}

async fn delete_principal_row(tx: &DatabaseTransaction, guid: &str) -> Result<(), DomainError> {
    principal::Entity::delete_many()
        .filter(principal::Column::Guid.eq(guid))
        .exec(tx)
        .await?;
    Ok(())
}

#[async_trait]
impl PrincipalsRepository for SeaOrmPrincipalsRepository {
    #[instrument(skip(self, session))]
    async fn find_user(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<Option<UserRecord>, DomainError> {
        let tx = session.runner().await?;
        let found = user::Entity::find()
            .filter(user::Column::Id.eq(id))
            .find_also_related(principal::Entity)
            .one(&*tx)
            .await?;
        found.map(|(row, p)| pair(row, p)).transpose()
    }

    #[instrument(skip(self, session))]
    async fn find_group(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<Option<GroupRecord>, DomainError> {
        let tx = session.runner().await?;
        let found = group::Entity::find()
            .filter(group::Column::Id.eq(id))
            .find_also_related(principal::Entity)
            .one(&*tx)
            .await?;
        found.map(|(row, p)| pair(row, p)).transpose()
    }

    async fn list_user_ids(&self, session: &Session) -> Result<Vec<String>, DomainError> {
        let tx = session.runner().await?;
        let ids = user::Entity::find()
            .select_only()
            .column(user::Column::Id)
            .join(JoinType::InnerJoin, user::Relation::Principal.def())
            .order_by_asc(principal::Column::Created)
            .order_by_asc(user::Column::Id)
            .into_tuple::<String>()
            .all(&*tx)
            .await?;
        Ok(ids)
    }

    async fn list_group_ids(&self, session: &Session) -> Result<Vec<String>, DomainError> {
        let tx = session.runner().await?;
        let ids = group::Entity::find()
            .select_only()
            .column(group::Column::Id)
            .join(JoinType::InnerJoin, group::Relation::Principal.def())
            .order_by_asc(principal::Column::Created)
            .order_by_asc(group::Column::Id)
            .into_tuple::<String>()
            .all(&*tx)
            .await?;
        Ok(ids)
    }

    async fn count_users(&self, session: &Session) -> Result<u64, DomainError> {
        let tx = session.runner().await?;
        Ok(user::Entity::find().count(&*tx).await?)
    }

    async fn count_groups(&self, session: &Session) -> Result<u64, DomainError> {
        let tx = session.runner().await?;
        Ok(group::Entity::find().count(&*tx).await?)
    }

    #[instrument(skip_all, fields(id = %record.row.id))]
    async fn insert_user(&self, session: &Session, record: &UserRecord) -> Result<(), DomainError> {
        let tx = session.runner().await?;
        principal::Entity::insert(principal_am(&record.principal))
            .exec_without_returning(&*tx)
            .await?;
        let row = &record.row;
        let am = user::ActiveModel {
            guid: Set(row.guid.clone()),
            id: Set(row.id.clone()),
            login: Set(row.login.clone()),
            password: Set(row.password.clone()),
            first_login: Set(row.first_login),
            last_login: Set(row.last_login),
        };
        user::Entity::insert(am).exec_without_returning(&*tx).await?;
        debug!(guid = %row.guid, "user row inserted");
        Ok(())
    }

    #[instrument(skip_all, fields(id = %record.row.id))]
    async fn insert_group(
        &self,
        session: &Session,
        record: &GroupRecord,
    ) -> Result<(), DomainError> {
        let tx = session.runner().await?;
        principal::Entity::insert(principal_am(&record.principal))
            .exec_without_returning(&*tx)
            .await?;
        let am = group::ActiveModel {
            guid: Set(record.row.guid.clone()),
            id: Set(record.row.id.clone()),
        };
        group::Entity::insert(am).exec_without_returning(&*tx).await?;
        debug!(guid = %record.row.guid, "group row inserted");
        Ok(())
    }

    #[instrument(skip_all, fields(id = %record.row.id))]
    async fn delete_user(&self, session: &Session, record: &UserRecord) -> Result<(), DomainError> {
        let tx = session.runner().await?;
        let edges = group_assignment::Entity::delete_many()
            .filter(group_assignment::Column::UsersGuid.eq(&record.row.guid))
            .exec(&*tx)
            .await?;
        user::Entity::delete_many()
            .filter(user::Column::Guid.eq(&record.row.guid))
            .exec(&*tx)
            .await?;
        delete_principal_row(&tx, &record.row.guid).await?;
        debug!(edges = edges.rows_affected, "user deleted");
        Ok(())
    }

    #[instrument(skip_all, fields(id = %record.row.id))]
    async fn delete_group(
        &self,
        session: &Session,
        record: &GroupRecord,
    ) -> Result<(), DomainError> {
        let tx = session.runner().await?;
        let edges = group_assignment::Entity::delete_many()
            .filter(group_assignment::Column::GroupsGuid.eq(&record.row.guid))
            .exec(&*tx)
            .await?;
        group::Entity::delete_many()
            .filter(group::Column::Guid.eq(&record.row.guid))
            .exec(&*tx)
            .await?;
        delete_principal_row(&tx, &record.row.guid).await?;
        debug!(edges = edges.rows_affected, "group deleted");
        Ok(())
    }

    async fn find_principal(
        &self,
        session: &Session,
        guid: &str,
    ) -> Result<Option<principal::Model>, DomainError> {
        let tx = session.runner().await?;
        Ok(principal::Entity::find_by_id(guid.to_owned())
            .one(&*tx)
            .await?)
    }

    async fn update_data(
        &self,
        session: &Session,
        guid: &str,
        data: &Json,
    ) -> Result<(), DomainError> {
        let tx = session.runner().await?;
        principal::Entity::update_many()
            .col_expr(principal::Column::Data, Expr::value(data.clone()))
            .filter(principal::Column::Guid.eq(guid))
            .exec(&*tx)
            .await?;
        Ok(())
    }

    async fn update_roles(
        &self,
        session: &Session,
        guid: &str,
        roles: &Json,
    ) -> Result<(), DomainError> {
        let tx = session.runner().await?;
        principal::Entity::update_many()
            .col_expr(principal::Column::PrincipalRoles, Expr::value(roles.clone()))
            .filter(principal::Column::Guid.eq(guid))
            .exec(&*tx)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, session, columns), fields(columns = columns.len()))]
    async fn update_user_columns(
        &self,
        session: &Session,
        guid: &str,
        columns: &[UserColumn],
    ) -> Result<(), DomainError> {
        if columns.is_empty() {
            return Ok(());
        }
        let update = columns.iter().fold(
            user::Entity::update_many().filter(user::Column::Guid.eq(guid)),
            |update, column| match column {
                UserColumn::Id(id) => update.col_expr(user::Column::Id, Expr::value(id.clone())),
                UserColumn::Login(login) => {
                    update.col_expr(user::Column::Login, Expr::value(login.clone()))
                }
                UserColumn::Password(hash) => {
                    update.col_expr(user::Column::Password, Expr::value(hash.clone()))
                }
                UserColumn::FirstLogin(at) => {
                    update.col_expr(user::Column::FirstLogin, Expr::value(*at))
                }
                UserColumn::LastLogin(at) => {
                    update.col_expr(user::Column::LastLogin, Expr::value(*at))
                }
            },
        );
        let tx = session.runner().await?;
        update.exec(&*tx).await?;
        Ok(())
    }

    async fn update_group_id(
        &self,
        session: &Session,
        guid: &str,
        id: &str,
    ) -> Result<(), DomainError> {
        let tx = session.runner().await?;
        group::Entity::update_many()
            .col_expr(group::Column::Id, Expr::value(id.to_owned()))
            .filter(group::Column::Guid.eq(guid))
            .exec(&*tx)
            .await?;
        Ok(())
    }

    async fn groups_of_user(
        &self,
        session: &Session,
        user_guid: &str,
    ) -> Result<Vec<GroupRecord>, DomainError> {
        let tx = session.runner().await?;
        let rows = group::Entity::find()
            .find_also_related(principal::Entity)
            .join(JoinType::InnerJoin, group::Relation::GroupAssignment.def())
            .filter(group_assignment::Column::UsersGuid.eq(user_guid))
            .order_by_asc(group::Column::Id)
            .all(&*tx)
            .await?;
        pairs(rows)
    }

    async fn members_of_group(
        &self,
        session: &Session,
        group_guid: &str,
    ) -> Result<Vec<UserRecord>, DomainError> {
        let tx = session.runner().await?;
        let rows = user::Entity::find()
            .find_also_related(principal::Entity)
            .join(JoinType::InnerJoin, user::Relation::GroupAssignment.def())
            .filter(group_assignment::Column::GroupsGuid.eq(group_guid))
            .order_by_asc(user::Column::Id)
            .all(&*tx)
            .await?;
        pairs(rows)
    }

    async fn has_assignment(
        &self,
        session: &Session,
        group_guid: &str,
        user_guid: &str,
    ) -> Result<bool, DomainError> {
        let tx = session.runner().await?;
        edge_exists(&tx, group_guid, user_guid).await
    }

    #[instrument(skip(self, session))]
    async fn add_assignment(
        &self,
        session: &Session,
        group_guid: &str,
        user_guid: &str,
    ) -> Result<bool, DomainError> {
        let tx = session.runner().await?;
        if edge_exists(&tx, group_guid, user_guid).await? {
            debug!("membership edge already present");
            return Ok(false);
        }
        let am = group_assignment::ActiveModel {
            groups_guid: Set(group_guid.to_owned()),
            users_guid: Set(user_guid.to_owned()),
        };
        group_assignment::Entity::insert(am)
            .exec_without_returning(&*tx)
            .await?;
        Ok(true)
    }

    #[instrument(skip(self, session))]
    async fn remove_assignment(
        &self,
        session: &Session,
        group_guid: &str,
        user_guid: &str,
    ) -> Result<bool, DomainError> {
        let tx = session.runner().await?;
        let res = group_assignment::Entity::delete_many()
            .filter(group_assignment::Column::GroupsGuid.eq(group_guid))
            .filter(group_assignment::Column::UsersGuid.eq(user_guid))
            .exec(&*tx)
            .await?;
        Ok(res.rows_affected > 0)
    }

    #[instrument(skip(self, session, criteria), fields(criteria = criteria.len()))]
    async fn search_users(
        &self,
        session: &Session,
        criteria: &Criteria,
        exact_match: bool,
        or_search: bool,
    ) -> Result<Vec<UserRecord>, DomainError> {
        let mut query = user::Entity::find().find_also_related(principal::Entity);
        if let Some(cond) = user_condition(session.backend(), criteria, exact_match, or_search) {
            query = query.filter(cond);
        }
        let tx = session.runner().await?;
        let rows = query.order_by_asc(user::Column::Id).all(&*tx).await?;
        debug!(matches = rows.len(), "user search done");
        pairs(rows)
    }

    #[instrument(skip(self, session, criteria), fields(criteria = criteria.len()))]
    async fn search_groups(
        &self,
        session: &Session,
        criteria: &Criteria,
        exact_match: bool,
        or_search: bool,
    ) -> Result<Vec<GroupRecord>, DomainError> {
        let mut query = group::Entity::find().find_also_related(principal::Entity);
        if let Some(cond) = group_condition(session.backend(), criteria, exact_match, or_search) {
            query = query.filter(cond);
        }
        let tx = session.runner().await?;
        let rows = query.order_by_asc(group::Column::Id).all(&*tx).await?;
        debug!(matches = rows.len(), "group search done");
        pairs(rows)
    }

    #[instrument(skip(self, session))]
    async fn user_ids_by_login(
        &self,
        session: &Session,
        value: &str,
    ) -> Result<Vec<String>, DomainError> {
        let backend = session.backend();
        let tx = session.runner().await?;
        let ids = user::Entity::find()
            .select_only()
            .column(user::Column::Id)
            .join(JoinType::InnerJoin, user::Relation::Principal.def())
            .filter(user::Column::Login.is_not_null())
            .filter(Expr::expr(login_text(backend)).eq(value))
            .order_by_asc(user::Column::Id)
            .into_tuple::<String>()
            .all(&*tx)
            .await?;
        Ok(ids)
    }
}
