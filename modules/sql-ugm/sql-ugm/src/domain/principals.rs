//! `Users` and `Groups` collection managers.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use sea_orm::entity::prelude::Json;
use sql_ugm_sdk::{AttrMap, AttrValue, SearchRequest, SearchResult};
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use super::attributes::{self, TECHNICAL_ATTRS};
use super::context::UgmCtx;
use super::error::DomainError;
use super::node::Node;
use super::repo::UserColumn;
use super::stored::StoredRow;
use crate::infra::storage::entity::{group, user};
use crate::infra::storage::record::{PrincipalRecord, PrincipalRow, UserRecord, new_principal};

/// Collection of principals of one kind. Holds no cache; every read goes to
/// the session.
pub struct Principals<T> {
    ctx: Arc<UgmCtx>,
    _row: PhantomData<fn() -> T>,
}

pub type Users = Principals<user::Model>;
pub type Groups = Principals<group::Model>;

impl<T: StoredRow> fmt::Debug for Principals<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principals")
            .field("kind", &T::KIND)
            .finish_non_exhaustive()
    }
}

impl<T: StoredRow> Principals<T> {
    #[must_use]
    pub fn new(ctx: Arc<UgmCtx>) -> Self {
        Self {
            ctx,
            _row: PhantomData,
        }
    }

    async fn record(&self, id: &str) -> Result<PrincipalRecord<T>, DomainError> {
        T::find(&self.ctx, id)
            .await?
            .ok_or_else(|| DomainError::principal_not_found(T::KIND, id))
    }

    /// # Errors
    /// `NotFound` for an unknown id.
    pub async fn get(&self, id: &str) -> Result<Node<T>, DomainError> {
        let record = self.record(id).await?;
        Ok(Node::new(Arc::clone(&self.ctx), record))
    }

    /// # Errors
    /// Backend failures.
    pub async fn contains(&self, id: &str) -> Result<bool, DomainError> {
        Ok(T::find(&self.ctx, id).await?.is_some())
    }

    /// Ids in creation order.
    ///
    /// # Errors
    /// Backend failures.
    pub async fn ids(&self) -> Result<Vec<String>, DomainError> {
        T::list_ids(&self.ctx).await
    }

    /// # Errors
    /// Backend failures.
    pub async fn len(&self) -> Result<u64, DomainError> {
        T::count(&self.ctx).await
    }

    /// # Errors
    /// Backend failures.
    pub async fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.len().await? == 0)
    }

    /// Delete a principal together with its membership edges.
    ///
    /// # Errors
    /// `NotFound` for an unknown id.
    #[instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn remove(&self, id: &str) -> Result<(), DomainError> {
        let record = self.record(id).await?;
        T::delete(&self.ctx, &record).await?;
        info!("principal removed");
        Ok(())
    }

    /// Principals are only added with `create`.
    ///
    /// # Errors
    /// Always `Unsupported`.
    #[allow(clippy::unused_self)] // Mirrors the mapping API of the collection
    pub fn insert(&self, id: &str, _node: &Node<T>) -> Result<(), DomainError> {
        Err(DomainError::unsupported(format!(
            "{} '{id}' can only be added using create",
            T::KIND
        )))
    }

    /// Run a search and shape the result after `request.attrlist`.
    ///
    /// # Errors
    /// `Validation` when an exact search matches nothing.
    #[instrument(
        skip(self, request),
        fields(kind = %T::KIND, criteria = request.criteria.len(), exact = request.exact_match)
    )]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResult, DomainError> {
        let records = T::search(
            &self.ctx,
            &request.criteria,
            request.exact_match,
            request.or_search,
        )
        .await?;
        debug!(matches = records.len(), "search done");
        if records.is_empty() && request.exact_match {
            return Err(DomainError::validation("no entries found"));
        }
        let Some(attrlist) = &request.attrlist else {
            return Ok(SearchResult::Ids(
                records.iter().map(|r| r.id().to_owned()).collect(),
            ));
        };
        let config = &self.ctx.config;
        let rows = records
            .iter()
            .map(|record| {
                let attrs = if attrlist.is_empty() {
                    attributes::select(config, record, &result_keys(record))
                } else {
                    attributes::select(config, record, attrlist.as_slice())
                }?;
                Ok::<_, DomainError>((record.id().to_owned(), attrs))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SearchResult::WithAttrs(rows))
    }

    /// # Errors
    /// Backend failures.
    pub async fn apply(&self) -> Result<(), DomainError> {
        self.ctx.apply().await
    }

    /// Nothing is cached, so there is nothing to drop.
    #[allow(clippy::unused_self)] // Mirrors the mapping API of the collection
    pub fn invalidate(&self) {
        debug!(kind = %T::KIND, "invalidate requested");
    }

    async fn ensure_absent(&self, id: &str) -> Result<(), DomainError> {
        if self.contains(id).await? {
            return Err(DomainError::Conflict(format!(
                "{} '{id}' already exists",
                T::KIND
            )));
        }
        Ok(())
    }

    /// Encode `attrs` for the `data` column. Schema and technical names are
    /// rejected; binary attributes are base64-encoded.
    fn build_data(&self, attrs: AttrMap) -> Result<serde_json::Map<String, Json>, DomainError> {
        let schema = attributes::schema_attrs::<T>();
        attrs
            .into_iter()
            .map(|(name, value)| {
                if schema.contains(&name.as_str()) || TECHNICAL_ATTRS.contains(&name.as_str()) {
                    return Err(DomainError::validation(format!(
                        "'{name}' cannot be set on create"
                    )));
                }
                let encoded = attributes::encode_binary(&self.ctx.config, &name, value)?;
                let json = attributes::to_json(&name, encoded)?;
                Ok((name, json))
            })
            .collect()
    }

    async fn store(&self, record: PrincipalRecord<T>) -> Result<Node<T>, DomainError> {
        T::insert(&self.ctx, &record).await?;
        info!(kind = %T::KIND, id = %record.id(), guid = %record.guid(), "principal created");
        Ok(Node::new(Arc::clone(&self.ctx), record))
    }
}

/// Keys reported when a search asks for every attribute: the fixed result
/// columns followed by the `data` keys.
fn result_keys<T: StoredRow>(record: &PrincipalRecord<T>) -> Vec<String> {
    let mut keys: Vec<String> = T::RESULT_COLUMNS.iter().map(|&k| k.to_owned()).collect();
    keys.extend(record.data().keys().cloned());
    keys
}

impl Users {
    /// Create a user. A `login` entry in `attrs` names the data key used
    /// for login lookups; every other entry lands in `data`.
    ///
    /// # Errors
    /// - `Conflict` when the id is taken
    /// - `Validation` for schema or technical attribute names
    #[instrument(skip(self, attrs), fields(attrs = attrs.len()))]
    pub async fn create(
        &self,
        id: &str,
        mut attrs: AttrMap,
    ) -> Result<Node<user::Model>, DomainError> {
        self.ensure_absent(id).await?;
        let login = match attrs.remove("login") {
            None | Some(AttrValue::Null) => None,
            Some(value) => Some(
                value
                    .as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| DomainError::validation("'login' must be a string"))?,
            ),
        };
        let data = self.build_data(attrs)?;
        let guid = ugm_db::guid::new_hex();
        let record = PrincipalRecord {
            principal: new_principal(guid.clone(), user::Model::DISCRIMINATOR, data),
            row: user::Model {
                guid,
                id: id.to_owned(),
                login,
                password: None,
                first_login: None,
                last_login: None,
            },
        };
        self.store(record).await
    }

    /// Check `password` against the stored hash. Never an error for bad
    /// input: empty values, unknown ids and unset hashes yield `false`.
    ///
    /// # Errors
    /// Backend failures.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, id: &str, password: &str) -> Result<bool, DomainError> {
        if id.is_empty() || password.is_empty() {
            return Ok(false);
        }
        let Some(record) = user::Model::find(&self.ctx, id).await? else {
            debug!("unknown user");
            return Ok(false);
        };
        let Some(stored) = record.row.password.as_deref() else {
            debug!("no password set");
            return Ok(false);
        };
        if !self.ctx.hasher.verify(password, stored) {
            debug!("password mismatch");
            return Ok(false);
        }
        if self.ctx.config.log_auth {
            let now = OffsetDateTime::now_utc();
            let mut stamps = vec![UserColumn::LastLogin(Some(now))];
            if record.row.first_login.is_none() {
                stamps.push(UserColumn::FirstLogin(Some(now)));
            }
            self.ctx
                .repo
                .update_user_columns(&self.ctx.session, record.guid(), &stamps)
                .await?;
            debug!("login stamped");
        }
        Ok(true)
    }

    /// Set a new password. With `old` present it must verify first.
    ///
    /// # Errors
    /// `InvalidCredentials` for an unknown id or a wrong old password.
    #[instrument(skip(self, old, new))]
    pub async fn passwd(&self, id: &str, old: Option<&str>, new: &str) -> Result<(), DomainError> {
        let Some(record) = user::Model::find(&self.ctx, id).await? else {
            return Err(DomainError::invalid_credentials(format!("unknown user '{id}'")));
        };
        if let Some(old) = old {
            let verified = record
                .row
                .password
                .as_deref()
                .is_some_and(|stored| self.ctx.hasher.verify(old, stored));
            if !verified {
                return Err(DomainError::invalid_credentials(format!(
                    "old password does not match for '{id}'"
                )));
            }
        }
        let hashed = UserColumn::Password(Some(self.ctx.hasher.hash(new)));
        self.ctx
            .repo
            .update_user_columns(&self.ctx.session, record.guid(), &[hashed])
            .await?;
        info!("password changed");
        self.ctx.apply().await
    }

    /// Stored hash of a user's password.
    ///
    /// # Errors
    /// `NotFound` for an unknown id.
    pub async fn get_hashed_pw(&self, id: &str) -> Result<Option<String>, DomainError> {
        Ok(self.record(id).await?.row.password)
    }

    /// Store an already hashed password, e.g. when importing accounts.
    ///
    /// # Errors
    /// `NotFound` for an unknown id.
    pub async fn set_hashed_pw(&self, id: &str, hashed: Option<String>) -> Result<(), DomainError> {
        let record: UserRecord = self.record(id).await?;
        let column = UserColumn::Password(hashed);
        self.ctx
            .repo
            .update_user_columns(&self.ctx.session, record.guid(), &[column])
            .await
    }

    /// Resolve a login value to a user id. Falls back to `value` itself when
    /// no user matches; the lowest id wins when several do.
    ///
    /// # Errors
    /// Backend failures.
    #[instrument(skip(self))]
    pub async fn id_for_login(&self, value: &str) -> Result<String, DomainError> {
        let ids = self
            .ctx
            .repo
            .user_ids_by_login(&self.ctx.session, value)
            .await?;
        match ids.as_slice() {
            [] => {
                debug!("no login match, using value as id");
                Ok(value.to_owned())
            }
            [only] => Ok(only.clone()),
            [first, ..] => {
                warn!(matches = ids.len(), chosen = %first, "ambiguous login");
                Ok(first.clone())
            }
        }
    }
}

impl Groups {
    /// Create a group. Every entry of `attrs` lands in `data`.
    ///
    /// # Errors
    /// - `Conflict` when the id is taken
    /// - `Validation` for schema or technical attribute names
    #[instrument(skip(self, attrs), fields(attrs = attrs.len()))]
    pub async fn create(
        &self,
        id: &str,
        attrs: AttrMap,
    ) -> Result<Node<group::Model>, DomainError> {
        self.ensure_absent(id).await?;
        let data = self.build_data(attrs)?;
        let guid = ugm_db::guid::new_hex();
        let record = PrincipalRecord {
            principal: new_principal(guid.clone(), group::Model::DISCRIMINATOR, data),
            row: group::Model {
                guid,
                id: id.to_owned(),
            },
        };
        self.store(record).await
    }
}
