//! Loaded principal rows.
//!
//! A record pairs the subtype row (`user` or `group`) with its shared
//! `principal` row. Records are plain snapshots; writing one back is an
//! explicit repository call.

use sea_orm::entity::prelude::Json;
use sql_ugm_sdk::PrincipalKind;
use time::OffsetDateTime;

use super::entity::{GROUP_DISCRIMINATOR, USER_DISCRIMINATOR, group, principal, user};

#[derive(Clone, Debug, PartialEq)]
pub struct PrincipalRecord<T> {
    pub principal: principal::Model,
    pub row: T,
}

pub type UserRecord = PrincipalRecord<user::Model>;
pub type GroupRecord = PrincipalRecord<group::Model>;

/// Subtype-specific view of a principal row.
pub trait PrincipalRow: Clone + Send + Sync {
    const KIND: PrincipalKind;
    const DISCRIMINATOR: &'static str;

    fn guid(&self) -> &str;
    fn id(&self) -> &str;
}

impl PrincipalRow for user::Model {
    const KIND: PrincipalKind = PrincipalKind::User;
    const DISCRIMINATOR: &'static str = USER_DISCRIMINATOR;

    fn guid(&self) -> &str {
        &self.guid
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl PrincipalRow for group::Model {
    const KIND: PrincipalKind = PrincipalKind::Group;
    const DISCRIMINATOR: &'static str = GROUP_DISCRIMINATOR;

    fn guid(&self) -> &str {
        &self.guid
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl<T: PrincipalRow> PrincipalRecord<T> {
    #[must_use]
    pub fn guid(&self) -> &str {
        self.row.guid()
    }

    #[must_use]
    pub fn id(&self) -> &str {
        self.row.id()
    }

    /// The `data` column as a map; a non-object value reads as empty.
    #[must_use]
    pub fn data(&self) -> serde_json::Map<String, Json> {
        match &self.principal.data {
            Json::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        }
    }

    /// Own roles in stored order.
    #[must_use]
    pub fn own_roles(&self) -> Vec<String> {
        role_names(&self.principal.principal_roles)
    }
}

/// Role names held in a `principal_roles` value. Non-string entries are
/// skipped.
#[must_use]
pub fn role_names(roles: &Json) -> Vec<String> {
    match roles {
        Json::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect(),
        _ => Vec::new(),
    }
}

/// Fresh principal row for a new record.
#[must_use]
pub fn new_principal(
    guid: String,
    discriminator: &str,
    data: serde_json::Map<String, Json>,
) -> principal::Model {
    principal::Model {
        guid,
        discriminator: discriminator.to_owned(),
        data: Json::Object(data),
        principal_roles: Json::Array(Vec::new()),
        created: OffsetDateTime::now_utc(),
    }
}
