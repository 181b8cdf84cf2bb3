//! Attribute access over principal records.
//!
//! Names declared as schema columns read and write the column; every other
//! name lives in the `data` JSON object. Writes to `data` rebuild the whole
//! map and hand it back for a full-column update, so there is no in-place
//! mutation that could go unnoticed.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sea_orm::entity::prelude::Json;
use sql_ugm_sdk::{AttrMap, AttrValue};
use time::format_description::well_known::Rfc3339;

use super::error::DomainError;
use crate::config::UgmConfig;
use crate::infra::storage::entity::{group, user};
use crate::infra::storage::record::{PrincipalRecord, PrincipalRow};

pub const CREATED: &str = "created";

/// Columns that are never exposed as attributes.
pub const TECHNICAL_ATTRS: &[&str] = &[
    "guid",
    "discriminator",
    "data",
    "principal_roles",
    "password",
];

/// Schema columns of a subtype row that double as attributes.
pub trait RowAttrs: PrincipalRow {
    const COLUMNS: &'static [&'static str];

    fn column_value(&self, name: &str) -> Option<AttrValue>;

    /// # Errors
    /// `Validation` when `value` does not fit the column.
    fn set_column(&mut self, name: &str, value: AttrValue) -> Result<(), DomainError>;
}

fn required_text(name: &str, value: &AttrValue) -> Result<String, DomainError> {
    match value.as_str() {
        Some(s) if !s.is_empty() => Ok(s.to_owned()),
        _ => Err(DomainError::validation(format!("'{name}' must be a non-empty string"))),
    }
}

fn optional_text(name: &str, value: &AttrValue) -> Result<Option<String>, DomainError> {
    match value {
        AttrValue::Null => Ok(None),
        other => other
            .as_str()
            .map(|s| Some(s.to_owned()))
            .ok_or_else(|| DomainError::validation(format!("'{name}' must be a string"))),
    }
}

fn optional_timestamp(
    name: &str,
    value: &AttrValue,
) -> Result<Option<time::OffsetDateTime>, DomainError> {
    match value {
        AttrValue::Null => Ok(None),
        AttrValue::Timestamp(t) => Ok(Some(*t)),
        _ => Err(DomainError::validation(format!("'{name}' must be a timestamp"))),
    }
}

impl RowAttrs for user::Model {
    const COLUMNS: &'static [&'static str] = &["id", "login", "first_login", "last_login"];

    fn column_value(&self, name: &str) -> Option<AttrValue> {
        match name {
            "id" => Some(AttrValue::from(self.id.as_str())),
            "login" => Some(AttrValue::from(self.login.clone())),
            "first_login" => Some(AttrValue::from(self.first_login)),
            "last_login" => Some(AttrValue::from(self.last_login)),
            _ => None,
        }
    }

    fn set_column(&mut self, name: &str, value: AttrValue) -> Result<(), DomainError> {
        match name {
            "id" => self.id = required_text(name, &value)?,
            "login" => self.login = optional_text(name, &value)?,
            "first_login" => self.first_login = optional_timestamp(name, &value)?,
            "last_login" => self.last_login = optional_timestamp(name, &value)?,
            _ => return Err(DomainError::validation(format!("'{name}' is not a user column"))),
        }
        Ok(())
    }
}

impl RowAttrs for group::Model {
    const COLUMNS: &'static [&'static str] = &["id"];

    fn column_value(&self, name: &str) -> Option<AttrValue> {
        (name == "id").then(|| AttrValue::from(self.id.as_str()))
    }

    fn set_column(&mut self, name: &str, value: AttrValue) -> Result<(), DomainError> {
        if name != "id" {
            return Err(DomainError::validation(format!("'{name}' is not a group column")));
        }
        self.id = required_text(name, &value)?;
        Ok(())
    }
}

/// Which table a write touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Written {
    Principal,
    Row,
}

/// Schema attribute names of `T`, technical columns excluded.
#[must_use]
pub fn schema_attrs<T: RowAttrs>() -> Vec<&'static str> {
    let mut names = T::COLUMNS.to_vec();
    names.push(CREATED);
    names
}

/// Stored value of `name` without binary decoding; `Null` when absent.
#[must_use]
pub fn raw<T: RowAttrs>(record: &PrincipalRecord<T>, name: &str) -> AttrValue {
    if name == CREATED {
        return AttrValue::Timestamp(record.principal.created);
    }
    if let Some(value) = record.row.column_value(name) {
        return value;
    }
    if TECHNICAL_ATTRS.contains(&name) {
        return AttrValue::Null;
    }
    record
        .principal
        .data
        .get(name)
        .cloned()
        .map_or(AttrValue::Null, AttrValue::from_json)
}

/// Base64-decode a stored binary attribute. Falsy values pass through.
///
/// # Errors
/// `Internal` when the stored text is not valid base64.
pub fn decode_binary(
    config: &UgmConfig,
    name: &str,
    value: AttrValue,
) -> Result<AttrValue, DomainError> {
    if !config.is_binary(name) || value.is_falsy() {
        return Ok(value);
    }
    if let AttrValue::Json(Json::String(text)) = &value {
        return STANDARD.decode(text).map(AttrValue::Binary).map_err(|e| {
            DomainError::internal(format!("stored binary attribute '{name}' is not base64: {e}"))
        });
    }
    Ok(value)
}

/// Base64-encode a truthy value of a binary attribute. Empty bytes become
/// the empty string; other falsy values pass through.
///
/// # Errors
/// `Validation` when a binary attribute gets a non-text, non-bytes value.
pub fn encode_binary(
    config: &UgmConfig,
    name: &str,
    value: AttrValue,
) -> Result<AttrValue, DomainError> {
    if !config.is_binary(name) {
        return Ok(value);
    }
    match value {
        AttrValue::Binary(bytes) if bytes.is_empty() => Ok(AttrValue::from("")),
        falsy if falsy.is_falsy() => Ok(falsy),
        AttrValue::Binary(bytes) => Ok(AttrValue::from(STANDARD.encode(bytes))),
        AttrValue::Json(Json::String(text)) => Ok(AttrValue::from(STANDARD.encode(text))),
        _ => Err(DomainError::validation(format!(
            "binary attribute '{name}' needs bytes or text"
        ))),
    }
}

/// JSON form of a value for the `data` column.
///
/// # Errors
/// `Validation` for raw bytes; those only fit attributes declared binary.
pub fn to_json(name: &str, value: AttrValue) -> Result<Json, DomainError> {
    match value {
        AttrValue::Null => Ok(Json::Null),
        AttrValue::Json(v) => Ok(v),
        AttrValue::Timestamp(t) => t
            .format(&Rfc3339)
            .map(Json::String)
            .map_err(|e| DomainError::internal(format!("cannot format '{name}': {e}"))),
        AttrValue::Binary(_) => Err(DomainError::validation(format!(
            "'{name}' is not declared binary"
        ))),
    }
}

/// Attribute value as callers see it.
///
/// # Errors
/// See [`decode_binary`].
pub fn get<T: RowAttrs>(
    config: &UgmConfig,
    record: &PrincipalRecord<T>,
    name: &str,
) -> Result<AttrValue, DomainError> {
    decode_binary(config, name, raw(record, name))
}

/// Write `value` to `record` and report which table needs the update.
///
/// An unset value written to `data` is stored as the empty string.
///
/// # Errors
/// - `Unsupported` for technical columns and `created`
/// - `Validation` when the value does not fit
pub fn set<T: RowAttrs>(
    config: &UgmConfig,
    record: &mut PrincipalRecord<T>,
    name: &str,
    value: AttrValue,
) -> Result<Written, DomainError> {
    if TECHNICAL_ATTRS.contains(&name) || name == CREATED {
        return Err(DomainError::unsupported(format!(
            "attribute '{name}' is not writable"
        )));
    }
    if T::COLUMNS.contains(&name) {
        record.row.set_column(name, value)?;
        return Ok(Written::Row);
    }
    let value = if value.is_null() {
        AttrValue::from("")
    } else {
        value
    };
    let stored = to_json(name, encode_binary(config, name, value)?)?;
    let mut data = record.data();
    data.insert(name.to_owned(), stored);
    record.principal.data = Json::Object(data);
    Ok(Written::Principal)
}

/// Exposed attribute names: the configured list when set, otherwise the
/// schema attributes plus every key of `data`.
#[must_use]
pub fn names<T: RowAttrs>(configured: &[String], record: &PrincipalRecord<T>) -> Vec<String> {
    if !configured.is_empty() {
        return configured.to_vec();
    }
    let mut names: Vec<String> = schema_attrs::<T>().into_iter().map(str::to_owned).collect();
    for key in record.data().keys() {
        if !names.iter().any(|n| n == key) {
            names.push(key.clone());
        }
    }
    names
}

/// Values of `keys`, `Null` where absent.
///
/// # Errors
/// See [`decode_binary`].
pub fn select<T: RowAttrs, S: AsRef<str>>(
    config: &UgmConfig,
    record: &PrincipalRecord<T>,
    keys: &[S],
) -> Result<AttrMap, DomainError> {
    keys.iter()
        .map(|k| {
            let k = k.as_ref();
            get(config, record, k).map(|v| (k.to_owned(), v))
        })
        .collect()
}
