//! Models exchanged over the UGM contract.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Which side of the shared identity space a principal lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    User,
    Group,
}

impl PrincipalKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Principal addressed by its human-facing id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalRef {
    pub kind: PrincipalKind,
    pub id: String,
}

impl PrincipalRef {
    #[must_use]
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::User,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn group(id: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::Group,
            id: id.into(),
        }
    }
}

/// Attribute value as seen by callers.
///
/// Binary attributes are stored base64-encoded and surface as
/// [`AttrValue::Binary`] after decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Null,
    Json(serde_json::Value),
    Binary(Vec<u8>),
    Timestamp(OffsetDateTime),
}

impl AttrValue {
    /// Wrap a JSON value, mapping JSON `null` to [`AttrValue::Null`].
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        if value.is_null() {
            Self::Null
        } else {
            Self::Json(value)
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Falsy in the attribute-storage sense: null, empty text, empty bytes,
    /// `false`, zero, empty containers.
    #[must_use]
    pub fn is_falsy(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Binary(b) => b.is_empty(),
            Self::Timestamp(_) => false,
            Self::Json(v) => match v {
                serde_json::Value::Null => true,
                serde_json::Value::Bool(b) => !b,
                serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
                serde_json::Value::String(s) => s.is_empty(),
                serde_json::Value::Array(a) => a.is_empty(),
                serde_json::Value::Object(o) => o.is_empty(),
            },
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Json(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Json(v) => v.as_i64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<OffsetDateTime> {
        match self {
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Json(serde_json::Value::String(value.to_owned()))
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Json(serde_json::Value::String(value))
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Json(value.into())
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Json(value.into())
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Json(value.into())
    }
}

impl From<Vec<u8>> for AttrValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

impl From<serde_json::Value> for AttrValue {
    fn from(value: serde_json::Value) -> Self {
        Self::from_json(value)
    }
}

impl From<Option<String>> for AttrValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::from)
    }
}

impl From<OffsetDateTime> for AttrValue {
    fn from(value: OffsetDateTime) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Option<OffsetDateTime>> for AttrValue {
    fn from(value: Option<OffsetDateTime>) -> Self {
        value.map_or(Self::Null, Self::Timestamp)
    }
}

/// Attribute name to value.
pub type AttrMap = BTreeMap<String, AttrValue>;

/// Scalar compared by a search criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriterionValue {
    Int(i64),
    Text(String),
}

impl CriterionValue {
    /// Text form used for comparisons against stored values.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for CriterionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for CriterionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for CriterionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for CriterionValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

/// Attribute criteria of a search, keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Criteria(BTreeMap<String, CriterionValue>);

impl Criteria {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<CriterionValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<CriterionValue>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CriterionValue> {
        self.0.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CriterionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<CriterionValue>> FromIterator<(K, V)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Search parameters.
///
/// - `attrlist: None` returns bare ids.
/// - `attrlist: Some(vec![])` returns every attribute of each match.
/// - `attrlist: Some(keys)` returns just `keys`, `Null` where absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub criteria: Criteria,
    pub attrlist: Option<Vec<String>>,
    pub exact_match: bool,
    pub or_search: bool,
}

impl SearchRequest {
    #[must_use]
    pub fn new(criteria: Criteria) -> Self {
        Self {
            criteria,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn exact(mut self) -> Self {
        self.exact_match = true;
        self
    }

    #[must_use]
    pub fn or(mut self) -> Self {
        self.or_search = true;
        self
    }

    #[must_use]
    pub fn attrs<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrlist = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn all_attrs(mut self) -> Self {
        self.attrlist = Some(Vec::new());
        self
    }
}

/// Search outcome, shaped by [`SearchRequest::attrlist`].
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    Ids(Vec<String>),
    WithAttrs(Vec<(String, AttrMap)>),
}

impl SearchResult {
    /// Ids of the matches, regardless of shape.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Self::Ids(ids) => ids.iter().map(String::as_str).collect(),
            Self::WithAttrs(rows) => rows.iter().map(|(id, _)| id.as_str()).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Ids(ids) => ids.len(),
            Self::WithAttrs(rows) => rows.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
