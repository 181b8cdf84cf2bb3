use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::Path;

use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use ugm_db::DbConfig;

use crate::domain::password::DEFAULT_SALT_LEN;

/// Prefix of environment overrides, e.g. `UGM__DB__URL` or `UGM__UGM__LOG_AUTH`.
pub const ENV_PREFIX: &str = "UGM__";

/// UGM engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UgmConfig {
    /// Attribute names exposed for users; empty means schema plus stored keys.
    pub user_attrs: Vec<String>,
    /// Attribute names exposed for groups; empty means schema plus stored keys.
    pub group_attrs: Vec<String>,
    /// Attributes stored base64-encoded.
    pub binary_attrs: Vec<String>,
    /// Stamp `first_login` / `last_login` on successful authentication.
    pub log_auth: bool,
    /// Salt length of password hashes. Must stay fixed per deployment.
    pub salt_len: usize,
}

impl Default for UgmConfig {
    fn default() -> Self {
        Self {
            user_attrs: Vec::new(),
            group_attrs: Vec::new(),
            binary_attrs: Vec::new(),
            log_auth: false,
            salt_len: DEFAULT_SALT_LEN,
        }
    }
}

impl UgmConfig {
    /// Read the flat `sql.*` settings of the host framework.
    ///
    /// Unknown keys are ignored; missing keys keep their defaults.
    #[must_use]
    pub fn from_settings<S: BuildHasher>(settings: &HashMap<String, String, S>) -> Self {
        let list = |key: &str| {
            settings
                .get(key)
                .map(|raw| split_list(raw))
                .unwrap_or_default()
        };
        Self {
            user_attrs: list("sql.user_attrs"),
            group_attrs: list("sql.group_attrs"),
            binary_attrs: list("sql.binary_attrs"),
            log_auth: settings
                .get("sql.log_auth")
                .is_some_and(|v| matches!(v.trim(), "true" | "True" | "1")),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_binary(&self, name: &str) -> bool {
        self.binary_attrs.iter().any(|a| a == name)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Full configuration of a UGM deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub db: DbConfig,
    pub ugm: UgmConfig,
}

impl AppConfig {
    /// Defaults, then the YAML file at `path` if given, then `UGM__*`
    /// environment variables.
    ///
    /// # Errors
    /// Returns an error when a source cannot be parsed or a value has the
    /// wrong shape.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("failed to load UGM configuration")
    }
}
