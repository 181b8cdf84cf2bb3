//! SQL-backed User/Group/Membership (UGM) engine.
//!
//! Users, groups and their memberships are stored in relational tables and
//! exposed through the [`UgmClientV1`] contract.
//!
//! ## Architecture
//!
//! ### Contract Layer (`sql-ugm-sdk`)
//! - `UgmClientV1` trait, search and attribute models, `UgmError`
//!
//! ### Domain Layer (`sql_ugm::domain`)
//! - `ugm.rs` - the root with its `users` and `groups` children
//! - `principals.rs` - collection managers: create, remove, search, passwords
//! - `node.rs` - `User` and `Group` views: attributes, roles, membership
//! - `attributes.rs` - schema columns vs. `data` keys, binary attributes
//! - `repo.rs` - persistence port implemented by the storage layer
//!
//! ### Infrastructure Layer (`sql_ugm::infra`)
//! - `entity/` - `SeaORM` entities for `principal`, `user`, `group` and
//!   `group_assignment`
//! - `principals_repo.rs` - repository and search query builder
//! - `json_path.rs` - backend-specific reads of the `data` JSON column
//! - `migrations/` - schema migrations
//!
//! ## Units of work
//!
//! A [`domain::Ugm`] is built over one [`ugm_db::Session`]. Every write goes
//! into the session's open transaction; `apply()` flushes or commits it
//! according to the shared [`ugm_db::TxMode`].
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

// === PUBLIC API (from SDK) ===
pub use sql_ugm_sdk::{
    AttrMap, AttrValue, Criteria, CriterionValue, PrincipalKind, PrincipalRef, SearchRequest,
    SearchResult, UgmClientV1, UgmError,
};

pub use config::{AppConfig, UgmConfig};
pub use domain::{Group, Groups, Principal, PrincipalNode, Ugm, UgmLocalClient, User, Users};
pub use infra::storage::migrations::Migrator;

// === INTERNAL MODULES ===
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
