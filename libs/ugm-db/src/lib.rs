//! Database plumbing for the SQL-backed UGM engine.
//!
//! ## Overview
//!
//! - [`session`] - one [`Session`] per unit of work: a lazily begun transaction
//!   plus the flush/commit/rollback/close lifecycle.
//! - [`factory`] - [`SessionFactory`] opens sessions, runs registered setup
//!   handlers and closes scoped sessions on every exit path.
//! - [`guid`] - portable identifier codec used for principal keys.
//! - [`migration_runner`] - applies `sea-orm-migration` migrations with
//!   bookkeeping of applied versions.
//!
//! ## Commit policy
//!
//! Whether an `apply` flushes or commits is decided by a shared [`TxMode`]
//! handle. The handle is read on every apply, so toggling it at runtime takes
//! effect immediately for every session that shares it.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod error;
pub mod factory;
pub mod guid;
pub mod migration_runner;
pub mod session;

pub use config::{ConnectOpts, DbConfig};
pub use error::DbError;
pub use factory::{SessionFactory, SetupHandler, connect_db};
pub use session::{Session, TxMode};
