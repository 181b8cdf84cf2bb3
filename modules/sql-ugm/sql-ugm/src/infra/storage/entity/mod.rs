//! `SeaORM` entities of the principal schema.
//!
//! Users and groups share the `principal` table, keyed by `guid`; the subtype
//! tables join to it on the same key.

pub mod group;
pub mod group_assignment;
pub mod principal;
pub mod user;

/// Discriminator values stored in `principal.discriminator`.
pub const USER_DISCRIMINATOR: &str = "sqluser";
pub const GROUP_DISCRIMINATOR: &str = "sqlgroup";
