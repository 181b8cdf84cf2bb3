//! Domain layer of the UGM engine.

pub mod attributes;
pub mod context;
pub mod error;
pub mod local_client;
pub mod node;
pub mod password;
pub mod principals;
pub mod repo;
pub mod stored;
pub mod ugm;

pub use error::DomainError;
pub use local_client::UgmLocalClient;
pub use node::{Group, PrincipalNode, User};
pub use principals::{Groups, Users};
pub use ugm::{Principal, Ugm, UgmChild};

#[cfg(test)]
mod tests_membership;

#[cfg(test)]
mod tests_search;

#[cfg(test)]
mod tests_auth;
