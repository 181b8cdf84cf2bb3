//! Public contract of the SQL-backed user/group/membership module.
//!
//! Host applications bind against [`UgmClientV1`]; the engine crate provides
//! the implementation. Only plain models and [`UgmError`] cross this boundary.

pub mod api;
pub mod errors;
pub mod models;

pub use api::UgmClientV1;
pub use errors::UgmError;
pub use models::{
    AttrMap, AttrValue, Criteria, CriterionValue, PrincipalKind, PrincipalRef, SearchRequest,
    SearchResult,
};
