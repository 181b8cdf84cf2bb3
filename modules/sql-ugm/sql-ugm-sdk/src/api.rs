//! Public API trait for the UGM engine.

use async_trait::async_trait;

use crate::errors::UgmError;
use crate::models::{PrincipalRef, SearchRequest, SearchResult};

/// Contract the host framework binds against.
///
/// One client instance serves one unit of work; writes become durable or
/// merely flushed according to the commit policy checked by [`Self::apply`].
///
/// ```ignore
/// let ok = client.authenticate("phil", "secret").await?;
/// let ids = client
///     .search_users(SearchRequest::new(Criteria::new().with("id", "ph*")))
///     .await?;
/// ```
#[async_trait]
pub trait UgmClientV1: Send + Sync {
    /// Check a password. Unknown users, empty input and unset passwords
    /// yield `Ok(false)`.
    ///
    /// # Errors
    /// Only backend failures.
    async fn authenticate(&self, id: &str, password: &str) -> Result<bool, UgmError>;

    /// Replace a password. `old = None` skips verification of the current one.
    ///
    /// # Errors
    /// - `InvalidCredentials` for an unknown user or a wrong old password
    async fn passwd(&self, id: &str, old: Option<&str>, new: &str) -> Result<(), UgmError>;

    /// Resolve a login value to a user id, falling back to the value itself.
    ///
    /// # Errors
    /// Only backend failures.
    async fn id_for_login(&self, login: &str) -> Result<String, UgmError>;

    /// # Errors
    /// - `Validation` when an exact search matches nothing
    async fn search_users(&self, request: SearchRequest) -> Result<SearchResult, UgmError>;

    /// # Errors
    /// - `Validation` when an exact search matches nothing
    async fn search_groups(&self, request: SearchRequest) -> Result<SearchResult, UgmError>;

    /// # Errors
    /// - `NotFound` for an unknown user
    async fn group_ids(&self, user_id: &str) -> Result<Vec<String>, UgmError>;

    /// # Errors
    /// - `NotFound` for an unknown group
    async fn member_ids(&self, group_id: &str) -> Result<Vec<String>, UgmError>;

    /// Effective roles of a principal.
    ///
    /// # Errors
    /// - `NotFound` for an unknown principal
    async fn roles(&self, principal: &PrincipalRef) -> Result<Vec<String>, UgmError>;

    /// # Errors
    /// - `NotFound` for an unknown principal
    async fn add_role(&self, role: &str, principal: &PrincipalRef) -> Result<(), UgmError>;

    /// # Errors
    /// - `NotFound` for an unknown principal
    async fn remove_role(&self, role: &str, principal: &PrincipalRef) -> Result<(), UgmError>;

    /// Flush or commit pending work according to the commit policy.
    ///
    /// # Errors
    /// Only backend failures.
    async fn apply(&self) -> Result<(), UgmError>;
}
