//! Local (in-process) client for the UGM engine.

use std::sync::Arc;

use async_trait::async_trait;
use sql_ugm_sdk::{PrincipalRef, SearchRequest, SearchResult, UgmClientV1, UgmError};

use super::error::DomainError;
use super::node::PrincipalNode;
use super::ugm::Ugm;

/// Local client wrapping one [`Ugm`] root.
#[derive(Debug, Clone)]
pub struct UgmLocalClient {
    ugm: Arc<Ugm>,
}

impl UgmLocalClient {
    #[must_use]
    pub fn new(ugm: Arc<Ugm>) -> Self {
        Self { ugm }
    }

    #[must_use]
    pub fn ugm(&self) -> &Arc<Ugm> {
        &self.ugm
    }
}

fn log_and_convert(op: &str, e: DomainError) -> UgmError {
    tracing::debug!(operation = op, error = ?e, "ugm call failed");
    e.into()
}

#[async_trait]
impl UgmClientV1 for UgmLocalClient {
    async fn authenticate(&self, id: &str, password: &str) -> Result<bool, UgmError> {
        self.ugm
            .users()
            .authenticate(id, password)
            .await
            .map_err(|e| log_and_convert("authenticate", e))
    }

    async fn passwd(&self, id: &str, old: Option<&str>, new: &str) -> Result<(), UgmError> {
        self.ugm
            .users()
            .passwd(id, old, new)
            .await
            .map_err(|e| log_and_convert("passwd", e))
    }

    async fn id_for_login(&self, login: &str) -> Result<String, UgmError> {
        self.ugm
            .users()
            .id_for_login(login)
            .await
            .map_err(|e| log_and_convert("id_for_login", e))
    }

    async fn search_users(&self, request: SearchRequest) -> Result<SearchResult, UgmError> {
        self.ugm
            .users()
            .search(&request)
            .await
            .map_err(|e| log_and_convert("search_users", e))
    }

    async fn search_groups(&self, request: SearchRequest) -> Result<SearchResult, UgmError> {
        self.ugm
            .groups()
            .search(&request)
            .await
            .map_err(|e| log_and_convert("search_groups", e))
    }

    async fn group_ids(&self, user_id: &str) -> Result<Vec<String>, UgmError> {
        let user = self
            .ugm
            .users()
            .get(user_id)
            .await
            .map_err(|e| log_and_convert("group_ids", e))?;
        user.group_ids()
            .await
            .map_err(|e| log_and_convert("group_ids", e))
    }

    async fn member_ids(&self, group_id: &str) -> Result<Vec<String>, UgmError> {
        let group = self
            .ugm
            .groups()
            .get(group_id)
            .await
            .map_err(|e| log_and_convert("member_ids", e))?;
        group
            .member_ids()
            .await
            .map_err(|e| log_and_convert("member_ids", e))
    }

    async fn roles(&self, principal: &PrincipalRef) -> Result<Vec<String>, UgmError> {
        let node = self
            .ugm
            .principal(principal)
            .await
            .map_err(|e| log_and_convert("roles", e))?;
        node.roles().await.map_err(|e| log_and_convert("roles", e))
    }

    async fn add_role(&self, role: &str, principal: &PrincipalRef) -> Result<(), UgmError> {
        let mut node = self
            .ugm
            .principal(principal)
            .await
            .map_err(|e| log_and_convert("add_role", e))?;
        self.ugm
            .add_role(role, &mut node)
            .await
            .map_err(|e| log_and_convert("add_role", e))
    }

    async fn remove_role(&self, role: &str, principal: &PrincipalRef) -> Result<(), UgmError> {
        let mut node = self
            .ugm
            .principal(principal)
            .await
            .map_err(|e| log_and_convert("remove_role", e))?;
        self.ugm
            .remove_role(role, &mut node)
            .await
            .map_err(|e| log_and_convert("remove_role", e))
    }

    async fn apply(&self) -> Result<(), UgmError> {
        self.ugm
            .apply()
            .await
            .map_err(|e| log_and_convert("apply", e))
    }
}
