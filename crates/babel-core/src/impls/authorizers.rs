//! Authorizer 実装
//!
//! - **AllowAll**: 常に許可（authorizer 未設定時と同じ）
//! - **RoleAuthorizer**: role → capability の静的マップ

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::domain::Principal;
use crate::ports::Authorizer;

#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn can(&self, _principal: &Principal, _action: &str, _resource: &str) -> bool {
        true
    }
}

/// Grants `(capability, resource)` pairs per role.
#[derive(Debug, Clone, Default)]
pub struct RoleAuthorizer {
    grants: HashMap<String, HashSet<(String, String)>>,
}

impl RoleAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, role: &str, action: &str, resource: &str) -> Self {
        self.grants
            .entry(role.to_string())
            .or_default()
            .insert((action.to_string(), resource.to_string()));
        self
    }
}

#[async_trait]
impl Authorizer for RoleAuthorizer {
    async fn can(&self, principal: &Principal, action: &str, resource: &str) -> bool {
        let wanted = (action.to_string(), resource.to_string());
        principal
            .roles
            .iter()
            .filter_map(|role| self.grants.get(role))
            .any(|grants| grants.contains(&wanted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{TRANSLATIONS_RESOURCE, capability};

    #[tokio::test]
    async fn roles_grant_capabilities() {
        let authz = RoleAuthorizer::new()
            .grant("translator", capability::EDIT, TRANSLATIONS_RESOURCE)
            .grant("reviewer", capability::APPROVE, TRANSLATIONS_RESOURCE);

        let translator = Principal::new("u1").with_roles(["translator"]);
        assert!(authz.can(&translator, capability::EDIT, TRANSLATIONS_RESOURCE).await);
        assert!(!authz.can(&translator, capability::APPROVE, TRANSLATIONS_RESOURCE).await);
        assert!(!authz.can(&translator, capability::EDIT, "pages").await);

        let nobody = Principal::new("u2");
        assert!(!authz.can(&nobody, capability::EDIT, TRANSLATIONS_RESOURCE).await);
        assert!(AllowAll.can(&nobody, capability::MANAGE, TRANSLATIONS_RESOURCE).await);
    }
}
