//! Authorizer port.
//!
//! Authorization is opaque to the core: a capability check is a bool.

use async_trait::async_trait;

use crate::domain::Principal;

/// Resource every translation capability is checked against.
pub const TRANSLATIONS_RESOURCE: &str = "translations";

/// Capability names.
pub mod capability {
    pub const EDIT: &str = "edit";
    pub const APPROVE: &str = "approve";
    pub const MANAGE: &str = "manage";
    pub const IMPORT: &str = "import";
    pub const EXPORT: &str = "export";
}

#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn can(&self, principal: &Principal, action: &str, resource: &str) -> bool;
}
