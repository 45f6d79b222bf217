//! Authorization gate.
//!
//! Capabilities are resolved once per request into [`Capabilities`]; row
//! projections then derive `review_actions` without touching the authorizer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::contracts::DisabledReasonCode;
use crate::domain::{AssignmentStatus, CoreError, Principal};
use crate::ports::{Authorizer, TRANSLATIONS_RESOURCE, capability};

/// `{enabled, permission?, reason?, reason_code?}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionState {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<DisabledReasonCode>,
}

impl ActionState {
    fn enabled(permission: &str) -> Self {
        Self {
            enabled: true,
            permission: Some(qualified(permission)),
            reason: None,
            reason_code: None,
        }
    }

    fn disabled(permission: &str, code: DisabledReasonCode, reason: String) -> Self {
        Self {
            enabled: false,
            permission: Some(qualified(permission)),
            reason: Some(reason),
            reason_code: Some(code),
        }
    }
}

fn qualified(permission: &str) -> String {
    format!("{TRANSLATIONS_RESOURCE}.{permission}")
}

/// `review_actions` map rendered on every queue row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewActions {
    pub submit_review: ActionState,
    pub approve: ActionState,
    pub reject: ActionState,
}

/// Capability bits that drive row-level action states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub edit: bool,
    pub approve: bool,
}

impl Capabilities {
    pub fn review_actions(self, status: AssignmentStatus) -> ReviewActions {
        ReviewActions {
            submit_review: action_state(
                capability::EDIT,
                self.edit,
                status == AssignmentStatus::InProgress,
                "submit_review",
                status,
            ),
            approve: action_state(
                capability::APPROVE,
                self.approve,
                status == AssignmentStatus::Review,
                "approve",
                status,
            ),
            reject: action_state(
                capability::APPROVE,
                self.approve,
                status == AssignmentStatus::Review,
                "reject",
                status,
            ),
        }
    }
}

fn action_state(
    permission: &str,
    allowed: bool,
    status_ok: bool,
    action: &str,
    status: AssignmentStatus,
) -> ActionState {
    if !allowed {
        ActionState::disabled(
            permission,
            DisabledReasonCode::PermissionDenied,
            format!("missing {} permission", qualified(permission)),
        )
    } else if !status_ok {
        ActionState::disabled(
            permission,
            DisabledReasonCode::InvalidStatus,
            format!("cannot {action} while {status}"),
        )
    } else {
        ActionState::enabled(permission)
    }
}

/// Wraps an optional [`Authorizer`]. No authorizer means allow.
#[derive(Clone, Default)]
pub struct Gate {
    authorizer: Option<Arc<dyn Authorizer>>,
}

impl Gate {
    pub fn new(authorizer: Option<Arc<dyn Authorizer>>) -> Self {
        Self { authorizer }
    }

    pub async fn can(&self, principal: &Principal, permission: &str) -> bool {
        match &self.authorizer {
            Some(authorizer) => {
                authorizer
                    .can(principal, permission, TRANSLATIONS_RESOURCE)
                    .await
            }
            None => true,
        }
    }

    pub async fn require(&self, principal: &Principal, permission: &str) -> Result<(), CoreError> {
        if self.can(principal, permission).await {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied {
                action: permission.to_string(),
                resource: TRANSLATIONS_RESOURCE.to_string(),
            })
        }
    }

    pub async fn capabilities(&self, principal: &Principal) -> Capabilities {
        Capabilities {
            edit: self.can(principal, capability::EDIT).await,
            approve: self.can(principal, capability::APPROVE).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::RoleAuthorizer;
    use rstest::rstest;

    #[rstest]
    #[case(AssignmentStatus::InProgress, true, false, false)]
    #[case(AssignmentStatus::Review, false, true, true)]
    #[case(AssignmentStatus::Pending, false, false, false)]
    fn enabled_actions_follow_status(
        #[case] status: AssignmentStatus,
        #[case] submit: bool,
        #[case] approve: bool,
        #[case] reject: bool,
    ) {
        let caps = Capabilities {
            edit: true,
            approve: true,
        };
        let actions = caps.review_actions(status);
        assert_eq!(actions.submit_review.enabled, submit);
        assert_eq!(actions.approve.enabled, approve);
        assert_eq!(actions.reject.enabled, reject);
    }

    #[test]
    fn permission_is_reported_before_status() {
        let actions = Capabilities::default().review_actions(AssignmentStatus::Pending);
        assert_eq!(
            actions.approve.reason_code,
            Some(DisabledReasonCode::PermissionDenied)
        );

        let editor = Capabilities {
            edit: true,
            approve: false,
        };
        let actions = editor.review_actions(AssignmentStatus::Review);
        assert_eq!(
            actions.submit_review.reason_code,
            Some(DisabledReasonCode::InvalidStatus)
        );
        assert_eq!(
            actions.approve.permission.as_deref(),
            Some("translations.approve")
        );
    }

    #[test]
    fn enabled_state_serializes_without_reason() {
        let caps = Capabilities {
            edit: true,
            approve: true,
        };
        let value = serde_json::to_value(caps.review_actions(AssignmentStatus::Review)).unwrap();
        assert_eq!(value["approve"]["enabled"], true);
        assert!(value["approve"].get("reason_code").is_none());
        assert_eq!(value["submit_review"]["reason_code"], "invalid_status");
    }

    #[tokio::test]
    async fn gate_without_authorizer_allows_everything() {
        let gate = Gate::default();
        let p = Principal::new("u1");
        assert!(gate.require(&p, capability::MANAGE).await.is_ok());
    }

    #[tokio::test]
    async fn gate_denies_missing_capabilities() {
        let authz = RoleAuthorizer::new().grant("translator", capability::EDIT, TRANSLATIONS_RESOURCE);
        let gate = Gate::new(Some(Arc::new(authz)));
        let p = Principal::new("u1").with_roles(["translator"]);

        let caps = gate.capabilities(&p).await;
        assert!(caps.edit);
        assert!(!caps.approve);

        let err = gate.require(&p, capability::APPROVE).await.unwrap_err();
        assert_eq!(err.http_status(), 403);
        assert_eq!(err.text_code(), "translation_queue.permission_denied");
    }
}
