//! Assignment state machine.
//!
//! `apply_transition` is a pure function: it takes the current record and an
//! action and returns the next record. Persisting it (and bumping the version)
//! is the store's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use thiserror::Error;

use super::assignment::{Assignment, MAX_REJECTION_REASON_BYTES};
use super::state::AssignmentStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    Assign,
    Claim,
    Release,
    SubmitReview,
    Approve,
    Reject,
    Resume,
    Publish,
    Archive,
}

impl TransitionAction {
    pub const ALL: [TransitionAction; 9] = [
        TransitionAction::Assign,
        TransitionAction::Claim,
        TransitionAction::Release,
        TransitionAction::SubmitReview,
        TransitionAction::Approve,
        TransitionAction::Reject,
        TransitionAction::Resume,
        TransitionAction::Publish,
        TransitionAction::Archive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransitionAction::Assign => "assign",
            TransitionAction::Claim => "claim",
            TransitionAction::Release => "release",
            TransitionAction::SubmitReview => "submit_review",
            TransitionAction::Approve => "approve",
            TransitionAction::Reject => "reject",
            TransitionAction::Resume => "resume",
            TransitionAction::Publish => "publish",
            TransitionAction::Archive => "archive",
        }
    }

    /// Statuses the action may start from.
    pub fn allowed_from(self) -> &'static [AssignmentStatus] {
        use AssignmentStatus::*;
        match self {
            TransitionAction::Assign => &[Pending],
            TransitionAction::Claim => &[Pending, Assigned],
            TransitionAction::Release => &[Assigned, InProgress],
            TransitionAction::SubmitReview => &[InProgress],
            TransitionAction::Approve | TransitionAction::Reject => &[Review],
            TransitionAction::Resume => &[Rejected],
            TransitionAction::Publish => &[Approved],
            TransitionAction::Archive => &[
                Pending, Assigned, InProgress, Review, Rejected, Approved, Published,
            ],
        }
    }

    pub fn target(self) -> AssignmentStatus {
        match self {
            TransitionAction::Assign => AssignmentStatus::Assigned,
            TransitionAction::Claim | TransitionAction::Resume => AssignmentStatus::InProgress,
            TransitionAction::Release => AssignmentStatus::Pending,
            TransitionAction::SubmitReview => AssignmentStatus::Review,
            TransitionAction::Approve => AssignmentStatus::Approved,
            TransitionAction::Reject => AssignmentStatus::Rejected,
            TransitionAction::Publish => AssignmentStatus::Published,
            TransitionAction::Archive => AssignmentStatus::Archived,
        }
    }
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs an action may need besides the record itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionPayload {
    /// Principal performing the action.
    pub actor_id: String,
    /// Required by `assign`.
    pub assignee_id: Option<String>,
    /// Required by `reject`.
    pub reason: Option<String>,
}

impl TransitionPayload {
    pub fn by(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            ..Default::default()
        }
    }

    pub fn with_assignee(mut self, assignee_id: impl Into<String>) -> Self {
        self.assignee_id = Some(assignee_id.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {action} an assignment in status {from}")]
    InvalidStatus {
        action: TransitionAction,
        from: AssignmentStatus,
    },

    #[error("{action} requires {field}")]
    MissingPayload {
        action: TransitionAction,
        field: &'static str,
    },

    #[error("{action} is reserved for the assignee")]
    PermissionRequired { action: TransitionAction },
}

impl TransitionError {
    pub fn code(&self) -> &'static str {
        match self {
            TransitionError::InvalidStatus { .. } => "invalid_status",
            TransitionError::MissingPayload { .. } => "missing_payload",
            TransitionError::PermissionRequired { .. } => "permission_required",
        }
    }

    pub fn metadata(&self) -> Value {
        match self {
            TransitionError::InvalidStatus { action, from } => {
                json!({ "action": action, "status": from })
            }
            TransitionError::MissingPayload { action, field } => {
                json!({ "action": action, "field": field })
            }
            TransitionError::PermissionRequired { action } => json!({ "action": action }),
        }
    }
}

/// Computes the record that results from `action`.
pub fn apply_transition(
    current: &Assignment,
    action: TransitionAction,
    payload: &TransitionPayload,
    now: DateTime<Utc>,
) -> Result<Assignment, TransitionError> {
    if !action.allowed_from().contains(&current.status) {
        return Err(TransitionError::InvalidStatus {
            action,
            from: current.status,
        });
    }

    let actor = payload.actor_id.trim();
    let mut next = current.clone();
    next.status = action.target();

    match action {
        TransitionAction::Assign => {
            let assignee = non_blank(payload.assignee_id.as_deref()).ok_or(
                TransitionError::MissingPayload {
                    action,
                    field: "assignee_id",
                },
            )?;
            next.assignee_id = Some(assignee.to_string());
            next.assigner_id = non_blank(Some(actor)).map(str::to_string);
        }
        TransitionAction::Claim => {
            match current.assignee_id.as_deref() {
                Some(assignee) if current.status == AssignmentStatus::Assigned => {
                    if !actor.is_empty() && actor != assignee {
                        return Err(TransitionError::PermissionRequired { action });
                    }
                }
                _ => {
                    let claimant = non_blank(Some(actor)).ok_or(
                        TransitionError::MissingPayload {
                            action,
                            field: "actor_id",
                        },
                    )?;
                    next.assignee_id = Some(claimant.to_string());
                }
            }
            next.claimed_at = Some(now);
        }
        TransitionAction::Release => {
            next.assignee_id = None;
        }
        TransitionAction::SubmitReview => {
            if let Some(assignee) = current.assignee_id.as_deref() {
                if !actor.is_empty() && actor != assignee {
                    return Err(TransitionError::PermissionRequired { action });
                }
            }
            next.submitted_at = Some(now);
        }
        TransitionAction::Approve => {
            next.approved_at = Some(now);
            next.last_reviewer_id = non_blank(Some(actor)).map(str::to_string);
        }
        TransitionAction::Reject => {
            let reason = non_blank(payload.reason.as_deref()).ok_or(
                TransitionError::MissingPayload {
                    action,
                    field: "reason",
                },
            )?;
            next.last_rejection_reason = truncate_to_bytes(reason, MAX_REJECTION_REASON_BYTES);
            next.last_reviewer_id = non_blank(Some(actor)).map(str::to_string);
        }
        TransitionAction::Resume => {}
        TransitionAction::Publish => {
            next.published_at = Some(now);
        }
        TransitionAction::Archive => {
            next.archived_at = Some(now);
        }
    }

    Ok(next)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Cuts `value` to at most `max` bytes without splitting a character.
pub fn truncate_to_bytes(value: &str, max: usize) -> String {
    if value.len() <= max {
        return value.to_string();
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}
