//! Error taxonomy.
//!
//! Store- and entity-level errors are narrow enums; `CoreError` is the
//! operation-boundary error every service returns. Each `CoreError` carries a
//! stable text code clients use to localize messages.

use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use thiserror::Error;

use super::assignment::ActiveKey;
use super::state::AssignmentStatus;
use super::transition::TransitionError;

/// A single violated record invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Violation {
    MissingField { field: &'static str },
    SameLocale { locale: String },
    ReasonTooLong { max_bytes: usize, actual_bytes: usize },
    AssigneeRequired { status: AssignmentStatus },
    DuplicateId { id: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingField { field } => write!(f, "{field} is required"),
            Violation::SameLocale { locale } => {
                write!(f, "source and target locale are both '{locale}'")
            }
            Violation::ReasonTooLong {
                max_bytes,
                actual_bytes,
            } => write!(
                f,
                "rejection reason is {actual_bytes} bytes (max {max_bytes})"
            ),
            Violation::AssigneeRequired { status } => {
                write!(f, "direct assignment in status {status} requires an assignee")
            }
            Violation::DuplicateId { id } => write!(f, "id {id} is already taken"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {}", join_violations(.violations))]
pub struct ValidationFailure {
    pub violations: Vec<Violation>,
}

impl ValidationFailure {
    pub fn from_violations(violations: Vec<Violation>) -> Result<(), ValidationFailure> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure { violations })
        }
    }

    pub fn single(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors returned by an [`AssignmentStore`](crate::ports::AssignmentStore).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("assignment {id} not found")]
    NotFound { id: String },

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("active key {key} is already held by {existing_id}")]
    ActiveKeyConflict { existing_id: String, key: ActiveKey },

    #[error("version conflict: expected {expected}, actual {actual}")]
    VersionConflict { expected: u64, actual: u64 },
}

/// Operation-boundary error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("active key {key} is already held by {existing_id}")]
    ActiveKeyConflict { existing_id: String, key: ActiveKey },

    #[error("version conflict: expected {expected}, actual {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("permission denied: {action} on {resource}")]
    PermissionDenied { action: String, resource: String },

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("unsupported exchange format '{format}'")]
    UnsupportedFormat { format: String },

    #[error("invalid {format} payload: {message}")]
    InvalidPayload { format: String, message: String },

    #[error("row {index}: {message}")]
    RowError {
        index: usize,
        text_code: String,
        message: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => CoreError::NotFound {
                resource: "assignment",
                id,
            },
            StoreError::Validation(v) => CoreError::Validation(v),
            StoreError::ActiveKeyConflict { existing_id, key } => {
                CoreError::ActiveKeyConflict { existing_id, key }
            }
            StoreError::VersionConflict { expected, actual } => {
                CoreError::VersionConflict { expected, actual }
            }
        }
    }
}

impl CoreError {
    /// Taxonomy category name.
    pub fn category(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation_failure",
            CoreError::NotFound { .. } => "not_found",
            CoreError::ActiveKeyConflict { .. } => "active_key_conflict",
            CoreError::VersionConflict { .. } => "version_conflict",
            CoreError::PermissionDenied { .. } => "permission_denied",
            CoreError::InvalidTransition(_) => "invalid_transition",
            CoreError::Cancelled => "cancelled",
            CoreError::UnsupportedFormat { .. } => "unsupported_format",
            CoreError::InvalidPayload { .. } => "validation_failure",
            CoreError::RowError { .. } => "row_error",
            CoreError::Internal(_) => "internal",
        }
    }

    pub fn text_code(&self) -> String {
        match self {
            CoreError::Validation(_) => "translation_queue.validation_failed".into(),
            CoreError::NotFound { resource, .. } if *resource == "exchange_job" => {
                "translation_exchange.job_not_found".into()
            }
            CoreError::NotFound { .. } => "translation_queue.not_found".into(),
            CoreError::ActiveKeyConflict { .. } => "translation_queue.active_key_conflict".into(),
            CoreError::VersionConflict { .. } => "translation_queue.version_conflict".into(),
            CoreError::PermissionDenied { .. } => "translation_queue.permission_denied".into(),
            CoreError::InvalidTransition(err) => format!("translation_queue.{}", err.code()),
            CoreError::Cancelled => "translation.cancelled".into(),
            CoreError::UnsupportedFormat { .. } => "translation_exchange.unsupported_format".into(),
            CoreError::InvalidPayload { .. } => "translation_exchange.invalid_payload".into(),
            CoreError::RowError { text_code, .. } => text_code.clone(),
            CoreError::Internal(_) => "translation.internal_error".into(),
        }
    }

    /// HTTP-equivalent status for transports that need one.
    pub fn http_status(&self) -> u16 {
        match self {
            CoreError::Validation(_)
            | CoreError::UnsupportedFormat { .. }
            | CoreError::InvalidPayload { .. } => 400,
            CoreError::PermissionDenied { .. } => 403,
            CoreError::NotFound { .. } => 404,
            CoreError::Cancelled => 408,
            CoreError::ActiveKeyConflict { .. }
            | CoreError::VersionConflict { .. }
            | CoreError::InvalidTransition(_) => 409,
            CoreError::RowError { .. } => 422,
            CoreError::Internal(_) => 500,
        }
    }

    pub fn metadata(&self) -> Option<Value> {
        match self {
            CoreError::Validation(v) => Some(json!({ "violations": v.violations })),
            CoreError::NotFound { resource, id } => Some(json!({ "resource": resource, "id": id })),
            CoreError::ActiveKeyConflict { existing_id, key } => Some(json!({
                "existing_id": existing_id,
                "translation_group_id": key.translation_group_id,
                "entity_type": key.entity_type,
                "source_locale": key.source_locale,
                "target_locale": key.target_locale,
            })),
            CoreError::VersionConflict { expected, actual } => {
                Some(json!({ "expected": expected, "actual": actual }))
            }
            CoreError::PermissionDenied { action, resource } => {
                Some(json!({ "permission": action, "resource": resource }))
            }
            CoreError::InvalidTransition(err) => Some(err.metadata()),
            CoreError::UnsupportedFormat { format } | CoreError::InvalidPayload { format, .. } => {
                Some(json!({ "format": format }))
            }
            CoreError::RowError { index, .. } => Some(json!({ "index": index })),
            CoreError::Cancelled | CoreError::Internal(_) => None,
        }
    }

    /// Whether a caller may retry without inspecting anything first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::VersionConflict { .. })
    }
}

/// `{error:{text_code, message, metadata?}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
    #[serde(skip)]
    pub http_status: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub text_code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl From<&CoreError> for ErrorEnvelope {
    fn from(err: &CoreError) -> Self {
        Self {
            error: ErrorBody {
                text_code: err.text_code(),
                message: err.to_string(),
                metadata: err.metadata(),
            },
            http_status: err.http_status(),
        }
    }
}

impl From<CoreError> for ErrorEnvelope {
    fn from(err: CoreError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_the_core_taxonomy() {
        let err: CoreError = StoreError::VersionConflict {
            expected: 1,
            actual: 2,
        }
        .into();
        assert_eq!(err.category(), "version_conflict");
        assert_eq!(err.http_status(), 409);
        assert!(err.is_retryable());
        assert_eq!(err.metadata(), Some(json!({ "expected": 1, "actual": 2 })));
    }

    #[test]
    fn envelope_serializes_without_status() {
        let env = ErrorEnvelope::from(CoreError::UnsupportedFormat {
            format: "xml".into(),
        });
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(
            value["error"]["text_code"],
            "translation_exchange.unsupported_format"
        );
        assert_eq!(value["error"]["metadata"]["format"], "xml");
        assert!(value.get("http_status").is_none());
        assert_eq!(env.http_status, 400);
    }

    #[test]
    fn job_not_found_has_its_own_code() {
        let err = CoreError::NotFound {
            resource: "exchange_job",
            id: "txj_1".into(),
        };
        assert_eq!(err.text_code(), "translation_exchange.job_not_found");
    }

    #[test]
    fn validation_message_lists_every_violation() {
        let failure = ValidationFailure {
            violations: vec![
                Violation::MissingField { field: "entity_type" },
                Violation::SameLocale { locale: "en".into() },
            ],
        };
        let message = failure.to_string();
        assert!(message.contains("entity_type is required"));
        assert!(message.contains("'en'"));
    }
}
