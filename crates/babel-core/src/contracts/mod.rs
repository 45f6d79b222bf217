//! Shared contracts: the versioned vocabulary server and client both render.
//!
//! [`SharedContracts::current`] is the document served to clients; the enums
//! it lists are the ones every projection in this crate emits.

pub mod drift;
pub mod vocabulary;

pub use drift::{ChangedFieldsSummary, SourceTargetDrift, source_hash};
pub use vocabulary::{
    ContentState, DisabledReasonCode, DueState, ReadinessState, SCHEMA_VERSION,
    normalize_queue_state,
};

use serde::Serialize;

use crate::domain::{AssignmentStatus, JobStatus, RowStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedContracts {
    pub schema_version: u32,
    pub status_enums: StatusEnums,
    pub disabled_reason_codes: Vec<&'static str>,
    pub source_target_drift: DriftContract,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEnums {
    pub core: CoreEnums,
    pub queue: QueueEnums,
    pub exchange: ExchangeEnums,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoreEnums {
    pub readiness_state: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEnums {
    pub queue_state: Vec<&'static str>,
    pub content_state: Vec<&'static str>,
    pub due_state: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeEnums {
    pub row_status: Vec<&'static str>,
    pub job_status: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftContract {
    pub required_fields: Vec<&'static str>,
    pub changed_fields_summary: Vec<&'static str>,
}

impl SharedContracts {
    pub fn current() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            status_enums: StatusEnums {
                core: CoreEnums {
                    readiness_state: ReadinessState::ALL.iter().map(|s| s.as_str()).collect(),
                },
                queue: QueueEnums {
                    queue_state: AssignmentStatus::ALL.iter().map(|s| s.as_str()).collect(),
                    content_state: ContentState::ALL.iter().map(|s| s.as_str()).collect(),
                    due_state: DueState::ALL.iter().map(|s| s.as_str()).collect(),
                },
                exchange: ExchangeEnums {
                    row_status: RowStatus::ALL.iter().map(|s| s.as_str()).collect(),
                    job_status: JobStatus::ALL.iter().map(|s| s.as_str()).collect(),
                },
            },
            disabled_reason_codes: DisabledReasonCode::ALL.iter().map(|c| c.as_str()).collect(),
            source_target_drift: DriftContract {
                required_fields: drift::REQUIRED_FIELDS.to_vec(),
                changed_fields_summary: drift::SUMMARY_FIELDS.to_vec(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_document_has_the_expected_shape() {
        let doc = serde_json::to_value(SharedContracts::current()).unwrap();
        assert_eq!(doc["schema_version"], 1);
        assert_eq!(doc["status_enums"]["queue"]["queue_state"][0], "pending");
        assert_eq!(
            doc["status_enums"]["queue"]["content_state"],
            serde_json::json!(["draft", "review", "ready", "archived"])
        );
        assert_eq!(
            doc["status_enums"]["queue"]["due_state"],
            serde_json::json!(["overdue", "due_soon", "on_track", "none"])
        );
        assert_eq!(
            doc["status_enums"]["exchange"]["job_status"],
            serde_json::json!(["running", "completed", "failed"])
        );
        assert_eq!(
            doc["disabled_reason_codes"],
            serde_json::json!(["permission_denied", "invalid_status"])
        );
        assert_eq!(
            doc["source_target_drift"]["required_fields"],
            serde_json::json!(["source_hash", "source_version", "changed_fields_summary"])
        );
    }

    #[test]
    fn queue_states_mirror_assignment_statuses() {
        let contracts = SharedContracts::current();
        assert_eq!(contracts.status_enums.queue.queue_state.len(), 8);
        assert!(contracts.status_enums.queue.queue_state.contains(&"archived"));
    }
}
