//! Activity records published to the audit sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Activity action names.
pub mod actions {
    pub const ASSIGNMENT_CREATED: &str = "translation.assignment.created";
    pub const ASSIGNMENT_REFRESHED: &str = "translation.assignment.refreshed";
    pub const IMPORT_VALIDATED: &str = "translation.exchange.import.validated";
    pub const IMPORT_APPLIED: &str = "translation.exchange.import.applied";
    pub const IMPORT_VALIDATED_CONFLICT: &str = "translation.exchange.import.validated_conflict";
    pub const IMPORT_APPLIED_CONFLICT: &str = "translation.exchange.import.applied_conflict";
    pub const IMPORT_FAILED: &str = "translation.exchange.import.failed";
    pub const EXPORTED: &str = "translation.exchange.exported";

    /// `translation.assignment.<action>` for a lifecycle transition.
    pub fn assignment(action: &str) -> String {
        format!("translation.assignment.{action}")
    }
}

/// `{actor, action, object, metadata, created_at}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub actor: String,
    pub action: String,
    pub object: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn assignment_object(id: &str) -> String {
        format!("translation_assignment:{id}")
    }

    pub fn exchange_object(id: &str) -> String {
        format!("translation_exchange:{id}")
    }
}
