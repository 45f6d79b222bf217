//! ContentStore port - translatable content behind the exchange pipeline.
//!
//! Sources are addressed by `(resource, entity_id, field_path)`; targets by
//! `(resource, translation_group_id, target_locale, field_path)`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::CoreError;

/// Current state of one source field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceField {
    pub resource: String,
    pub entity_id: String,
    pub translation_group_id: String,
    pub source_locale: String,
    pub field_path: String,
    pub text: String,
    /// `hex(sha256(text))`
    pub hash: String,
    pub version: u64,
    /// Fields touched by the latest source revision.
    #[serde(default)]
    pub changed_fields: Vec<String>,
}

/// Current state of one translated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetField {
    pub record_id: String,
    pub text: String,
    pub row_version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetWrite {
    pub resource: String,
    pub translation_group_id: String,
    pub target_locale: String,
    pub field_path: String,
    pub text: String,
    /// Create the target record when it does not exist yet.
    pub create_missing: bool,
    /// Row version the caller last saw; a field never written is version 0.
    pub expected_row_version: Option<u64>,
}

/// Export selection. Empty lists mean "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFilter {
    pub resources: Vec<String>,
    pub entity_ids: Vec<String>,
    pub translation_group_ids: Vec<String>,
    pub source_locale: Option<String>,
}

impl SourceFilter {
    pub fn matches(&self, field: &SourceField) -> bool {
        let any_or = |list: &[String], value: &str| list.is_empty() || list.iter().any(|v| v == value);
        any_or(&self.resources, &field.resource)
            && any_or(&self.entity_ids, &field.entity_id)
            && any_or(&self.translation_group_ids, &field.translation_group_id)
            && self
                .source_locale
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .is_none_or(|l| l.eq_ignore_ascii_case(&field.source_locale))
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn source_field(
        &self,
        resource: &str,
        entity_id: &str,
        field_path: &str,
    ) -> Result<Option<SourceField>, CoreError>;

    async fn target_field(
        &self,
        resource: &str,
        translation_group_id: &str,
        target_locale: &str,
        field_path: &str,
    ) -> Result<Option<TargetField>, CoreError>;

    /// Whether any target record exists for the locale, regardless of field.
    async fn target_exists(
        &self,
        resource: &str,
        translation_group_id: &str,
        target_locale: &str,
    ) -> Result<bool, CoreError>;

    /// Writes one field and bumps its row version.
    ///
    /// Fails with `row_error` / `translation_exchange.missing_target` when the
    /// record is absent and `create_missing` is false, and with
    /// `CoreError::VersionConflict` when `expected_row_version` no longer
    /// matches. The compare and the write happen atomically.
    async fn write_target(&self, write: TargetWrite) -> Result<TargetField, CoreError>;

    /// Source fields matching `filter`, in a stable order.
    async fn list_sources(&self, filter: &SourceFilter) -> Result<Vec<SourceField>, CoreError>;
}
