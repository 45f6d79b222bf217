//! Exchange rows, per-row results and asynchronous jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// One field-level translation record exchanged in bulk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeRow {
    pub resource: String,
    pub entity_id: String,
    pub translation_group_id: String,
    pub target_locale: String,
    pub field_path: String,
    pub source_text: String,
    pub source_hash: String,
    pub translated_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RowStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<RowConflict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ExchangeRow {
    /// `metadata.row_version`, if the client echoed one back.
    pub fn row_version(&self) -> Option<u64> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("row_version"))
            .and_then(|v| {
                v.as_u64()
                    .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Success,
    Error,
    Conflict,
    Skipped,
}

impl RowStatus {
    pub const ALL: [RowStatus; 4] = [
        RowStatus::Success,
        RowStatus::Error,
        RowStatus::Conflict,
        RowStatus::Skipped,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RowStatus::Success => "success",
            RowStatus::Error => "error",
            RowStatus::Conflict => "conflict",
            RowStatus::Skipped => "skipped",
        }
    }

    /// Unknown values normalize to `error`.
    pub fn normalize(value: &str) -> Self {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .unwrap_or(RowStatus::Error)
    }
}

/// Conflict classification. Unknown wire values fall back to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    MissingLinkage,
    SourceHashDrift,
    RowVersionConflict,
    #[serde(other)]
    Unknown,
}

impl ConflictType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictType::MissingLinkage => "missing_linkage",
            ConflictType::SourceHashDrift => "source_hash_drift",
            ConflictType::RowVersionConflict => "row_version_conflict",
            ConflictType::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "missing_linkage" => ConflictType::MissingLinkage,
            "source_hash_drift" => ConflictType::SourceHashDrift,
            "row_version_conflict" => ConflictType::RowVersionConflict,
            _ => ConflictType::Unknown,
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowConflict {
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Outcome of one input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowResult {
    pub index: usize,
    pub resource: String,
    pub entity_id: String,
    pub translation_group_id: String,
    pub target_locale: String,
    pub field_path: String,
    pub status: RowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RowFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict: Option<RowConflict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Typed failure of one row; `text_code` is what clients localize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFailure {
    pub text_code: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeSummary {
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub conflicts: usize,
    pub skipped: usize,
}

impl ExchangeSummary {
    pub fn record(&mut self, status: RowStatus) {
        self.processed += 1;
        match status {
            RowStatus::Success => self.succeeded += 1,
            RowStatus::Error => self.failed += 1,
            RowStatus::Conflict => self.conflicts += 1,
            RowStatus::Skipped => self.skipped += 1,
        }
    }

    /// A row left untouched after an early stop: skipped, not processed.
    pub fn record_unprocessed(&mut self) {
        self.skipped += 1;
    }

    pub fn progress(&self) -> JobProgress {
        JobProgress {
            processed: self.processed,
            succeeded: self.succeeded,
            failed: self.failed + self.conflicts,
        }
    }
}

/// `{total_conflicts, by_type, rows[]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictSummary {
    pub total_conflicts: usize,
    pub by_type: BTreeMap<ConflictType, usize>,
    pub rows: Vec<RowResult>,
}

impl ConflictSummary {
    pub fn from_results(results: &[RowResult]) -> Self {
        let mut summary = ConflictSummary::default();
        for row in results.iter().filter(|r| r.status == RowStatus::Conflict) {
            let conflict_type = row
                .conflict
                .as_ref()
                .map(|c| c.conflict_type)
                .unwrap_or(ConflictType::Unknown);
            *summary.by_type.entry(conflict_type).or_default() += 1;
            summary.total_conflicts += 1;
            summary.rows.push(row.clone());
        }
        summary
    }
}

/// Flags controlling validate/apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeOptions {
    pub allow_create_missing: bool,
    pub allow_source_hash_override: bool,
    pub continue_on_error: bool,
    pub dry_run: bool,
    /// Run as a background job and return its handle.
    #[serde(rename = "async")]
    pub run_async: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeFormat {
    Csv,
    Json,
}

impl ExchangeFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExchangeFormat::Csv => "csv",
            ExchangeFormat::Json => "json",
        }
    }

    /// Accepts a bare format name or a MIME type.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" | "text/csv" => Some(ExchangeFormat::Csv),
            "json" | "application/json" => Some(ExchangeFormat::Json),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExchangeFormat::Csv => "text/csv",
            ExchangeFormat::Json => "application/json",
        }
    }
}

/// `{summary, results[], conflict_summary, job?}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangeReport {
    pub summary: ExchangeSummary,
    pub results: Vec<RowResult>,
    pub conflict_summary: ConflictSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<ExchangeJob>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    ImportValidate,
    ImportApply,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::ImportValidate => "import_validate",
            JobKind::ImportApply => "import_apply",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 3] = [JobStatus::Running, JobStatus::Completed, JobStatus::Failed];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Unknown values normalize to `failed`.
    pub fn normalize(value: &str) -> Self {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .unwrap_or(JobStatus::Failed)
    }

    pub fn is_finished(self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Asynchronous exchange job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeJob {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub permission: String,
    pub created_by: String,
    pub poll_endpoint: String,
    pub progress: JobProgress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RowFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
