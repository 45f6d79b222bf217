//! Translation assignment record.
//!
//! One assignment is one unit of translation work for a (source locale,
//! target locale) pair of a content entity. The record is the single source of
//! truth for its state; transitions live in [`super::transition`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{ValidationFailure, Violation};
use super::state::AssignmentStatus;

/// Maximum size of `last_rejection_reason`, in bytes.
pub const MAX_REJECTION_REASON_BYTES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentType {
    Direct,
    OpenPool,
}

impl AssignmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentType::Direct => "direct",
            AssignmentType::OpenPool => "open_pool",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "direct" => Some(AssignmentType::Direct),
            "open_pool" => Some(AssignmentType::OpenPool),
            _ => None,
        }
    }
}

/// Work priority. Ordering follows urgency (`Low < Normal < High < Urgent`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "normal" => Some(Priority::Normal),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

/// `(translation_group_id, entity_type, source_locale, target_locale)`.
///
/// Unique among non-terminal assignments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveKey {
    pub translation_group_id: String,
    pub entity_type: String,
    pub source_locale: String,
    pub target_locale: String,
}

impl fmt::Display for ActiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}->{}",
            self.translation_group_id, self.entity_type, self.source_locale, self.target_locale
        )
    }
}

/// A persisted translation assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub translation_group_id: String,
    pub entity_type: String,
    pub source_record_id: String,
    pub target_record_id: String,
    pub source_locale: String,
    pub target_locale: String,
    pub source_title: String,
    pub source_path: String,
    pub assignment_type: AssignmentType,
    pub status: AssignmentStatus,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<String>,
    pub assigner_id: Option<String>,
    pub last_reviewer_id: Option<String>,
    pub last_rejection_reason: String,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Assignment {
    pub fn active_key(&self) -> ActiveKey {
        ActiveKey {
            translation_group_id: self.translation_group_id.clone(),
            entity_type: self.entity_type.clone(),
            source_locale: self.source_locale.clone(),
            target_locale: self.target_locale.clone(),
        }
    }

    /// Whether this assignment currently occupies its active-key slot.
    pub fn holds_active_slot(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Trims text fields, lowercases locales and drops blank principals.
    pub fn normalize(&mut self) {
        trim_in_place(&mut self.id);
        trim_in_place(&mut self.translation_group_id);
        trim_in_place(&mut self.entity_type);
        trim_in_place(&mut self.source_record_id);
        trim_in_place(&mut self.target_record_id);
        trim_in_place(&mut self.source_title);
        trim_in_place(&mut self.source_path);
        trim_in_place(&mut self.last_rejection_reason);
        self.source_locale = normalize_locale(&self.source_locale);
        self.target_locale = normalize_locale(&self.target_locale);
        self.assignee_id = normalize_principal(self.assignee_id.take());
        self.assigner_id = normalize_principal(self.assigner_id.take());
        self.last_reviewer_id = normalize_principal(self.last_reviewer_id.take());
    }

    /// Checks the identity fields that make up the active key.
    pub fn validate_identity(&self) -> Result<(), ValidationFailure> {
        let mut violations = Vec::new();
        self.collect_identity_violations(&mut violations);
        ValidationFailure::from_violations(violations)
    }

    /// Checks every record invariant.
    pub fn validate(&self) -> Result<(), ValidationFailure> {
        let mut violations = Vec::new();
        self.collect_identity_violations(&mut violations);

        if self.last_rejection_reason.len() > MAX_REJECTION_REASON_BYTES {
            violations.push(Violation::ReasonTooLong {
                max_bytes: MAX_REJECTION_REASON_BYTES,
                actual_bytes: self.last_rejection_reason.len(),
            });
        }
        if self.assignment_type == AssignmentType::Direct
            && matches!(
                self.status,
                AssignmentStatus::Assigned | AssignmentStatus::InProgress
            )
            && self.assignee_id.is_none()
        {
            violations.push(Violation::AssigneeRequired {
                status: self.status,
            });
        }
        ValidationFailure::from_violations(violations)
    }

    fn collect_identity_violations(&self, violations: &mut Vec<Violation>) {
        for (field, value) in [
            ("translation_group_id", &self.translation_group_id),
            ("entity_type", &self.entity_type),
            ("source_record_id", &self.source_record_id),
            ("source_locale", &self.source_locale),
            ("target_locale", &self.target_locale),
        ] {
            if value.is_empty() {
                violations.push(Violation::MissingField { field });
            }
        }
        if !self.source_locale.is_empty() && self.source_locale == self.target_locale {
            violations.push(Violation::SameLocale {
                locale: self.source_locale.clone(),
            });
        }
    }
}

/// Caller-supplied assignment, before defaults are applied.
///
/// `assignment_type`, `status` and `priority` are optional so the store can
/// tell "not supplied" apart from an explicit value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentDraft {
    pub id: String,
    pub translation_group_id: String,
    pub entity_type: String,
    pub source_record_id: String,
    pub target_record_id: String,
    pub source_locale: String,
    pub target_locale: String,
    pub source_title: String,
    pub source_path: String,
    pub assignment_type: Option<AssignmentType>,
    pub status: Option<AssignmentStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<String>,
    pub assigner_id: Option<String>,
}

impl AssignmentDraft {
    /// Builds a normalized assignment with defaults filled in.
    ///
    /// Defaults: `open_pool`; `assigned` for direct work, `pending` otherwise;
    /// `normal` priority. `version` stays 0 until the store persists it.
    pub fn into_assignment(self, now: DateTime<Utc>) -> Assignment {
        let assignment_type = self.assignment_type.unwrap_or(AssignmentType::OpenPool);
        let status = self.status.unwrap_or(match assignment_type {
            AssignmentType::Direct => AssignmentStatus::Assigned,
            AssignmentType::OpenPool => AssignmentStatus::Pending,
        });
        let mut assignment = Assignment {
            id: self.id,
            translation_group_id: self.translation_group_id,
            entity_type: self.entity_type,
            source_record_id: self.source_record_id,
            target_record_id: self.target_record_id,
            source_locale: self.source_locale,
            target_locale: self.target_locale,
            source_title: self.source_title,
            source_path: self.source_path,
            assignment_type,
            status,
            priority: self.priority.unwrap_or(Priority::Normal),
            due_date: self.due_date.filter(|d| d.timestamp() != 0),
            assignee_id: self.assignee_id,
            assigner_id: self.assigner_id,
            last_reviewer_id: None,
            last_rejection_reason: String::new(),
            version: 0,
            created_at: now,
            updated_at: now,
            claimed_at: None,
            submitted_at: None,
            approved_at: None,
            published_at: None,
            archived_at: None,
        };
        assignment.normalize();
        assignment
    }

    /// Fields a reuse may refresh on an existing holder of the active key.
    pub fn refresh_fields(&self) -> RefreshFields {
        RefreshFields {
            source_title: Some(self.source_title.trim().to_string()).filter(|s| !s.is_empty()),
            source_path: Some(self.source_path.trim().to_string()).filter(|s| !s.is_empty()),
            due_date: self.due_date.filter(|d| d.timestamp() != 0),
            priority: self.priority,
        }
    }
}

/// Refreshable fields carried by a `create_or_reuse` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshFields {
    pub source_title: Option<String>,
    pub source_path: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
}

impl RefreshFields {
    /// Applies the supplied fields, returning whether anything changed.
    pub fn apply_to(&self, assignment: &mut Assignment) -> bool {
        let mut changed = false;
        if let Some(title) = &self.source_title {
            if *title != assignment.source_title {
                assignment.source_title = title.clone();
                changed = true;
            }
        }
        if let Some(path) = &self.source_path {
            if *path != assignment.source_path {
                assignment.source_path = path.clone();
                changed = true;
            }
        }
        if let Some(due) = self.due_date {
            if assignment.due_date != Some(due) {
                assignment.due_date = Some(due);
                changed = true;
            }
        }
        if let Some(priority) = self.priority {
            if assignment.priority != priority {
                assignment.priority = priority;
                changed = true;
            }
        }
        changed
    }
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn normalize_locale(value: &str) -> String {
    value.trim().to_lowercase()
}

fn normalize_principal(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
