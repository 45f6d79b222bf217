//! Canonical enums shared by server responses and client renderers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::AssignmentStatus;

/// Current schema version of the shared vocabulary.
pub const SCHEMA_VERSION: u32 = 1;

/// Content readiness of a translation group across locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    Ready,
    MissingLocales,
    MissingFields,
    MissingLocalesFields,
}

impl ReadinessState {
    pub const ALL: [ReadinessState; 4] = [
        ReadinessState::Ready,
        ReadinessState::MissingLocales,
        ReadinessState::MissingFields,
        ReadinessState::MissingLocalesFields,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReadinessState::Ready => "ready",
            ReadinessState::MissingLocales => "missing_locales",
            ReadinessState::MissingFields => "missing_fields",
            ReadinessState::MissingLocalesFields => "missing_locales_fields",
        }
    }

    pub fn normalize(value: &str) -> Self {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .unwrap_or(ReadinessState::Ready)
    }

    /// Classifies from the two kinds of gaps a group can have.
    pub fn from_gaps(missing_locales: bool, missing_fields: bool) -> Self {
        match (missing_locales, missing_fields) {
            (false, false) => ReadinessState::Ready,
            (true, false) => ReadinessState::MissingLocales,
            (false, true) => ReadinessState::MissingFields,
            (true, true) => ReadinessState::MissingLocalesFields,
        }
    }
}

/// Queue state mirrors assignment status; unknown values become `pending`.
pub fn normalize_queue_state(value: &str) -> AssignmentStatus {
    AssignmentStatus::parse(value).unwrap_or(AssignmentStatus::Pending)
}

/// UI-friendly projection of assignment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentState {
    Draft,
    Review,
    Ready,
    Archived,
}

impl ContentState {
    pub const ALL: [ContentState; 4] = [
        ContentState::Draft,
        ContentState::Review,
        ContentState::Ready,
        ContentState::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentState::Draft => "draft",
            ContentState::Review => "review",
            ContentState::Ready => "ready",
            ContentState::Archived => "archived",
        }
    }

    pub fn from_status(status: AssignmentStatus) -> Self {
        match status {
            AssignmentStatus::Review => ContentState::Review,
            AssignmentStatus::Approved | AssignmentStatus::Published => ContentState::Ready,
            AssignmentStatus::Archived => ContentState::Archived,
            AssignmentStatus::Pending
            | AssignmentStatus::Assigned
            | AssignmentStatus::InProgress
            | AssignmentStatus::Rejected => ContentState::Draft,
        }
    }
}

/// Temporal classification of an assignment relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueState {
    Overdue,
    DueSoon,
    OnTrack,
    None,
}

impl DueState {
    pub const ALL: [DueState; 4] = [
        DueState::Overdue,
        DueState::DueSoon,
        DueState::OnTrack,
        DueState::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DueState::Overdue => "overdue",
            DueState::DueSoon => "due_soon",
            DueState::OnTrack => "on_track",
            DueState::None => "none",
        }
    }

    pub fn normalize(value: &str) -> Self {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .unwrap_or(DueState::None)
    }

    /// - `none` when unset (or the zero instant)
    /// - `overdue` when `due < now`
    /// - `due_soon` when `due - now <= window`
    /// - `on_track` otherwise
    pub fn derive(due: Option<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) -> Self {
        match due {
            None => DueState::None,
            Some(due) if due.timestamp() == 0 => DueState::None,
            Some(due) if due < now => DueState::Overdue,
            Some(due) if due - now <= window => DueState::DueSoon,
            Some(_) => DueState::OnTrack,
        }
    }
}

/// Why an action is disabled for the current principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabledReasonCode {
    PermissionDenied,
    InvalidStatus,
}

impl DisabledReasonCode {
    pub const ALL: [DisabledReasonCode; 2] = [
        DisabledReasonCode::PermissionDenied,
        DisabledReasonCode::InvalidStatus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DisabledReasonCode::PermissionDenied => "permission_denied",
            DisabledReasonCode::InvalidStatus => "invalid_status",
        }
    }
}
