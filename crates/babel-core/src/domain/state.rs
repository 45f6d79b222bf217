//! Assignment lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a translation assignment.
///
/// State transitions:
/// - Pending -> Assigned -> InProgress -> Review -> Approved -> Published -> Archived
/// - Pending -> InProgress (claim from the open pool)
/// - Assigned | InProgress -> Pending (release)
/// - Review -> Rejected -> InProgress (reject, then resume)
/// - any non-terminal -> Archived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Assigned,
    InProgress,
    Review,
    Rejected,
    Approved,
    Published,
    Archived,
}

impl AssignmentStatus {
    pub const ALL: [AssignmentStatus; 8] = [
        AssignmentStatus::Pending,
        AssignmentStatus::Assigned,
        AssignmentStatus::InProgress,
        AssignmentStatus::Review,
        AssignmentStatus::Rejected,
        AssignmentStatus::Approved,
        AssignmentStatus::Published,
        AssignmentStatus::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::InProgress => "in_progress",
            AssignmentStatus::Review => "review",
            AssignmentStatus::Rejected => "rejected",
            AssignmentStatus::Approved => "approved",
            AssignmentStatus::Published => "published",
            AssignmentStatus::Archived => "archived",
        }
    }

    /// Parses a wire value, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// Terminal states release the active uniqueness slot.
    ///
    /// Only `archived` is terminal for the store; `published` keeps its slot
    /// until it is archived explicitly.
    pub fn is_terminal(self) -> bool {
        matches!(self, AssignmentStatus::Archived)
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
