//! AssignmentStore port - source of truth for translation assignments.
//!
//! Two guarantees every implementation must give:
//! - **Active-key uniqueness**: among non-terminal assignments, at most one
//!   holds a given `(translation_group_id, entity_type, source_locale,
//!   target_locale)`.
//! - **Optimistic locking**: `update` succeeds only when the caller's expected
//!   version matches, and bumps `version` by exactly one.
//!
//! Returned records are copies; mutating them never affects the store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::domain::{
    Assignment, AssignmentDraft, AssignmentStatus, AssignmentType, Priority, StoreError,
};

/// Upper bound on `per_page` for any list query.
pub const MAX_PER_PAGE: usize = 200;

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Strict create: fails with `ActiveKeyConflict` when the key is held.
    async fn create(&self, draft: AssignmentDraft) -> Result<Assignment, StoreError>;

    /// Idempotent create: returns the current holder of the key (refreshed
    /// with any differing refreshable fields) instead of failing.
    async fn create_or_reuse(&self, draft: AssignmentDraft) -> Result<CreateOutcome, StoreError>;

    async fn get(&self, id: &str) -> Result<Assignment, StoreError>;

    /// One consistent page plus the total number of matching rows.
    async fn list(&self, options: &ListOptions) -> Result<ListPage, StoreError>;

    async fn update(
        &self,
        assignment: Assignment,
        expected_version: u64,
    ) -> Result<Assignment, StoreError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    pub assignment: Assignment,
    pub created: bool,
    /// Whether an existing holder was refreshed (and its version bumped).
    pub refreshed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListFilter {
    pub status: Option<AssignmentStatus>,
    pub target_locale: Option<String>,
    pub source_locale: Option<String>,
    pub assignee_id: Option<String>,
    pub assignment_type: Option<AssignmentType>,
    pub entity_type: Option<String>,
    pub priority: Option<Priority>,
    pub translation_group_id: Option<String>,
    /// Only non-terminal assignments whose due date has passed.
    pub overdue: bool,
    /// Case-insensitive substring over id, title, path, group, entity type,
    /// locales and assignee.
    pub search: Option<String>,
}

impl ListFilter {
    pub fn matches(&self, a: &Assignment, now: DateTime<Utc>) -> bool {
        if self.status.is_some_and(|s| s != a.status) {
            return false;
        }
        if !eq_opt_ci(&self.target_locale, &a.target_locale)
            || !eq_opt_ci(&self.source_locale, &a.source_locale)
            || !eq_opt(&self.entity_type, &a.entity_type)
            || !eq_opt(&self.translation_group_id, &a.translation_group_id)
        {
            return false;
        }
        if let Some(assignee) = blank_to_none(&self.assignee_id) {
            if a.assignee_id.as_deref() != Some(assignee) {
                return false;
            }
        }
        if self.assignment_type.is_some_and(|t| t != a.assignment_type) {
            return false;
        }
        if self.priority.is_some_and(|p| p != a.priority) {
            return false;
        }
        if self.overdue {
            let overdue = !a.status.is_terminal() && a.due_date.is_some_and(|d| d < now);
            if !overdue {
                return false;
            }
        }
        if let Some(term) = blank_to_none(&self.search) {
            let term = term.to_lowercase();
            let haystacks = [
                a.id.as_str(),
                a.source_title.as_str(),
                a.source_path.as_str(),
                a.translation_group_id.as_str(),
                a.entity_type.as_str(),
                a.source_locale.as_str(),
                a.target_locale.as_str(),
                a.assignee_id.as_deref().unwrap_or_default(),
            ];
            if !haystacks.iter().any(|h| h.to_lowercase().contains(&term)) {
                return false;
            }
        }
        true
    }
}

fn blank_to_none(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn eq_opt(filter: &Option<String>, value: &str) -> bool {
    blank_to_none(filter).is_none_or(|f| f == value)
}

fn eq_opt_ci(filter: &Option<String>, value: &str) -> bool {
    blank_to_none(filter).is_none_or(|f| f.eq_ignore_ascii_case(value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Status,
    TargetLocale,
    AssigneeId,
    Priority,
    UpdatedAt,
    CreatedAt,
    DueDate,
}

impl SortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "status" => Some(SortField::Status),
            "target_locale" => Some(SortField::TargetLocale),
            "assignee_id" => Some(SortField::AssigneeId),
            "priority" => Some(SortField::Priority),
            "updated_at" => Some(SortField::UpdatedAt),
            "created_at" => Some(SortField::CreatedAt),
            "due_date" => Some(SortField::DueDate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListOptions {
    pub filter: ListFilter,
    pub sort: SortField,
    pub order: SortOrder,
    /// 1-based.
    pub page: usize,
    pub per_page: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            filter: ListFilter::default(),
            sort: SortField::CreatedAt,
            order: SortOrder::Desc,
            page: 1,
            per_page: 25,
        }
    }
}

impl ListOptions {
    pub fn page(mut self, page: usize, per_page: usize) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }

    pub fn sorted_by(mut self, sort: SortField, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }

    pub fn clamped_per_page(&self) -> usize {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }

    pub fn clamped_page(&self) -> usize {
        self.page.max(1)
    }

    /// Stable comparison on the sort field; ties are broken by `id` ascending.
    ///
    /// Missing values (no assignee, no due date) sort last in either order.
    pub fn compare(&self, a: &Assignment, b: &Assignment) -> Ordering {
        let primary = match self.sort {
            SortField::Status => directed(a.status.cmp(&b.status), self.order),
            SortField::TargetLocale => directed(a.target_locale.cmp(&b.target_locale), self.order),
            SortField::Priority => directed(a.priority.cmp(&b.priority), self.order),
            SortField::UpdatedAt => directed(a.updated_at.cmp(&b.updated_at), self.order),
            SortField::CreatedAt => directed(a.created_at.cmp(&b.created_at), self.order),
            SortField::AssigneeId => {
                nulls_last(a.assignee_id.as_ref(), b.assignee_id.as_ref(), self.order)
            }
            SortField::DueDate => nulls_last(a.due_date.as_ref(), b.due_date.as_ref(), self.order),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn nulls_last<T: Ord>(a: Option<&T>, b: Option<&T>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => directed(x.cmp(y), order),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    pub rows: Vec<Assignment>,
    pub total: usize,
}
