//! DashboardService - ダッシュボード用の集計スナップショット

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CoreConfig;
use crate::contracts::DueState;
use crate::domain::{Assignment, AssignmentStatus, CoreError, Priority, RequestContext};
use crate::ports::{AssignmentStore, Clock, ListFilter, ListOptions, SortField, SortOrder};

use super::pager::for_each_matching;

/// Locale bucket for assignments without a usable target locale.
pub const UNKNOWN_LOCALE: &str = "unknown";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub active: usize,
    pub overdue: usize,
    pub review: usize,
    pub approved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRow {
    pub id: String,
    pub source_title: String,
    pub entity_type: String,
    pub target_locale: String,
    pub status: AssignmentStatus,
    pub priority: Priority,
    pub assignee_id: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub due_state: DueState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub summary: DashboardSummary,
    pub status_counts: BTreeMap<AssignmentStatus, usize>,
    pub locale_counts: BTreeMap<String, usize>,
    pub updated_at: DateTime<Utc>,
    /// Active assignments, most urgent due date first.
    pub assignment_rows: Vec<DashboardRow>,
}

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn AssignmentStore>,
    clock: Arc<dyn Clock>,
    config: Arc<CoreConfig>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn AssignmentStore>, clock: Arc<dyn Clock>, config: Arc<CoreConfig>) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub async fn snapshot(&self, ctx: &RequestContext) -> Result<DashboardSnapshot, CoreError> {
        let now = self.clock.now();
        let window = self.config.due_soon_window();

        let mut summary = DashboardSummary::default();
        let mut status_counts: BTreeMap<AssignmentStatus, usize> =
            AssignmentStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        let mut locale_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut active_rows: Vec<Assignment> = Vec::new();

        for_each_matching(
            self.store.as_ref(),
            ctx,
            &ListFilter::default(),
            self.config.summary_batch_size,
            |a| {
                summary.total += 1;
                let terminal = a.status.is_terminal();
                if !terminal {
                    summary.active += 1;
                    if a.due_date.is_some_and(|d| d < now) {
                        summary.overdue += 1;
                    }
                    active_rows.push(a.clone());
                }
                match a.status {
                    AssignmentStatus::Review => summary.review += 1,
                    AssignmentStatus::Approved => summary.approved += 1,
                    _ => {}
                }
                *status_counts.entry(a.status).or_default() += 1;
                *locale_counts.entry(locale_bucket(&a.target_locale)).or_default() += 1;
            },
        )
        .await?;

        let order = ListOptions::default().sorted_by(SortField::DueDate, SortOrder::Asc);
        active_rows.sort_by(|a, b| order.compare(a, b));
        let assignment_rows = active_rows
            .into_iter()
            .take(self.config.dashboard_row_limit)
            .map(|a| DashboardRow {
                due_state: DueState::derive(a.due_date, now, window),
                id: a.id,
                source_title: a.source_title,
                entity_type: a.entity_type,
                target_locale: a.target_locale,
                status: a.status,
                priority: a.priority,
                assignee_id: a.assignee_id,
                due_date: a.due_date,
            })
            .collect();

        Ok(DashboardSnapshot {
            summary,
            status_counts,
            locale_counts,
            updated_at: now,
            assignment_rows,
        })
    }
}

fn locale_bucket(locale: &str) -> String {
    let locale = locale.trim();
    let well_formed = !locale.is_empty()
        && locale
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if well_formed {
        locale.to_lowercase()
    } else {
        UNKNOWN_LOCALE.to_string()
    }
}
