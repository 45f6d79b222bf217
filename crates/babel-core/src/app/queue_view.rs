//! QueueViewService - my-work / queue の読み取り射影
//!
//! Summaries are aggregated over every matching row via the summary pager,
//! never over the current page alone.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CoreConfig;
use crate::contracts::{ContentState, DueState, normalize_queue_state};
use crate::domain::{
    Assignment, AssignmentStatus, CoreError, RequestContext, ValidationFailure, Violation,
};
use crate::ports::{AssignmentStore, Clock, ListFilter, ListOptions, SortField, SortOrder};

use super::gate::{Capabilities, Gate, ReviewActions};
use super::pager::for_each_matching;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MyWorkRequest {
    pub user_id: String,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueRequest {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub assignee_id: Option<String>,
    pub status: Option<String>,
    /// Shortcut for `status=review`.
    pub review: bool,
}

/// One assignment plus its derived view states.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueRow {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub content_state: ContentState,
    pub queue_state: AssignmentStatus,
    pub due_state: DueState,
    pub review_actions: ReviewActions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyWorkSummary {
    pub total: usize,
    pub overdue: usize,
    pub due_soon: usize,
    pub on_track: usize,
    pub none: usize,
    pub review: usize,
}

impl MyWorkSummary {
    fn record(&mut self, due: DueState, status: AssignmentStatus) {
        self.total += 1;
        match due {
            DueState::Overdue => self.overdue += 1,
            DueState::DueSoon => self.due_soon += 1,
            DueState::OnTrack => self.on_track += 1,
            DueState::None => self.none += 1,
        }
        if status == AssignmentStatus::Review {
            self.review += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSummary {
    pub total: usize,
    pub by_queue_state: BTreeMap<AssignmentStatus, usize>,
    pub by_due_state: BTreeMap<DueState, usize>,
}

impl Default for QueueSummary {
    fn default() -> Self {
        Self {
            total: 0,
            by_queue_state: AssignmentStatus::ALL.into_iter().map(|s| (s, 0)).collect(),
            by_due_state: DueState::ALL.into_iter().map(|s| (s, 0)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MyWorkEnvelope {
    pub assignments: Vec<QueueRow>,
    pub items: Vec<QueueRow>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub summary: MyWorkSummary,
    pub updated_at: DateTime<Utc>,
    pub user_id: String,
    pub scope: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueEnvelope {
    pub assignments: Vec<QueueRow>,
    pub items: Vec<QueueRow>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub summary: QueueSummary,
    pub updated_at: DateTime<Utc>,
    pub scope: &'static str,
}

#[derive(Clone)]
pub struct QueueViewService {
    store: Arc<dyn AssignmentStore>,
    gate: Gate,
    clock: Arc<dyn Clock>,
    config: Arc<CoreConfig>,
}

impl QueueViewService {
    pub fn new(
        store: Arc<dyn AssignmentStore>,
        gate: Gate,
        clock: Arc<dyn Clock>,
        config: Arc<CoreConfig>,
    ) -> Self {
        Self {
            store,
            gate,
            clock,
            config,
        }
    }

    pub async fn my_work(
        &self,
        ctx: &RequestContext,
        req: &MyWorkRequest,
    ) -> Result<MyWorkEnvelope, CoreError> {
        ctx.check()?;
        let user_id = req.user_id.trim().to_string();
        if user_id.is_empty() {
            return Err(
                ValidationFailure::single(Violation::MissingField { field: "user_id" }).into(),
            );
        }
        let filter = ListFilter {
            assignee_id: Some(user_id.clone()),
            status: parse_status(req.status.as_deref()),
            ..Default::default()
        };
        let per_page = self
            .config
            .per_page(req.per_page, self.config.my_work_default_per_page);
        let page = req.page.unwrap_or(1).max(1);
        let options = ListOptions {
            filter: filter.clone(),
            ..ListOptions::default()
        }
        .sorted_by(SortField::DueDate, SortOrder::Asc)
        .page(page, per_page);

        let now = self.clock.now();
        let window = self.config.due_soon_window();
        let listed = self.store.list(&options).await?;

        let mut summary = MyWorkSummary::default();
        for_each_matching(
            self.store.as_ref(),
            ctx,
            &filter,
            self.config.summary_batch_size,
            |a| summary.record(DueState::derive(a.due_date, now, window), a.status),
        )
        .await?;

        let caps = self.gate.capabilities(&ctx.principal).await;
        let rows = self.project(listed.rows, caps, now);
        Ok(MyWorkEnvelope {
            items: rows.clone(),
            assignments: rows,
            total: listed.total,
            page,
            per_page,
            summary,
            updated_at: now,
            user_id,
            scope: "my_work",
        })
    }

    pub async fn queue(
        &self,
        ctx: &RequestContext,
        req: &QueueRequest,
    ) -> Result<QueueEnvelope, CoreError> {
        ctx.check()?;
        let status = if req.review {
            Some(AssignmentStatus::Review)
        } else {
            parse_status(req.status.as_deref())
        };
        let filter = ListFilter {
            assignee_id: req.assignee_id.clone(),
            status,
            ..Default::default()
        };
        let per_page = self
            .config
            .per_page(req.per_page, self.config.queue_default_per_page);
        let page = req.page.unwrap_or(1).max(1);
        let options = ListOptions {
            filter: filter.clone(),
            ..ListOptions::default()
        }
        .sorted_by(SortField::UpdatedAt, SortOrder::Desc)
        .page(page, per_page);

        let now = self.clock.now();
        let window = self.config.due_soon_window();
        let listed = self.store.list(&options).await?;

        let mut summary = QueueSummary::default();
        for_each_matching(
            self.store.as_ref(),
            ctx,
            &filter,
            self.config.summary_batch_size,
            |a| {
                summary.total += 1;
                *summary.by_queue_state.entry(a.status).or_default() += 1;
                *summary
                    .by_due_state
                    .entry(DueState::derive(a.due_date, now, window))
                    .or_default() += 1;
            },
        )
        .await?;

        let caps = self.gate.capabilities(&ctx.principal).await;
        let rows = self.project(listed.rows, caps, now);
        Ok(QueueEnvelope {
            items: rows.clone(),
            assignments: rows,
            total: listed.total,
            page,
            per_page,
            summary,
            updated_at: now,
            scope: "queue",
        })
    }

    fn project(
        &self,
        rows: Vec<Assignment>,
        caps: Capabilities,
        now: DateTime<Utc>,
    ) -> Vec<QueueRow> {
        let window = self.config.due_soon_window();
        rows.into_iter()
            .map(|assignment| QueueRow {
                content_state: ContentState::from_status(assignment.status),
                queue_state: assignment.status,
                due_state: DueState::derive(assignment.due_date, now, window),
                review_actions: caps.review_actions(assignment.status),
                assignment,
            })
            .collect()
    }
}

/// Blank means "no filter"; unknown values normalize to `pending`.
fn parse_status(raw: Option<&str>) -> Option<AssignmentStatus> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(normalize_queue_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssignmentDraft, AssignmentType, Principal};
    use crate::impls::{InMemoryAssignmentStore, RoleAuthorizer};
    use crate::ports::{FixedClock, TRANSLATIONS_RESOURCE, UlidGenerator, capability};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 17, 12, 0, 0).unwrap()
    }

    async fn seeded(gate: Gate) -> QueueViewService {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now()));
        let ids = Arc::new(UlidGenerator::new(clock.clone()));
        let store = Arc::new(InMemoryAssignmentStore::new(clock.clone(), ids));

        let dues = [
            Some(Duration::hours(-2)),
            Some(Duration::hours(6)),
            Some(Duration::hours(96)),
            None,
        ];
        for (n, due) in dues.into_iter().enumerate() {
            store
                .create(draft(&format!("tg_{n}"), "u", due.map(|d| now() + d)))
                .await
                .unwrap();
        }
        store
            .create(draft("tg_other", "someone_else", Some(now())))
            .await
            .unwrap();
        QueueViewService::new(store, gate, clock, Arc::new(CoreConfig::default()))
    }

    fn draft(group: &str, assignee: &str, due: Option<DateTime<Utc>>) -> AssignmentDraft {
        AssignmentDraft {
            translation_group_id: group.into(),
            entity_type: "pages".into(),
            source_record_id: group.into(),
            source_locale: "en".into(),
            target_locale: "es".into(),
            assignment_type: Some(AssignmentType::Direct),
            assignee_id: Some(assignee.into()),
            due_date: due,
            ..Default::default()
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Principal::new("u"))
    }

    #[tokio::test]
    async fn my_work_summary_spans_every_page() {
        let svc = seeded(Gate::default()).await;
        let env = svc
            .my_work(
                &ctx(),
                &MyWorkRequest {
                    user_id: "u".into(),
                    page: Some(1),
                    per_page: Some(1),
                    status: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(env.assignments.len(), 1);
        assert_eq!(env.items.len(), 1);
        assert_eq!(env.total, 4);
        assert_eq!(
            env.summary,
            MyWorkSummary {
                total: 4,
                overdue: 1,
                due_soon: 1,
                on_track: 1,
                none: 1,
                review: 0,
            }
        );
        assert_eq!(env.scope, "my_work");
        // due_date asc puts the overdue row first
        assert_eq!(env.assignments[0].due_state, DueState::Overdue);
    }

    #[tokio::test]
    async fn my_work_requires_a_user() {
        let svc = seeded(Gate::default()).await;
        let err = svc
            .my_work(&ctx(), &MyWorkRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn queue_summary_counts_all_states() {
        let svc = seeded(Gate::default()).await;
        let env = svc
            .queue(
                &ctx(),
                &QueueRequest {
                    per_page: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(env.assignments.len(), 2);
        assert_eq!(env.per_page, 2);
        assert_eq!(env.summary.total, 5);
        assert_eq!(env.summary.by_queue_state[&AssignmentStatus::Assigned], 5);
        assert_eq!(env.summary.by_queue_state[&AssignmentStatus::Review], 0);
        assert_eq!(env.summary.by_due_state[&DueState::DueSoon], 2);
    }

    #[tokio::test]
    async fn review_shortcut_forces_review_status() {
        let svc = seeded(Gate::default()).await;
        let env = svc
            .queue(
                &ctx(),
                &QueueRequest {
                    review: true,
                    status: Some("assigned".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(env.total, 0);
        assert_eq!(env.summary.total, 0);
    }

    #[tokio::test]
    async fn rows_carry_derived_states_and_actions() {
        let authz = RoleAuthorizer::new().grant("t", capability::EDIT, TRANSLATIONS_RESOURCE);
        let svc = seeded(Gate::new(Some(Arc::new(authz)))).await;
        let ctx = RequestContext::new(Principal::new("u").with_roles(["t"]));
        let env = svc
            .queue(&ctx, &QueueRequest::default())
            .await
            .unwrap();
        let row = &env.assignments[0];
        assert_eq!(row.content_state, ContentState::Draft);
        assert_eq!(row.queue_state, AssignmentStatus::Assigned);
        assert_eq!(
            row.review_actions.approve.reason_code,
            Some(crate::contracts::DisabledReasonCode::PermissionDenied)
        );
        assert_eq!(
            row.review_actions.submit_review.reason_code,
            Some(crate::contracts::DisabledReasonCode::InvalidStatus)
        );

        let value = serde_json::to_value(row).unwrap();
        assert_eq!(value["status"], "assigned");
        assert_eq!(value["queue_state"], "assigned");
        assert!(value["review_actions"]["reject"].is_object());
    }

    #[tokio::test]
    async fn per_page_is_clamped() {
        let svc = seeded(Gate::default()).await;
        let env = svc
            .queue(
                &ctx(),
                &QueueRequest {
                    per_page: Some(10_000),
                    page: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(env.per_page, 200);
        assert_eq!(env.page, 1);
    }
}
