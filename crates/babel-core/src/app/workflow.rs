//! WorkflowService - assignment のライフサイクル操作
//!
//! Each operation: check the context, check the capability, load, apply the
//! transition, commit against the loaded version, emit activity. Load through
//! emit runs under a per-assignment lock, so activity for one assignment is
//! recorded in commit order.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use crate::config::CoreConfig;
use crate::domain::events::actions;
use crate::domain::{
    ActivityRecord, Assignment, AssignmentDraft, CoreError, RequestContext, TransitionAction,
    TransitionPayload, apply_transition, truncate_to_bytes,
};
use crate::ports::{AssignmentStore, Clock, CreateOutcome, capability};

use super::activity::ActivityEmitter;
use super::gate::Gate;
use super::key_lock::KeyedLocks;

/// Capability an action requires on the `translations` resource.
pub fn required_capability(action: TransitionAction) -> &'static str {
    match action {
        TransitionAction::Assign
        | TransitionAction::Release
        | TransitionAction::Publish
        | TransitionAction::Archive => capability::MANAGE,
        TransitionAction::Claim | TransitionAction::SubmitReview | TransitionAction::Resume => {
            capability::EDIT
        }
        TransitionAction::Approve | TransitionAction::Reject => capability::APPROVE,
    }
}

#[derive(Clone)]
pub struct WorkflowService {
    store: Arc<dyn AssignmentStore>,
    gate: Gate,
    activity: ActivityEmitter,
    clock: Arc<dyn Clock>,
    config: Arc<CoreConfig>,
    serial: KeyedLocks,
}

impl WorkflowService {
    pub fn new(
        store: Arc<dyn AssignmentStore>,
        gate: Gate,
        activity: ActivityEmitter,
        clock: Arc<dyn Clock>,
        config: Arc<CoreConfig>,
    ) -> Self {
        Self {
            store,
            gate,
            activity,
            clock,
            config,
            serial: KeyedLocks::new(),
        }
    }

    pub async fn get(&self, ctx: &RequestContext, id: &str) -> Result<Assignment, CoreError> {
        ctx.check()?;
        Ok(self.store.get(id).await?)
    }

    /// Strict create.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        draft: AssignmentDraft,
    ) -> Result<Assignment, CoreError> {
        ctx.check()?;
        self.gate.require(&ctx.principal, capability::MANAGE).await?;

        let draft = with_assigner(draft, ctx.actor_id());
        let created = self.store.create(draft).await?;
        self.emit_assignment(ctx, actions::ASSIGNMENT_CREATED, &created, json!({
            "status": created.status,
            "assignment_type": created.assignment_type,
        }))
        .await;
        Ok(created)
    }

    pub async fn create_or_reuse(
        &self,
        ctx: &RequestContext,
        draft: AssignmentDraft,
    ) -> Result<CreateOutcome, CoreError> {
        ctx.check()?;
        self.gate.require(&ctx.principal, capability::MANAGE).await?;

        let draft = with_assigner(draft, ctx.actor_id());
        let outcome = self.store.create_or_reuse(draft).await?;
        let a = &outcome.assignment;
        if outcome.created {
            self.emit_assignment(ctx, actions::ASSIGNMENT_CREATED, a, json!({
                "status": a.status,
                "assignment_type": a.assignment_type,
            }))
            .await;
        } else if outcome.refreshed {
            self.emit_assignment(ctx, actions::ASSIGNMENT_REFRESHED, a, json!({
                "version": a.version,
                "source_title": a.source_title,
                "priority": a.priority,
                "due_date": a.due_date,
            }))
            .await;
        } else {
            debug!(assignment_id = %a.id, "reused assignment without changes");
        }
        Ok(outcome)
    }

    /// Runs one lifecycle action against the stored record.
    pub async fn transition(
        &self,
        ctx: &RequestContext,
        id: &str,
        action: TransitionAction,
        mut payload: TransitionPayload,
    ) -> Result<Assignment, CoreError> {
        ctx.check()?;
        self.gate
            .require(&ctx.principal, required_capability(action))
            .await?;

        payload.actor_id = ctx.actor_id().to_string();
        if let Some(reason) = payload.reason.as_mut() {
            *reason = truncate_to_bytes(reason, self.config.rejection_reason_max_bytes);
        }

        let _serial = self.serial.lock(id).await;
        ctx.check()?;
        let current = self.store.get(id).await?;
        let next = apply_transition(&current, action, &payload, self.clock.now())?;
        let committed = self.store.update(next, current.version).await?;

        info!(
            assignment_id = %committed.id,
            action = action.as_str(),
            from = %current.status,
            to = %committed.status,
            version = committed.version,
            "assignment transitioned"
        );
        self.emit_assignment(
            ctx,
            &actions::assignment(action.as_str()),
            &committed,
            json!({
                "from": current.status,
                "to": committed.status,
                "version": committed.version,
                "assignee_id": committed.assignee_id,
            }),
        )
        .await;
        Ok(committed)
    }

    pub async fn assign(
        &self,
        ctx: &RequestContext,
        id: &str,
        assignee_id: &str,
    ) -> Result<Assignment, CoreError> {
        let payload = TransitionPayload::default().with_assignee(assignee_id);
        self.transition(ctx, id, TransitionAction::Assign, payload).await
    }

    pub async fn claim(&self, ctx: &RequestContext, id: &str) -> Result<Assignment, CoreError> {
        self.transition(ctx, id, TransitionAction::Claim, TransitionPayload::default())
            .await
    }

    pub async fn release(&self, ctx: &RequestContext, id: &str) -> Result<Assignment, CoreError> {
        self.transition(ctx, id, TransitionAction::Release, TransitionPayload::default())
            .await
    }

    pub async fn submit_review(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<Assignment, CoreError> {
        self.transition(ctx, id, TransitionAction::SubmitReview, TransitionPayload::default())
            .await
    }

    pub async fn approve(&self, ctx: &RequestContext, id: &str) -> Result<Assignment, CoreError> {
        self.transition(ctx, id, TransitionAction::Approve, TransitionPayload::default())
            .await
    }

    pub async fn reject(
        &self,
        ctx: &RequestContext,
        id: &str,
        reason: &str,
    ) -> Result<Assignment, CoreError> {
        let payload = TransitionPayload::default().with_reason(reason);
        self.transition(ctx, id, TransitionAction::Reject, payload).await
    }

    pub async fn resume(&self, ctx: &RequestContext, id: &str) -> Result<Assignment, CoreError> {
        self.transition(ctx, id, TransitionAction::Resume, TransitionPayload::default())
            .await
    }

    pub async fn publish(&self, ctx: &RequestContext, id: &str) -> Result<Assignment, CoreError> {
        self.transition(ctx, id, TransitionAction::Publish, TransitionPayload::default())
            .await
    }

    pub async fn archive(&self, ctx: &RequestContext, id: &str) -> Result<Assignment, CoreError> {
        self.transition(ctx, id, TransitionAction::Archive, TransitionPayload::default())
            .await
    }

    async fn emit_assignment(
        &self,
        ctx: &RequestContext,
        action: &str,
        assignment: &Assignment,
        metadata: serde_json::Value,
    ) {
        self.activity
            .emit(
                ctx.actor_id(),
                action,
                ActivityRecord::assignment_object(&assignment.id),
                metadata,
            )
            .await;
    }
}

fn with_assigner(mut draft: AssignmentDraft, actor: &str) -> AssignmentDraft {
    let has_assignee = draft
        .assignee_id
        .as_deref()
        .is_some_and(|a| !a.trim().is_empty());
    if has_assignee && draft.assigner_id.is_none() && !actor.trim().is_empty() {
        draft.assigner_id = Some(actor.to_string());
    }
    draft
}
