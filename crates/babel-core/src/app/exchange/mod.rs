//! Exchange pipeline - 翻訳の一括エクスポート / 検証 / 適用
//!
//! # 構成
//! - **codec**: CSV / JSON の変換
//! - **rows**: 行ごとの検証ルールと書き込み
//! - **export**: ソースフィールドの書き出し
//!
//! validate / apply は同期実行か、`async` オプションでジョブとして実行する。
//! ジョブはバッチごとに進捗を記録し、キャンセル時は部分進捗を残して失敗する。

pub mod codec;
pub mod export;
pub mod rows;

pub use self::export::{ExportPayload, ExportRequest};
pub use self::rows::{Mode, codes};

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::config::CoreConfig;
use crate::domain::events::actions;
use crate::domain::{
    ActivityRecord, ConflictSummary, CoreError, ExchangeJob, ExchangeOptions, ExchangeReport,
    ExchangeRow, ExchangeSummary, JobKind, RequestContext, RowFailure, RowResult, RowStatus,
};
use crate::ports::{ContentStore, ExchangeJobStore, IdGenerator, capability};

use super::activity::ActivityEmitter;
use super::gate::Gate;

#[derive(Clone)]
pub struct ExchangeService {
    content: Arc<dyn ContentStore>,
    jobs: Arc<dyn ExchangeJobStore>,
    activity: ActivityEmitter,
    gate: Gate,
    ids: Arc<dyn IdGenerator>,
    config: Arc<CoreConfig>,
}

impl ExchangeService {
    pub fn new(
        content: Arc<dyn ContentStore>,
        jobs: Arc<dyn ExchangeJobStore>,
        activity: ActivityEmitter,
        gate: Gate,
        ids: Arc<dyn IdGenerator>,
        config: Arc<CoreConfig>,
    ) -> Self {
        Self {
            content,
            jobs,
            activity,
            gate,
            ids,
            config,
        }
    }

    pub async fn validate(
        &self,
        ctx: &RequestContext,
        rows: Vec<ExchangeRow>,
        options: ExchangeOptions,
    ) -> Result<ExchangeReport, CoreError> {
        self.import(ctx, rows, options, Mode::Validate).await
    }

    pub async fn apply(
        &self,
        ctx: &RequestContext,
        rows: Vec<ExchangeRow>,
        options: ExchangeOptions,
    ) -> Result<ExchangeReport, CoreError> {
        self.import(ctx, rows, options, Mode::Apply).await
    }

    pub async fn job(&self, ctx: &RequestContext, id: &str) -> Result<ExchangeJob, CoreError> {
        ctx.check()?;
        let job = self.jobs.get(id).await?;
        self.gate.require(&ctx.principal, &job.permission).await?;
        Ok(job)
    }

    /// Terminal activity for an import rejected before any row ran.
    pub async fn record_import_failure(&self, ctx: &RequestContext, err: &CoreError) {
        let request_id = self.ids.generate_job_id().to_string();
        self.activity
            .emit(
                ctx.actor_id(),
                actions::IMPORT_FAILED,
                ActivityRecord::exchange_object(&request_id),
                json!({ "text_code": err.text_code(), "message": err.to_string() }),
            )
            .await;
    }

    async fn import(
        &self,
        ctx: &RequestContext,
        rows: Vec<ExchangeRow>,
        options: ExchangeOptions,
        mode: Mode,
    ) -> Result<ExchangeReport, CoreError> {
        ctx.check()?;
        self.gate.require(&ctx.principal, capability::IMPORT).await?;

        if !options.run_async {
            let request_id = self.ids.generate_job_id().to_string();
            return self.run(ctx, &rows, &options, mode, &request_id, None).await;
        }

        let kind = match mode {
            Mode::Validate => JobKind::ImportValidate,
            Mode::Apply => JobKind::ImportApply,
        };
        let job = self
            .jobs
            .create(kind, ctx.actor_id(), capability::IMPORT)
            .await?;

        let total = rows.len();
        let service = self.clone();
        let job_ctx = ctx.clone();
        let job_id = job.id.clone();
        tokio::spawn(async move {
            let outcome = service
                .run(&job_ctx, &rows, &options, mode, &job_id, Some(&job_id))
                .await;
            if let Err(err) = outcome {
                warn!(job_id = %job_id, error = %err, "exchange job ended with an error");
                let failure = RowFailure {
                    text_code: err.text_code(),
                    message: err.to_string(),
                };
                if let Err(err) = service.jobs.fail(&job_id, failure).await {
                    warn!(job_id = %job_id, error = %err, "could not record job failure");
                }
            }
        });

        Ok(ExchangeReport {
            summary: ExchangeSummary {
                total,
                ..Default::default()
            },
            results: Vec::new(),
            conflict_summary: ConflictSummary::default(),
            job: Some(job),
        })
    }

    /// Processes every row in batches, checking for cancellation and
    /// recording job progress at each batch boundary.
    async fn run(
        &self,
        ctx: &RequestContext,
        rows: &[ExchangeRow],
        options: &ExchangeOptions,
        mode: Mode,
        object_id: &str,
        job_id: Option<&str>,
    ) -> Result<ExchangeReport, CoreError> {
        let batch_size = self.config.exchange_batch_size.max(1);
        let mut summary = ExchangeSummary {
            total: rows.len(),
            ..Default::default()
        };
        let mut results: Vec<RowResult> = Vec::with_capacity(rows.len());
        let mut halted = false;

        for (batch_no, batch) in rows.chunks(batch_size).enumerate() {
            if let Err(err) = ctx.check() {
                if let Some(job_id) = job_id {
                    self.jobs.update_progress(job_id, summary.progress()).await?;
                    self.jobs
                        .fail(
                            job_id,
                            RowFailure {
                                text_code: codes::CANCELLED.to_string(),
                                message: format!(
                                    "cancelled after {} of {} rows",
                                    summary.processed, summary.total
                                ),
                            },
                        )
                        .await?;
                }
                warn!(object_id, processed = summary.processed, "exchange cancelled");
                return Err(err);
            }

            for (offset, row) in batch.iter().enumerate() {
                let index = batch_no * batch_size + offset;
                if halted {
                    summary.record_unprocessed();
                    results.push(rows::not_processed(index, row));
                    continue;
                }

                let result =
                    rows::process_row(self.content.as_ref(), index, row, options, mode).await?;
                if !options.continue_on_error
                    && matches!(result.status, RowStatus::Error | RowStatus::Conflict)
                {
                    halted = true;
                }
                if result.status == RowStatus::Conflict {
                    self.emit_conflict(ctx, mode, object_id, &result).await;
                }
                summary.record(result.status);
                results.push(result);
            }

            if let Some(job_id) = job_id {
                self.jobs.update_progress(job_id, summary.progress()).await?;
            }
        }

        let conflict_summary = ConflictSummary::from_results(&results);
        let action = match mode {
            Mode::Validate => actions::IMPORT_VALIDATED,
            Mode::Apply => actions::IMPORT_APPLIED,
        };
        self.activity
            .emit(
                ctx.actor_id(),
                action,
                ActivityRecord::exchange_object(object_id),
                json!({
                    "summary": summary,
                    "by_type": conflict_summary.by_type,
                    "dry_run": options.dry_run,
                    "job_id": job_id,
                }),
            )
            .await;
        info!(
            object_id,
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            conflicts = summary.conflicts,
            skipped = summary.skipped,
            "exchange {} finished",
            match mode {
                Mode::Validate => "validate",
                Mode::Apply => "apply",
            }
        );

        let mut report = ExchangeReport {
            summary,
            results,
            conflict_summary,
            job: None,
        };
        if let Some(job_id) = job_id {
            let value = serde_json::to_value(&report)
                .map_err(|err| CoreError::Internal(format!("encode report: {err}")))?;
            report.job = Some(self.jobs.complete(job_id, value).await?);
        }
        Ok(report)
    }

    async fn emit_conflict(
        &self,
        ctx: &RequestContext,
        mode: Mode,
        object_id: &str,
        result: &RowResult,
    ) {
        let action = match mode {
            Mode::Validate => actions::IMPORT_VALIDATED_CONFLICT,
            Mode::Apply => actions::IMPORT_APPLIED_CONFLICT,
        };
        self.activity
            .emit(
                ctx.actor_id(),
                action,
                ActivityRecord::exchange_object(object_id),
                json!({
                    "index": result.index,
                    "type": result.conflict.as_ref().map(|c| c.conflict_type),
                    "resource": result.resource,
                    "entity_id": result.entity_id,
                    "translation_group_id": result.translation_group_id,
                    "target_locale": result.target_locale,
                    "field_path": result.field_path,
                }),
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::source_hash;
    use crate::domain::{ConflictType, JobStatus, Principal};
    use crate::impls::{InMemoryContentStore, InMemoryExchangeJobStore, RecordingActivitySink};
    use crate::ports::{
        Clock, SourceField, SourceFilter, SystemClock, TargetField, TargetWrite, UlidGenerator,
    };
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Harness {
        service: ExchangeService,
        content: InMemoryContentStore,
        jobs: InMemoryExchangeJobStore,
        sink: RecordingActivitySink,
    }

    async fn harness(batch: usize) -> Harness {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(clock.clone()));
        let content = InMemoryContentStore::new();
        for n in 0..5 {
            content
                .put_source("pages", &format!("p{n}"), &format!("tg_{n}"), "en", "title", "Hello")
                .await;
            content
                .put_target_record("pages", &format!("tg_{n}"), "es", &format!("p{n}_es"))
                .await;
        }
        let jobs = InMemoryExchangeJobStore::new(clock.clone(), ids.clone(), "/jobs");
        let sink = RecordingActivitySink::new();
        let config = CoreConfig {
            exchange_batch_size: batch,
            ..CoreConfig::default()
        };
        let service = ExchangeService::new(
            Arc::new(content.clone()),
            Arc::new(jobs.clone()),
            ActivityEmitter::new(Arc::new(sink.clone()), clock),
            Gate::default(),
            ids,
            Arc::new(config),
        );
        Harness {
            service,
            content,
            jobs,
            sink,
        }
    }

    fn row(n: usize) -> ExchangeRow {
        ExchangeRow {
            resource: "pages".into(),
            entity_id: format!("p{n}"),
            target_locale: "es".into(),
            field_path: "title".into(),
            source_hash: source_hash("Hello"),
            translated_text: format!("Hola {n}"),
            ..Default::default()
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Principal::new("u1"))
    }

    fn continue_on_error() -> ExchangeOptions {
        ExchangeOptions {
            continue_on_error: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn validate_reports_every_row_and_conflict() {
        let h = harness(2).await;
        let rows = vec![
            row(0),
            ExchangeRow {
                source_hash: "stale".into(),
                ..row(1)
            },
            ExchangeRow {
                entity_id: "nope".into(),
                ..row(2)
            },
            row(3),
        ];
        let report = h
            .service
            .validate(&ctx(), rows, continue_on_error())
            .await
            .unwrap();

        assert_eq!(report.summary.total, 4);
        assert_eq!(report.summary.processed, 4);
        assert_eq!(report.summary.succeeded, 2);
        assert_eq!(report.summary.conflicts, 2);
        assert_eq!(report.conflict_summary.total_conflicts, 2);
        assert_eq!(
            report.conflict_summary.by_type[&ConflictType::SourceHashDrift],
            1
        );
        assert_eq!(
            h.sink.actions().await,
            vec![
                actions::IMPORT_VALIDATED_CONFLICT,
                actions::IMPORT_VALIDATED_CONFLICT,
                actions::IMPORT_VALIDATED,
            ]
        );
        assert!(
            h.content
                .target_field("pages", "tg_0", "es", "title")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn stop_on_first_failure_marks_the_rest_not_processed() {
        let h = harness(50).await;
        let rows = vec![
            row(0),
            ExchangeRow {
                field_path: String::new(),
                ..row(1)
            },
            row(2),
            row(3),
        ];
        let report = h
            .service
            .apply(&ctx(), rows, ExchangeOptions::default())
            .await
            .unwrap();

        assert_eq!(report.summary.processed, 2);
        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.skipped, 2);
        assert_eq!(
            report.results[3].error.as_ref().unwrap().text_code,
            codes::NOT_PROCESSED
        );
        // rows before the failure were written
        assert!(
            h.content
                .target_field("pages", "tg_0", "es", "title")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            h.content
                .target_field("pages", "tg_2", "es", "title")
                .await
                .unwrap()
                .is_none()
        );
    }

    /// Refuses writes for one translation group the way a store does when
    /// the target record disappears between the read and the write.
    struct RefusingWrites {
        inner: InMemoryContentStore,
        group: &'static str,
    }

    #[async_trait]
    impl ContentStore for RefusingWrites {
        async fn source_field(
            &self,
            resource: &str,
            entity_id: &str,
            field_path: &str,
        ) -> Result<Option<SourceField>, CoreError> {
            self.inner.source_field(resource, entity_id, field_path).await
        }

        async fn target_field(
            &self,
            resource: &str,
            translation_group_id: &str,
            target_locale: &str,
            field_path: &str,
        ) -> Result<Option<TargetField>, CoreError> {
            self.inner
                .target_field(resource, translation_group_id, target_locale, field_path)
                .await
        }

        async fn target_exists(
            &self,
            resource: &str,
            translation_group_id: &str,
            target_locale: &str,
        ) -> Result<bool, CoreError> {
            self.inner
                .target_exists(resource, translation_group_id, target_locale)
                .await
        }

        async fn write_target(&self, write: TargetWrite) -> Result<TargetField, CoreError> {
            if write.translation_group_id == self.group {
                return Err(CoreError::RowError {
                    index: 0,
                    text_code: codes::MISSING_TARGET.into(),
                    message: "target record is gone".into(),
                });
            }
            self.inner.write_target(write).await
        }

        async fn list_sources(&self, filter: &SourceFilter) -> Result<Vec<SourceField>, CoreError> {
            self.inner.list_sources(filter).await
        }
    }

    #[tokio::test]
    async fn write_time_row_errors_stay_in_the_report() {
        let h = harness(2).await;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(clock.clone()));
        let service = ExchangeService::new(
            Arc::new(RefusingWrites {
                inner: h.content.clone(),
                group: "tg_1",
            }),
            Arc::new(h.jobs.clone()),
            ActivityEmitter::new(Arc::new(h.sink.clone()), clock),
            Gate::default(),
            ids,
            Arc::new(CoreConfig::default()),
        );

        let rows: Vec<_> = (0..3).map(row).collect();
        let report = service
            .apply(&ctx(), rows, continue_on_error())
            .await
            .unwrap();

        assert_eq!(report.summary.processed, 3);
        assert_eq!(report.summary.succeeded, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.results[1].status, RowStatus::Error);
        assert_eq!(
            report.results[1].error.as_ref().unwrap().text_code,
            codes::MISSING_TARGET
        );
        assert!(
            h.content
                .target_field("pages", "tg_2", "es", "title")
                .await
                .unwrap()
                .is_some()
        );
        assert_eq!(h.sink.actions().await, vec![actions::IMPORT_APPLIED]);
    }

    #[tokio::test]
    async fn async_apply_completes_the_job() {
        let h = harness(2).await;
        let rows: Vec<_> = (0..5).map(row).collect();
        let options = ExchangeOptions {
            run_async: true,
            ..continue_on_error()
        };
        let report = h.service.apply(&ctx(), rows, options).await.unwrap();
        let job = report.job.unwrap();
        assert_eq!(job.kind, JobKind::ImportApply);
        assert!(job.poll_endpoint.ends_with(&job.id));
        assert_eq!(report.summary.total, 5);

        let mut finished = h.jobs.get(&job.id).await.unwrap();
        for _ in 0..100 {
            if finished.status.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            finished = h.jobs.get(&job.id).await.unwrap();
        }
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(finished.progress.processed, 5);
        assert_eq!(finished.progress.succeeded, 5);
        let result = finished.result.unwrap();
        assert_eq!(result["summary"]["succeeded"], 5);
    }

    #[tokio::test]
    async fn cancelled_job_keeps_partial_progress() {
        let h = harness(2).await;
        let token = CancellationToken::new();
        let ctx = ctx().with_cancel(token.clone());
        let job = h
            .jobs
            .create(JobKind::ImportValidate, "u1", capability::IMPORT)
            .await
            .unwrap();
        token.cancel();

        let rows: Vec<_> = (0..5).map(row).collect();
        let err = h
            .service
            .run(&ctx, &rows, &continue_on_error(), Mode::Validate, &job.id, Some(&job.id))
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::Cancelled);

        let failed = h.jobs.get(&job.id).await.unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.unwrap().text_code, codes::CANCELLED);
        assert_eq!(failed.progress.processed, 0);
    }

    #[tokio::test]
    async fn job_lookup_checks_the_recorded_permission() {
        let h = harness(2).await;
        let job = h
            .jobs
            .create(JobKind::ImportValidate, "u1", capability::IMPORT)
            .await
            .unwrap();
        let fetched = h.service.job(&ctx(), &job.id).await.unwrap();
        assert_eq!(fetched.id, job.id);
        let err = h.service.job(&ctx(), "txj_missing").await.unwrap_err();
        assert_eq!(err.http_status(), 404);
    }
}
