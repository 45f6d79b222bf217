//! CoreBuilder - サービスの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - build() 時に CoreConfig を検証する
//! - 不正な設定は BuildError を返す
//!
//! 未設定の port はデフォルト実装（SystemClock, ULID, in-memory store,
//! authorizer なし = 全許可, NoopActivitySink）で埋める。

use std::sync::Arc;

use tracing::debug;

use crate::config::{ConfigError, CoreConfig};
use crate::impls::{
    InMemoryAssignmentStore, InMemoryContentStore, InMemoryExchangeJobStore, NoopActivitySink,
};
use crate::ports::{
    ActivitySink, AssignmentStore, Authorizer, Clock, ContentStore, ExchangeJobStore, IdGenerator,
    SystemClock, UlidGenerator,
};

use super::activity::ActivityEmitter;
use super::dashboard::DashboardService;
use super::endpoints::Endpoints;
use super::exchange::ExchangeService;
use super::gate::Gate;
use super::queue_view::QueueViewService;
use super::workflow::WorkflowService;

/// BuildError は構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// CoreBuilder は port を受け取り [`Core`] を組み立てる
///
/// # 使用例
/// ```ignore
/// let core = CoreBuilder::new()
///     .with_config(config)
///     .with_authorizer(RoleAuthorizer::new().grant("reviewer", "approve", "translations"))
///     .build()?;
/// ```
#[derive(Default)]
pub struct CoreBuilder {
    config: CoreConfig,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    store: Option<Arc<dyn AssignmentStore>>,
    jobs: Option<Arc<dyn ExchangeJobStore>>,
    content: Option<Arc<dyn ContentStore>>,
    authorizer: Option<Arc<dyn Authorizer>>,
    sink: Option<Arc<dyn ActivitySink>>,
}

impl CoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Some(Arc::new(ids));
        self
    }

    pub fn with_store(mut self, store: impl AssignmentStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn with_jobs(mut self, jobs: impl ExchangeJobStore + 'static) -> Self {
        self.jobs = Some(Arc::new(jobs));
        self
    }

    pub fn with_content(mut self, content: impl ContentStore + 'static) -> Self {
        self.content = Some(Arc::new(content));
        self
    }

    pub fn with_authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizer = Some(Arc::new(authorizer));
        self
    }

    pub fn with_sink(mut self, sink: impl ActivitySink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn build(self) -> Result<Core, BuildError> {
        self.config.validate()?;
        let config = Arc::new(self.config);

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));
        let store = self.store.unwrap_or_else(|| {
            Arc::new(InMemoryAssignmentStore::new(clock.clone(), ids.clone()))
        });
        let jobs = self.jobs.unwrap_or_else(|| {
            Arc::new(InMemoryExchangeJobStore::new(
                clock.clone(),
                ids.clone(),
                config.exchange_poll_base.clone(),
            ))
        });
        let content = self
            .content
            .unwrap_or_else(|| Arc::new(InMemoryContentStore::new()));
        let sink = self.sink.unwrap_or_else(|| Arc::new(NoopActivitySink));

        let gate = Gate::new(self.authorizer);
        let activity = ActivityEmitter::new(sink, clock.clone());

        let workflow = WorkflowService::new(
            store.clone(),
            gate.clone(),
            activity.clone(),
            clock.clone(),
            config.clone(),
        );
        let queue = QueueViewService::new(store.clone(), gate.clone(), clock.clone(), config.clone());
        let dashboard = DashboardService::new(store, clock, config.clone());
        let exchange = ExchangeService::new(content, jobs, activity, gate, ids, config.clone());
        let endpoints = Endpoints::new(queue.clone(), dashboard.clone(), exchange.clone());

        debug!(
            due_soon_window_hours = config.due_soon_window_hours,
            exchange_batch_size = config.exchange_batch_size,
            "core assembled"
        );
        Ok(Core {
            workflow,
            queue,
            dashboard,
            exchange,
            endpoints,
            config,
        })
    }
}

/// Core は組み立て済みのサービス群
#[derive(Clone)]
pub struct Core {
    pub workflow: WorkflowService,
    pub queue: QueueViewService,
    pub dashboard: DashboardService,
    pub exchange: ExchangeService,
    pub endpoints: Endpoints,
    pub config: Arc<CoreConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssignmentDraft, Principal, RequestContext};
    use crate::impls::RoleAuthorizer;
    use crate::ports::{FixedClock, TRANSLATIONS_RESOURCE, capability};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_build_with_defaults() {
        let core = CoreBuilder::new().build();
        assert!(core.is_ok());
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = CoreConfig {
            max_per_page: 0,
            ..CoreConfig::default()
        };
        let core = CoreBuilder::new().with_config(config).build();
        assert!(matches!(core, Err(BuildError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_build_wires_the_authorizer_and_clock() {
        let now = Utc.with_ymd_and_hms(2026, 2, 17, 12, 0, 0).unwrap();
        let core = CoreBuilder::new()
            .with_clock(FixedClock::new(now))
            .with_authorizer(RoleAuthorizer::new().grant(
                "manager",
                capability::MANAGE,
                TRANSLATIONS_RESOURCE,
            ))
            .build()
            .unwrap();

        let draft = AssignmentDraft {
            translation_group_id: "tg_1".into(),
            entity_type: "pages".into(),
            source_record_id: "p1".into(),
            source_locale: "en".into(),
            target_locale: "es".into(),
            ..Default::default()
        };
        let anonymous = RequestContext::new(Principal::new("u1"));
        let err = core.workflow.create(&anonymous, draft.clone()).await.unwrap_err();
        assert_eq!(err.category(), "permission_denied");

        let manager = RequestContext::new(Principal::new("u2").with_roles(["manager"]));
        let created = core.workflow.create(&manager, draft).await.unwrap();
        assert_eq!(created.created_at, now);
    }
}
