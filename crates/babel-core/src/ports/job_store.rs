//! ExchangeJobStore port - 非同期エクスチェンジジョブの記録
//!
//! A job moves `running → completed | failed` exactly once. Finished jobs are
//! frozen: later `update_progress` / `complete` / `fail` calls return the
//! stored record unchanged.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{CoreError, ExchangeJob, JobKind, JobProgress, RowFailure};

#[async_trait]
pub trait ExchangeJobStore: Send + Sync {
    /// Registers a new `running` job and its poll endpoint.
    async fn create(
        &self,
        kind: JobKind,
        created_by: &str,
        permission: &str,
    ) -> Result<ExchangeJob, CoreError>;

    async fn get(&self, id: &str) -> Result<ExchangeJob, CoreError>;

    async fn update_progress(&self, id: &str, progress: JobProgress)
    -> Result<ExchangeJob, CoreError>;

    async fn complete(&self, id: &str, result: Value) -> Result<ExchangeJob, CoreError>;

    async fn fail(&self, id: &str, error: RowFailure) -> Result<ExchangeJob, CoreError>;
}
