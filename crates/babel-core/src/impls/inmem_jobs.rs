//! InMemoryExchangeJobStore - プロセス内の非同期ジョブテーブル

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{
    CoreError, ExchangeJob, JobKind, JobProgress, JobStatus, RowFailure,
};
use crate::ports::{Clock, ExchangeJobStore, IdGenerator};

/// InMemoryExchangeJobStore は ExchangeJobStore のメモリ実装
///
/// `poll_endpoint` は `"{poll_base}/{id}"`。
#[derive(Clone)]
pub struct InMemoryExchangeJobStore {
    jobs: Arc<Mutex<HashMap<String, ExchangeJob>>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    poll_base: String,
}

impl InMemoryExchangeJobStore {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>, poll_base: impl Into<String>) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            clock,
            ids,
            poll_base: poll_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn mutate<F>(&self, id: &str, apply: F) -> Result<ExchangeJob, CoreError>
    where
        F: FnOnce(&mut ExchangeJob) + Send,
    {
        let now = self.clock.now();
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(id).ok_or_else(|| CoreError::NotFound {
            resource: "exchange_job",
            id: id.to_string(),
        })?;
        if job.status.is_finished() {
            debug!(job_id = %id, status = job.status.as_str(), "ignoring write to finished job");
            return Ok(job.clone());
        }
        apply(job);
        job.updated_at = now.max(job.updated_at);
        Ok(job.clone())
    }
}

#[async_trait]
impl ExchangeJobStore for InMemoryExchangeJobStore {
    async fn create(
        &self,
        kind: JobKind,
        created_by: &str,
        permission: &str,
    ) -> Result<ExchangeJob, CoreError> {
        let now = self.clock.now();
        let id = self.ids.generate_job_id().to_string();
        let job = ExchangeJob {
            poll_endpoint: format!("{}/{}", self.poll_base, id),
            id: id.clone(),
            kind,
            status: JobStatus::Running,
            permission: permission.to_string(),
            created_by: created_by.to_string(),
            progress: JobProgress::default(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        self.jobs.lock().await.insert(id, job.clone());
        info!(job_id = %job.id, kind = kind.as_str(), created_by, "exchange job started");
        Ok(job)
    }

    async fn get(&self, id: &str) -> Result<ExchangeJob, CoreError> {
        self.jobs
            .lock()
            .await
            .get(id.trim())
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                resource: "exchange_job",
                id: id.to_string(),
            })
    }

    async fn update_progress(
        &self,
        id: &str,
        progress: JobProgress,
    ) -> Result<ExchangeJob, CoreError> {
        self.mutate(id, |job| job.progress = progress).await
    }

    async fn complete(&self, id: &str, result: Value) -> Result<ExchangeJob, CoreError> {
        let job = self
            .mutate(id, |job| {
                job.status = JobStatus::Completed;
                job.result = Some(result);
            })
            .await?;
        info!(job_id = %job.id, processed = job.progress.processed, "exchange job completed");
        Ok(job)
    }

    async fn fail(&self, id: &str, error: RowFailure) -> Result<ExchangeJob, CoreError> {
        let job = self
            .mutate(id, |job| {
                job.status = JobStatus::Failed;
                job.error = Some(error);
            })
            .await?;
        warn!(
            job_id = %job.id,
            text_code = job.error.as_ref().map(|e| e.text_code.as_str()).unwrap_or_default(),
            "exchange job failed"
        );
        Ok(job)
    }
}
