//! ActivitySink 実装
//!
//! - **NoopActivitySink**: 何もしない
//! - **RecordingActivitySink**: メモリに蓄積（テスト用）
//! - **TracingActivitySink**: `tracing` の info イベントとして出力

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::ActivityRecord;
use crate::ports::{ActivitySink, SinkError};

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActivitySink;

#[async_trait]
impl ActivitySink for NoopActivitySink {
    async fn record(&self, _record: ActivityRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps every record in memory. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingActivitySink {
    records: Arc<Mutex<Vec<ActivityRecord>>>,
}

impl RecordingActivitySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<ActivityRecord> {
        self.records.lock().await.clone()
    }

    pub async fn actions(&self) -> Vec<String> {
        self.records
            .lock()
            .await
            .iter()
            .map(|r| r.action.clone())
            .collect()
    }
}

#[async_trait]
impl ActivitySink for RecordingActivitySink {
    async fn record(&self, record: ActivityRecord) -> Result<(), SinkError> {
        self.records.lock().await.push(record);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActivitySink;

#[async_trait]
impl ActivitySink for TracingActivitySink {
    async fn record(&self, record: ActivityRecord) -> Result<(), SinkError> {
        info!(
            target: "babel::activity",
            actor = %record.actor,
            action = %record.action,
            object = %record.object,
            metadata = %record.metadata,
            created_at = %record.created_at,
            "activity"
        );
        Ok(())
    }
}
