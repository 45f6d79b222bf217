//! ActivitySink port - 監査ログ送信の抽象化
//!
//! Sinks may fail; the emitter in `app::activity` logs and swallows those
//! failures so the primary operation never sees them.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ActivityRecord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("activity sink failed: {0}")]
pub struct SinkError(pub String);

#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record(&self, record: ActivityRecord) -> Result<(), SinkError>;
}
