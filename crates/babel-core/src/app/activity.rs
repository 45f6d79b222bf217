//! Activity emitter.
//!
//! Best-effort: sink failures are logged and dropped. Emission is awaited
//! inline, so events for one assignment keep their transition order.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::ActivityRecord;
use crate::ports::{ActivitySink, Clock};

#[derive(Clone)]
pub struct ActivityEmitter {
    sink: Arc<dyn ActivitySink>,
    clock: Arc<dyn Clock>,
}

impl ActivityEmitter {
    pub fn new(sink: Arc<dyn ActivitySink>, clock: Arc<dyn Clock>) -> Self {
        Self { sink, clock }
    }

    pub async fn emit(&self, actor: &str, action: &str, object: String, metadata: Value) {
        let record = ActivityRecord {
            actor: actor.to_string(),
            action: action.to_string(),
            object,
            metadata,
            created_at: self.clock.now(),
        };
        debug!(action = %record.action, object = %record.object, "emitting activity");
        if let Err(err) = self.sink.record(record).await {
            warn!(error = %err, action, "activity sink failed; dropping record");
        }
    }
}
