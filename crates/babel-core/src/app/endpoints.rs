//! Endpoints - 論理ワイヤ表面
//!
//! Transport-neutral handlers: typed request in, JSON value or
//! [`ErrorEnvelope`] out. An HTTP adapter only has to map routes onto these
//! and copy `ErrorEnvelope::http_status` into the response.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::contracts::SharedContracts;
use crate::domain::{
    CoreError, ErrorEnvelope, ExchangeFormat, ExchangeOptions, ExchangeRow, RequestContext,
};
use crate::ports::SourceFilter;

use super::dashboard::DashboardService;
use super::exchange::{ExchangeService, ExportRequest, codec};
use super::queue_view::{MyWorkRequest, QueueRequest, QueueViewService};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRequest {
    pub format: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportCall {
    #[serde(alias = "filters")]
    pub filter: SourceFilter,
    pub target_locales: Vec<String>,
    pub format: String,
}

/// Raw import body plus its declared format and flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCall {
    pub format: String,
    pub body: String,
    #[serde(default, flatten)]
    pub options: ExchangeOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub id: String,
}

#[derive(Clone)]
pub struct Endpoints {
    queue: QueueViewService,
    dashboard: DashboardService,
    exchange: ExchangeService,
}

impl Endpoints {
    pub fn new(queue: QueueViewService, dashboard: DashboardService, exchange: ExchangeService) -> Self {
        Self {
            queue,
            dashboard,
            exchange,
        }
    }

    /// queue.my_work
    pub async fn my_work(
        &self,
        ctx: &RequestContext,
        request: &MyWorkRequest,
    ) -> Result<Value, ErrorEnvelope> {
        let envelope = self.queue.my_work(ctx, request).await?;
        to_json(&envelope)
    }

    /// queue.list
    pub async fn queue_list(
        &self,
        ctx: &RequestContext,
        request: &QueueRequest,
    ) -> Result<Value, ErrorEnvelope> {
        let envelope = self.queue.queue(ctx, request).await?;
        to_json(&envelope)
    }

    pub async fn dashboard(&self, ctx: &RequestContext) -> Result<Value, ErrorEnvelope> {
        let snapshot = self.dashboard.snapshot(ctx).await?;
        to_json(&snapshot)
    }

    pub fn contracts(&self) -> Result<Value, ErrorEnvelope> {
        to_json(&SharedContracts::current())
    }

    /// exchange.template
    pub fn exchange_template(&self, request: &TemplateRequest) -> Result<Value, ErrorEnvelope> {
        let format = parse_format(&request.format)?;
        let body = self.exchange.template(format)?;
        Ok(json!({
            "format": format,
            "content_type": format.content_type(),
            "body": String::from_utf8_lossy(&body),
        }))
    }

    /// exchange.export
    pub async fn exchange_export(
        &self,
        ctx: &RequestContext,
        request: &ExportCall,
    ) -> Result<Value, ErrorEnvelope> {
        let format = parse_format(&request.format)?;
        let payload = self
            .exchange
            .export(
                ctx,
                &ExportRequest {
                    filter: request.filter.clone(),
                    target_locales: request.target_locales.clone(),
                    format,
                },
            )
            .await?;
        to_json(&payload)
    }

    /// exchange.validate
    pub async fn exchange_validate(
        &self,
        ctx: &RequestContext,
        request: ImportCall,
    ) -> Result<Value, ErrorEnvelope> {
        let options = request.options;
        let rows = self.decode_import(ctx, &request).await?;
        let report = self.exchange.validate(ctx, rows, options).await?;
        to_json(&report)
    }

    /// exchange.apply
    pub async fn exchange_apply(
        &self,
        ctx: &RequestContext,
        request: ImportCall,
    ) -> Result<Value, ErrorEnvelope> {
        let options = request.options;
        let rows = self.decode_import(ctx, &request).await?;
        let report = self.exchange.apply(ctx, rows, options).await?;
        to_json(&report)
    }

    /// exchange.job.get
    pub async fn exchange_job_get(
        &self,
        ctx: &RequestContext,
        request: &JobRequest,
    ) -> Result<Value, ErrorEnvelope> {
        let job = self.exchange.job(ctx, &request.id).await?;
        to_json(&job)
    }

    /// Format and payload errors end the import before any row runs and
    /// are recorded as its only activity.
    async fn decode_import(
        &self,
        ctx: &RequestContext,
        request: &ImportCall,
    ) -> Result<Vec<ExchangeRow>, ErrorEnvelope> {
        let decoded = parse_format(&request.format)
            .and_then(|format| codec::decode_rows(format, request.body.as_bytes()));
        match decoded {
            Ok(rows) => Ok(rows),
            Err(err) => {
                debug!(error = %err, "import rejected before processing");
                self.exchange.record_import_failure(ctx, &err).await;
                Err(err.into())
            }
        }
    }
}

fn parse_format(value: &str) -> Result<ExchangeFormat, CoreError> {
    ExchangeFormat::parse(value).ok_or_else(|| CoreError::UnsupportedFormat {
        format: value.to_string(),
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ErrorEnvelope> {
    serde_json::to_value(value)
        .map_err(|err| CoreError::Internal(format!("encode response: {err}")).into())
}
