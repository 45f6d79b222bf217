//! Export and template.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::domain::events::actions;
use crate::domain::{
    ActivityRecord, CoreError, ExchangeFormat, ExchangeRow, RequestContext, ValidationFailure,
    Violation,
};
use crate::ports::{SourceFilter, capability};

use super::{ExchangeService, codec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    #[serde(default, alias = "filters")]
    pub filter: SourceFilter,
    pub target_locales: Vec<String>,
    pub format: ExchangeFormat,
}

/// Serialized export body plus what a transport needs to send it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPayload {
    pub format: ExchangeFormat,
    pub content_type: String,
    pub row_count: usize,
    pub body: String,
}

impl ExchangeService {
    /// One row per (source field, target locale), carrying the current
    /// source hash and any existing translation.
    pub async fn export(
        &self,
        ctx: &RequestContext,
        request: &ExportRequest,
    ) -> Result<ExportPayload, CoreError> {
        ctx.check()?;
        self.gate.require(&ctx.principal, capability::EXPORT).await?;

        let mut locales: Vec<String> = request
            .target_locales
            .iter()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        let mut seen = std::collections::HashSet::new();
        locales.retain(|l| seen.insert(l.clone()));
        if locales.is_empty() {
            return Err(ValidationFailure::single(Violation::MissingField {
                field: "target_locales",
            })
            .into());
        }

        let sources = self.content.list_sources(&request.filter).await?;
        let mut rows = Vec::with_capacity(sources.len() * locales.len());
        for source in &sources {
            ctx.check()?;
            for locale in &locales {
                let existing = self
                    .content
                    .target_field(
                        &source.resource,
                        &source.translation_group_id,
                        locale,
                        &source.field_path,
                    )
                    .await?;
                let row_version = existing.as_ref().map_or(0, |t| t.row_version);
                rows.push(ExchangeRow {
                    resource: source.resource.clone(),
                    entity_id: source.entity_id.clone(),
                    translation_group_id: source.translation_group_id.clone(),
                    target_locale: locale.clone(),
                    field_path: source.field_path.clone(),
                    source_text: source.text.clone(),
                    source_hash: source.hash.clone(),
                    translated_text: existing.map(|t| t.text).unwrap_or_default(),
                    metadata: Some(json!({
                        "row_version": row_version,
                        "source_version": source.version,
                    })),
                    ..Default::default()
                });
            }
        }

        let body = codec::encode_rows(request.format, &rows)?;
        let body = String::from_utf8(body)
            .map_err(|err| CoreError::Internal(format!("export body is not utf-8: {err}")))?;

        let request_id = self.ids.generate_job_id().to_string();
        self.activity
            .emit(
                ctx.actor_id(),
                actions::EXPORTED,
                ActivityRecord::exchange_object(&request_id),
                json!({
                    "format": request.format,
                    "row_count": rows.len(),
                    "target_locales": locales,
                    "filter": request.filter,
                }),
            )
            .await;
        info!(
            format = request.format.as_str(),
            rows = rows.len(),
            "exchange export finished"
        );

        Ok(ExportPayload {
            format: request.format,
            content_type: request.format.content_type().to_string(),
            row_count: rows.len(),
            body,
        })
    }

    pub fn template(&self, format: ExchangeFormat) -> Result<Vec<u8>, CoreError> {
        codec::template(format)
    }
}
