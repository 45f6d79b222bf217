//! Exchange wire codec: CSV and JSON rows.
//!
//! CSV columns follow [`CSV_COLUMNS`]; `metadata` travels as a JSON string and
//! `conflict_type` flattens the row conflict. Unknown columns are ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::{
    ConflictType, CoreError, ExchangeFormat, ExchangeRow, RowConflict, RowStatus,
};

pub const CSV_COLUMNS: [&str; 12] = [
    "resource",
    "entity_id",
    "translation_group_id",
    "target_locale",
    "field_path",
    "source_text",
    "source_hash",
    "translated_text",
    "status",
    "error",
    "conflict_type",
    "metadata",
];

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct CsvRow {
    resource: String,
    entity_id: String,
    translation_group_id: String,
    target_locale: String,
    field_path: String,
    source_text: String,
    source_hash: String,
    translated_text: String,
    status: String,
    error: String,
    conflict_type: String,
    metadata: String,
}

impl CsvRow {
    fn into_row(self, line: usize) -> Result<ExchangeRow, CoreError> {
        let metadata = match self.metadata.trim() {
            "" => None,
            raw => Some(serde_json::from_str::<Value>(raw).map_err(|err| {
                CoreError::InvalidPayload {
                    format: ExchangeFormat::Csv.as_str().into(),
                    message: format!("line {line}: metadata is not JSON: {err}"),
                }
            })?),
        };
        Ok(ExchangeRow {
            resource: self.resource.trim().to_string(),
            entity_id: self.entity_id.trim().to_string(),
            translation_group_id: self.translation_group_id.trim().to_string(),
            target_locale: self.target_locale.trim().to_string(),
            field_path: self.field_path.trim().to_string(),
            source_text: self.source_text,
            source_hash: self.source_hash.trim().to_string(),
            translated_text: self.translated_text,
            status: non_empty(&self.status).map(RowStatus::normalize),
            error: non_empty(&self.error).map(str::to_string),
            conflict: non_empty(&self.conflict_type).map(|t| RowConflict {
                conflict_type: ConflictType::parse(t),
                message: String::new(),
                details: None,
            }),
            metadata,
        })
    }

    fn from_row(row: &ExchangeRow) -> Self {
        Self {
            resource: row.resource.clone(),
            entity_id: row.entity_id.clone(),
            translation_group_id: row.translation_group_id.clone(),
            target_locale: row.target_locale.clone(),
            field_path: row.field_path.clone(),
            source_text: row.source_text.clone(),
            source_hash: row.source_hash.clone(),
            translated_text: row.translated_text.clone(),
            status: row.status.map(|s| s.as_str().to_string()).unwrap_or_default(),
            error: row.error.clone().unwrap_or_default(),
            conflict_type: row
                .conflict
                .as_ref()
                .map(|c| c.conflict_type.as_str().to_string())
                .unwrap_or_default(),
            metadata: row
                .metadata
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_default(),
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

/// `{"rows": [...]}` is accepted alongside a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonRows {
    Bare(Vec<ExchangeRow>),
    Wrapped { rows: Vec<ExchangeRow> },
}

pub fn decode_rows(format: ExchangeFormat, body: &[u8]) -> Result<Vec<ExchangeRow>, CoreError> {
    match format {
        ExchangeFormat::Json => {
            let rows: JsonRows =
                serde_json::from_slice(body).map_err(|err| CoreError::InvalidPayload {
                    format: format.as_str().into(),
                    message: err.to_string(),
                })?;
            Ok(match rows {
                JsonRows::Bare(rows) | JsonRows::Wrapped { rows } => rows,
            })
        }
        ExchangeFormat::Csv => {
            let mut reader = csv::ReaderBuilder::new()
                .trim(csv::Trim::Headers)
                .flexible(true)
                .from_reader(body);
            let mut rows = Vec::new();
            for (n, record) in reader.deserialize::<CsvRow>().enumerate() {
                let record = record.map_err(|err| CoreError::InvalidPayload {
                    format: format.as_str().into(),
                    message: err.to_string(),
                })?;
                // header is line 1
                rows.push(record.into_row(n + 2)?);
            }
            Ok(rows)
        }
    }
}

pub fn encode_rows(format: ExchangeFormat, rows: &[ExchangeRow]) -> Result<Vec<u8>, CoreError> {
    match format {
        ExchangeFormat::Json => serde_json::to_vec_pretty(rows)
            .map_err(|err| CoreError::Internal(format!("encode json rows: {err}"))),
        ExchangeFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            if rows.is_empty() {
                writer
                    .write_record(CSV_COLUMNS)
                    .map_err(|err| CoreError::Internal(format!("encode csv header: {err}")))?;
            }
            for row in rows {
                writer
                    .serialize(CsvRow::from_row(row))
                    .map_err(|err| CoreError::Internal(format!("encode csv row: {err}")))?;
            }
            writer
                .into_inner()
                .map_err(|err| CoreError::Internal(format!("flush csv: {err}")))
        }
    }
}

/// Header-only CSV, or a one-row JSON example.
pub fn template(format: ExchangeFormat) -> Result<Vec<u8>, CoreError> {
    match format {
        ExchangeFormat::Csv => encode_rows(format, &[]),
        ExchangeFormat::Json => {
            let example = json!([{
                "resource": "pages",
                "entity_id": "page_123",
                "translation_group_id": "tg_123",
                "target_locale": "es",
                "field_path": "title",
                "source_text": "Hello world",
                "source_hash": "<sha256 of source_text>",
                "translated_text": "Hola mundo",
                "metadata": { "row_version": 1 }
            }]);
            serde_json::to_vec_pretty(&example)
                .map_err(|err| CoreError::Internal(format!("encode template: {err}")))
        }
    }
}
