//! Per-row validation and apply.
//!
//! Rules run in a fixed order; the first one that fires decides the row.

use serde_json::{Map, Value, json};

use crate::contracts::SourceTargetDrift;
use crate::domain::{
    ConflictType, CoreError, ExchangeOptions, ExchangeRow, RowConflict, RowFailure, RowResult,
    RowStatus,
};
use crate::ports::{ContentStore, TargetWrite};

pub mod codes {
    pub const MISSING_FIELD: &str = "translation_exchange.missing_field";
    pub const MISSING_LINKAGE: &str = "translation_exchange.missing_linkage";
    pub const MISSING_TARGET: &str = "translation_exchange.missing_target";
    pub const SOURCE_HASH_DRIFT: &str = "translation_exchange.source_hash_drift";
    pub const ROW_VERSION_CONFLICT: &str = "translation_exchange.row_version_conflict";
    pub const NOT_PROCESSED: &str = "translation_exchange.not_processed";
    pub const CANCELLED: &str = "translation_exchange.cancelled";
    pub const EMPTY_TRANSLATION: &str = "translation_exchange.empty_translation";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Validate,
    Apply,
}

fn base_result(index: usize, row: &ExchangeRow, status: RowStatus) -> RowResult {
    RowResult {
        index,
        resource: row.resource.clone(),
        entity_id: row.entity_id.clone(),
        translation_group_id: row.translation_group_id.clone(),
        target_locale: row.target_locale.trim().to_lowercase(),
        field_path: row.field_path.clone(),
        status,
        error: None,
        conflict: None,
        metadata: None,
    }
}

fn error_result(index: usize, row: &ExchangeRow, text_code: &str, message: String) -> RowResult {
    RowResult {
        error: Some(RowFailure {
            text_code: text_code.to_string(),
            message,
        }),
        ..base_result(index, row, RowStatus::Error)
    }
}

fn conflict_result(
    index: usize,
    row: &ExchangeRow,
    conflict_type: ConflictType,
    text_code: &str,
    message: String,
    details: Option<Value>,
) -> RowResult {
    RowResult {
        error: Some(RowFailure {
            text_code: text_code.to_string(),
            message: message.clone(),
        }),
        conflict: Some(RowConflict {
            conflict_type,
            message,
            details,
        }),
        ..base_result(index, row, RowStatus::Conflict)
    }
}

fn stale_row_version(
    index: usize,
    row: &ExchangeRow,
    group: &str,
    expected: u64,
    actual: u64,
) -> RowResult {
    RowResult {
        translation_group_id: group.to_string(),
        ..conflict_result(
            index,
            row,
            ConflictType::RowVersionConflict,
            codes::ROW_VERSION_CONFLICT,
            format!("row version {expected} is stale (current {actual})"),
            Some(json!({ "expected": expected, "actual": actual })),
        )
    }
}

/// Reported for rows left untouched after an early stop.
pub fn not_processed(index: usize, row: &ExchangeRow) -> RowResult {
    RowResult {
        error: Some(RowFailure {
            text_code: codes::NOT_PROCESSED.to_string(),
            message: "not processed after an earlier failure".to_string(),
        }),
        ..base_result(index, row, RowStatus::Skipped)
    }
}

/// Evaluates one row. `Err` is reserved for collaborator failures; every
/// row-level problem is reported in the returned [`RowResult`].
pub async fn process_row(
    content: &dyn ContentStore,
    index: usize,
    row: &ExchangeRow,
    options: &ExchangeOptions,
    mode: Mode,
) -> Result<RowResult, CoreError> {
    let missing: Vec<&str> = [
        ("resource", &row.resource),
        ("entity_id", &row.entity_id),
        ("target_locale", &row.target_locale),
        ("field_path", &row.field_path),
    ]
    .into_iter()
    .filter(|(_, v)| v.trim().is_empty())
    .map(|(name, _)| name)
    .collect();
    if !missing.is_empty() {
        return Ok(error_result(
            index,
            row,
            codes::MISSING_FIELD,
            format!("missing required fields: {}", missing.join(", ")),
        ));
    }

    let Some(source) = content
        .source_field(&row.resource, &row.entity_id, &row.field_path)
        .await?
    else {
        return Ok(conflict_result(
            index,
            row,
            ConflictType::MissingLinkage,
            codes::MISSING_LINKAGE,
            format!(
                "no source {} {} field {}",
                row.resource, row.entity_id, row.field_path
            ),
            None,
        ));
    };

    let supplied_group = row.translation_group_id.trim();
    if !supplied_group.is_empty() && supplied_group != source.translation_group_id {
        return Ok(conflict_result(
            index,
            row,
            ConflictType::MissingLinkage,
            codes::MISSING_LINKAGE,
            format!(
                "translation group {} does not match source group {}",
                supplied_group, source.translation_group_id
            ),
            Some(json!({ "expected_translation_group_id": source.translation_group_id })),
        ));
    }

    let group = source.translation_group_id.as_str();
    let locale = row.target_locale.trim().to_lowercase();
    let mut result = base_result(index, row, RowStatus::Success);
    result.translation_group_id = group.to_string();

    let target_exists = content.target_exists(&row.resource, group, &locale).await?;
    if !target_exists && !options.allow_create_missing {
        return Ok(RowResult {
            translation_group_id: group.to_string(),
            ..error_result(
                index,
                row,
                codes::MISSING_TARGET,
                format!("no {} record for group {} in locale {}", row.resource, group, locale),
            )
        });
    }

    let mut metadata = Map::new();
    metadata.insert("source_hash".into(), json!(source.hash));
    metadata.insert("source_version".into(), json!(source.version));

    let supplied_hash = row.source_hash.trim();
    if !supplied_hash.is_empty() && !supplied_hash.eq_ignore_ascii_case(&source.hash) {
        if !options.allow_source_hash_override {
            let changed = if source.changed_fields.is_empty() {
                vec![source.field_path.clone()]
            } else {
                source.changed_fields.clone()
            };
            let drift = SourceTargetDrift::new(source.hash.clone(), source.version, changed);
            let details = serde_json::to_value(&drift)
                .map_err(|err| CoreError::Internal(format!("encode drift: {err}")))?;
            return Ok(RowResult {
                translation_group_id: group.to_string(),
                metadata: Some(details.clone()),
                ..conflict_result(
                    index,
                    row,
                    ConflictType::SourceHashDrift,
                    codes::SOURCE_HASH_DRIFT,
                    "source changed since this row was exported".to_string(),
                    Some(details),
                )
            });
        }
        metadata.insert("source_hash_override".into(), Value::Bool(true));
        metadata.insert("supplied_source_hash".into(), json!(supplied_hash));
    }

    let current_target = content
        .target_field(&row.resource, group, &locale, &row.field_path)
        .await?;
    let current_version = current_target.as_ref().map_or(0, |t| t.row_version);
    if let Some(expected) = row.row_version() {
        if expected != current_version {
            return Ok(stale_row_version(index, row, group, expected, current_version));
        }
    }
    metadata.insert("row_version".into(), json!(current_version));

    if row.translated_text.trim().is_empty() {
        result.status = RowStatus::Skipped;
        result.error = Some(RowFailure {
            text_code: codes::EMPTY_TRANSLATION.to_string(),
            message: "translated_text is empty".to_string(),
        });
        result.metadata = Some(Value::Object(metadata));
        return Ok(result);
    }

    if mode == Mode::Apply {
        if options.dry_run {
            metadata.insert("dry_run".into(), Value::Bool(true));
        } else {
            let outcome = content
                .write_target(TargetWrite {
                    resource: row.resource.clone(),
                    translation_group_id: group.to_string(),
                    target_locale: locale.clone(),
                    field_path: row.field_path.clone(),
                    text: row.translated_text.clone(),
                    create_missing: options.allow_create_missing,
                    expected_row_version: row.row_version(),
                })
                .await;
            let written = match outcome {
                Ok(written) => written,
                // another writer got there between the check and the write
                Err(CoreError::VersionConflict { expected, actual }) => {
                    return Ok(stale_row_version(index, row, group, expected, actual));
                }
                Err(CoreError::RowError {
                    text_code, message, ..
                }) => {
                    return Ok(RowResult {
                        translation_group_id: group.to_string(),
                        ..error_result(index, row, &text_code, message)
                    });
                }
                Err(err) => return Err(err),
            };
            metadata.insert("row_version".into(), json!(written.row_version));
            metadata.insert("target_record_id".into(), json!(written.record_id));
            if !target_exists {
                metadata.insert("created".into(), Value::Bool(true));
            }
        }
    }

    result.metadata = Some(Value::Object(metadata));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::source_hash;
    use crate::impls::InMemoryContentStore;
    use crate::ports::{SourceField, SourceFilter, TargetField};
    use async_trait::async_trait;
    use rstest::rstest;
    use std::time::Duration;

    async fn content() -> InMemoryContentStore {
        let store = InMemoryContentStore::new();
        store
            .put_source("pages", "p1", "tg_1", "en", "title", "Hello")
            .await;
        store.put_target_record("pages", "tg_1", "es", "p1_es").await;
        store
    }

    fn row() -> ExchangeRow {
        ExchangeRow {
            resource: "pages".into(),
            entity_id: "p1".into(),
            translation_group_id: "tg_1".into(),
            target_locale: "es".into(),
            field_path: "title".into(),
            source_text: "Hello".into(),
            source_hash: source_hash("Hello"),
            translated_text: "Hola".into(),
            ..Default::default()
        }
    }

    fn opts() -> ExchangeOptions {
        ExchangeOptions::default()
    }

    #[rstest]
    #[case::missing_field(ExchangeRow { field_path: String::new(), ..row() }, RowStatus::Error, None)]
    #[case::unknown_source(ExchangeRow { entity_id: "p404".into(), ..row() }, RowStatus::Conflict, Some(ConflictType::MissingLinkage))]
    #[case::group_mismatch(ExchangeRow { translation_group_id: "tg_9".into(), ..row() }, RowStatus::Conflict, Some(ConflictType::MissingLinkage))]
    #[case::missing_target(ExchangeRow { target_locale: "fr".into(), ..row() }, RowStatus::Error, None)]
    #[case::hash_drift(ExchangeRow { source_hash: source_hash("Hello?"), ..row() }, RowStatus::Conflict, Some(ConflictType::SourceHashDrift))]
    #[case::stale_row_version(ExchangeRow { metadata: Some(json!({ "row_version": 5 })), ..row() }, RowStatus::Conflict, Some(ConflictType::RowVersionConflict))]
    #[case::empty_translation(ExchangeRow { translated_text: "  ".into(), ..row() }, RowStatus::Skipped, None)]
    #[case::ok(row(), RowStatus::Success, None)]
    #[tokio::test]
    async fn rules_classify_rows(
        #[case] input: ExchangeRow,
        #[case] status: RowStatus,
        #[case] conflict: Option<ConflictType>,
    ) {
        let content = content().await;
        let result = process_row(&content, 0, &input, &opts(), Mode::Validate)
            .await
            .unwrap();
        assert_eq!(result.status, status);
        assert_eq!(result.conflict.map(|c| c.conflict_type), conflict);
    }

    #[tokio::test]
    async fn drift_conflict_carries_drift_metadata() {
        let content = content().await;
        content
            .put_source("pages", "p1", "tg_1", "en", "title", "Hello there")
            .await;
        let result = process_row(&content, 3, &row(), &opts(), Mode::Validate)
            .await
            .unwrap();
        let details = result.conflict.unwrap().details.unwrap();
        assert_eq!(details["source_hash"], source_hash("Hello there"));
        assert_eq!(details["source_version"], 2);
        assert_eq!(details["changed_fields_summary"]["fields"], json!(["title"]));
        assert_eq!(result.index, 3);
    }

    #[tokio::test]
    async fn override_accepts_drift_and_records_it() {
        let content = content().await;
        let input = ExchangeRow {
            source_hash: "deadbeef".into(),
            ..row()
        };
        let options = ExchangeOptions {
            allow_source_hash_override: true,
            ..opts()
        };
        let result = process_row(&content, 0, &input, &options, Mode::Apply)
            .await
            .unwrap();
        assert_eq!(result.status, RowStatus::Success);
        assert_eq!(result.metadata.unwrap()["source_hash_override"], true);
    }

    #[tokio::test]
    async fn apply_writes_and_bumps_row_version() {
        let content = content().await;
        let result = process_row(&content, 0, &row(), &opts(), Mode::Apply)
            .await
            .unwrap();
        assert_eq!(result.metadata.unwrap()["row_version"], 1);

        let next = ExchangeRow {
            translated_text: "Hola!".into(),
            metadata: Some(json!({ "row_version": 1 })),
            ..row()
        };
        let result = process_row(&content, 0, &next, &opts(), Mode::Apply)
            .await
            .unwrap();
        assert_eq!(result.status, RowStatus::Success);
        let stored = content
            .target_field("pages", "tg_1", "es", "title")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.text, "Hola!");
        assert_eq!(stored.row_version, 2);
    }

    /// Holds every write long enough for a second apply to pass the read
    /// check first.
    struct SlowWrites(InMemoryContentStore);

    #[async_trait]
    impl ContentStore for SlowWrites {
        async fn source_field(
            &self,
            resource: &str,
            entity_id: &str,
            field_path: &str,
        ) -> Result<Option<SourceField>, CoreError> {
            self.0.source_field(resource, entity_id, field_path).await
        }

        async fn target_field(
            &self,
            resource: &str,
            translation_group_id: &str,
            target_locale: &str,
            field_path: &str,
        ) -> Result<Option<TargetField>, CoreError> {
            self.0
                .target_field(resource, translation_group_id, target_locale, field_path)
                .await
        }

        async fn target_exists(
            &self,
            resource: &str,
            translation_group_id: &str,
            target_locale: &str,
        ) -> Result<bool, CoreError> {
            self.0
                .target_exists(resource, translation_group_id, target_locale)
                .await
        }

        async fn write_target(&self, write: TargetWrite) -> Result<TargetField, CoreError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.0.write_target(write).await
        }

        async fn list_sources(&self, filter: &SourceFilter) -> Result<Vec<SourceField>, CoreError> {
            self.0.list_sources(filter).await
        }
    }

    #[tokio::test]
    async fn concurrent_applies_on_the_same_row_version_let_one_win() {
        let inner = content().await;
        let store = SlowWrites(inner.clone());
        let a = ExchangeRow {
            translated_text: "Hola A".into(),
            metadata: Some(json!({ "row_version": 0 })),
            ..row()
        };
        let b = ExchangeRow {
            translated_text: "Hola B".into(),
            ..a.clone()
        };

        let (opts_a, opts_b) = (opts(), opts());
        let (first, second) = tokio::join!(
            process_row(&store, 0, &a, &opts_a, Mode::Apply),
            process_row(&store, 0, &b, &opts_b, Mode::Apply),
        );
        let mut results = vec![first.unwrap(), second.unwrap()];
        results.sort_by_key(|r| r.status != RowStatus::Success);
        assert_eq!(results[0].status, RowStatus::Success);
        assert_eq!(results[1].status, RowStatus::Conflict);
        assert_eq!(
            results[1].conflict.as_ref().map(|c| c.conflict_type),
            Some(ConflictType::RowVersionConflict)
        );

        let stored = inner
            .target_field("pages", "tg_1", "es", "title")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.row_version, 1);
    }

    #[tokio::test]
    async fn dry_run_and_validate_never_write() {
        let content = content().await;
        let options = ExchangeOptions {
            dry_run: true,
            ..opts()
        };
        process_row(&content, 0, &row(), &options, Mode::Apply)
            .await
            .unwrap();
        process_row(&content, 0, &row(), &opts(), Mode::Validate)
            .await
            .unwrap();
        assert!(content
            .target_field("pages", "tg_1", "es", "title")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn create_missing_creates_the_target_record() {
        let content = content().await;
        let input = ExchangeRow {
            target_locale: "FR".into(),
            ..row()
        };
        let options = ExchangeOptions {
            allow_create_missing: true,
            ..opts()
        };
        let result = process_row(&content, 0, &input, &options, Mode::Apply)
            .await
            .unwrap();
        assert_eq!(result.status, RowStatus::Success);
        assert_eq!(result.target_locale, "fr");
        assert!(content.target_exists("pages", "tg_1", "fr").await.unwrap());
    }
}
