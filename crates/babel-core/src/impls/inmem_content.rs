//! InMemoryContentStore - エクスチェンジ用のコンテンツ（テスト・シード用）

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::contracts::source_hash;
use crate::domain::CoreError;
use crate::ports::{ContentStore, SourceField, SourceFilter, TargetField, TargetWrite};

type SourceKey = (String, String, String);
type TargetKey = (String, String, String);

#[derive(Default)]
struct State {
    /// (resource, entity_id, field_path)
    sources: BTreeMap<SourceKey, SourceField>,
    /// (resource, translation_group_id, target_locale) -> record
    targets: BTreeMap<TargetKey, TargetRecord>,
}

struct TargetRecord {
    record_id: String,
    fields: BTreeMap<String, (String, u64)>,
}

#[derive(Clone, Default)]
pub struct InMemoryContentStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or revises a source field. Revising bumps the version and
    /// records the field as changed.
    pub async fn put_source(
        &self,
        resource: &str,
        entity_id: &str,
        translation_group_id: &str,
        source_locale: &str,
        field_path: &str,
        text: &str,
    ) -> SourceField {
        let mut state = self.state.lock().await;
        let key = (resource.to_string(), entity_id.to_string(), field_path.to_string());
        let version = state.sources.get(&key).map_or(1, |s| s.version + 1);
        let changed_fields = if version > 1 {
            vec![field_path.to_string()]
        } else {
            Vec::new()
        };
        let field = SourceField {
            resource: resource.to_string(),
            entity_id: entity_id.to_string(),
            translation_group_id: translation_group_id.to_string(),
            source_locale: source_locale.trim().to_lowercase(),
            field_path: field_path.to_string(),
            text: text.to_string(),
            hash: source_hash(text),
            version,
            changed_fields,
        };
        state.sources.insert(key, field.clone());
        field
    }

    /// Creates an empty target record for the locale.
    pub async fn put_target_record(
        &self,
        resource: &str,
        translation_group_id: &str,
        target_locale: &str,
        record_id: &str,
    ) {
        let mut state = self.state.lock().await;
        state
            .targets
            .entry(target_key(resource, translation_group_id, target_locale))
            .or_insert_with(|| TargetRecord {
                record_id: record_id.to_string(),
                fields: BTreeMap::new(),
            });
    }
}

fn target_key(resource: &str, translation_group_id: &str, target_locale: &str) -> TargetKey {
    (
        resource.to_string(),
        translation_group_id.to_string(),
        target_locale.trim().to_lowercase(),
    )
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn source_field(
        &self,
        resource: &str,
        entity_id: &str,
        field_path: &str,
    ) -> Result<Option<SourceField>, CoreError> {
        let state = self.state.lock().await;
        let key = (resource.to_string(), entity_id.to_string(), field_path.to_string());
        Ok(state.sources.get(&key).cloned())
    }

    async fn target_field(
        &self,
        resource: &str,
        translation_group_id: &str,
        target_locale: &str,
        field_path: &str,
    ) -> Result<Option<TargetField>, CoreError> {
        let state = self.state.lock().await;
        let key = target_key(resource, translation_group_id, target_locale);
        Ok(state.targets.get(&key).and_then(|record| {
            record
                .fields
                .get(field_path)
                .map(|(text, row_version)| TargetField {
                    record_id: record.record_id.clone(),
                    text: text.clone(),
                    row_version: *row_version,
                })
        }))
    }

    async fn target_exists(
        &self,
        resource: &str,
        translation_group_id: &str,
        target_locale: &str,
    ) -> Result<bool, CoreError> {
        let state = self.state.lock().await;
        Ok(state
            .targets
            .contains_key(&target_key(resource, translation_group_id, target_locale)))
    }

    async fn write_target(&self, write: TargetWrite) -> Result<TargetField, CoreError> {
        let mut state = self.state.lock().await;
        let key = target_key(&write.resource, &write.translation_group_id, &write.target_locale);
        if !state.targets.contains_key(&key) {
            if !write.create_missing {
                return Err(CoreError::RowError {
                    index: 0,
                    text_code: "translation_exchange.missing_target".into(),
                    message: format!(
                        "no {} record for group {} in locale {}",
                        write.resource, write.translation_group_id, write.target_locale
                    ),
                });
            }
            let record_id = format!("{}:{}", write.translation_group_id, key.2);
            debug!(record_id = %record_id, "creating missing target record");
            state.targets.insert(
                key.clone(),
                TargetRecord {
                    record_id,
                    fields: BTreeMap::new(),
                },
            );
        }
        let Some(record) = state.targets.get_mut(&key) else {
            return Err(CoreError::Internal("target record vanished".into()));
        };
        let actual = record.fields.get(&write.field_path).map_or(0, |(_, v)| *v);
        if let Some(expected) = write.expected_row_version {
            if expected != actual {
                return Err(CoreError::VersionConflict { expected, actual });
            }
        }
        let entry = record
            .fields
            .entry(write.field_path)
            .or_insert_with(|| (String::new(), 0));
        entry.0 = write.text;
        entry.1 += 1;
        Ok(TargetField {
            record_id: record.record_id.clone(),
            text: entry.0.clone(),
            row_version: entry.1,
        })
    }

    async fn list_sources(&self, filter: &SourceFilter) -> Result<Vec<SourceField>, CoreError> {
        let state = self.state.lock().await;
        Ok(state
            .sources
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }
}
