//! Source-target drift metadata.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub const REQUIRED_FIELDS: [&str; 3] = ["source_hash", "source_version", "changed_fields_summary"];
pub const SUMMARY_FIELDS: [&str; 2] = ["count", "fields"];

/// Attached to any per-field payload whose source changed since it was last
/// translated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTargetDrift {
    pub source_hash: String,
    pub source_version: u64,
    pub changed_fields_summary: ChangedFieldsSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFieldsSummary {
    pub count: usize,
    pub fields: Vec<String>,
}

impl ChangedFieldsSummary {
    /// Deduplicates case-insensitively (first spelling wins) and sorts.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen: BTreeMap<String, String> = BTreeMap::new();
        for field in fields {
            let field = field.as_ref().trim();
            if field.is_empty() {
                continue;
            }
            seen.entry(field.to_lowercase())
                .or_insert_with(|| field.to_string());
        }
        let fields: Vec<String> = seen.into_values().collect();
        Self {
            count: fields.len(),
            fields,
        }
    }
}

impl SourceTargetDrift {
    pub fn new<I, S>(source_hash: impl Into<String>, source_version: u64, changed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            source_hash: source_hash.into(),
            source_version,
            changed_fields_summary: ChangedFieldsSummary::new(changed),
        }
    }
}

/// `hex(sha256(text))`
pub fn source_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
