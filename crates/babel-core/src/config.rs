//! CoreConfig - 実行時設定
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::assignment::MAX_REJECTION_REASON_BYTES;
use crate::ports::MAX_PER_PAGE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: usize,
        max: usize,
        value: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub due_soon_window_hours: i64,
    pub my_work_default_per_page: usize,
    pub queue_default_per_page: usize,
    pub max_per_page: usize,
    /// Page size the summary pager walks the store with.
    pub summary_batch_size: usize,
    /// Rows between cancellation checks and job progress updates.
    pub exchange_batch_size: usize,
    pub exchange_poll_base: String,
    pub rejection_reason_max_bytes: usize,
    /// Rows included in the dashboard snapshot.
    pub dashboard_row_limit: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            due_soon_window_hours: 48,
            my_work_default_per_page: 25,
            queue_default_per_page: 50,
            max_per_page: MAX_PER_PAGE,
            summary_batch_size: 200,
            exchange_batch_size: 50,
            exchange_poll_base: "/admin/api/translations/jobs".to_string(),
            rejection_reason_max_bytes: MAX_REJECTION_REASON_BYTES,
            dashboard_row_limit: 10,
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check("max_per_page", self.max_per_page, 1, MAX_PER_PAGE)?;
        check(
            "my_work_default_per_page",
            self.my_work_default_per_page,
            1,
            self.max_per_page,
        )?;
        check(
            "queue_default_per_page",
            self.queue_default_per_page,
            1,
            self.max_per_page,
        )?;
        check("summary_batch_size", self.summary_batch_size, 1, MAX_PER_PAGE)?;
        check("exchange_batch_size", self.exchange_batch_size, 1, 10_000)?;
        check(
            "rejection_reason_max_bytes",
            self.rejection_reason_max_bytes,
            1,
            MAX_REJECTION_REASON_BYTES,
        )?;
        check("dashboard_row_limit", self.dashboard_row_limit, 0, MAX_PER_PAGE)?;
        check(
            "due_soon_window_hours",
            self.due_soon_window_hours.max(0) as usize,
            1,
            24 * 365,
        )?;
        Ok(())
    }

    pub fn due_soon_window(&self) -> Duration {
        Duration::hours(self.due_soon_window_hours)
    }

    /// Clamps a requested page size, falling back to `default` when absent.
    /// Never below 1, even for a config that skipped `validate`.
    pub fn per_page(&self, requested: Option<usize>, default: usize) -> usize {
        requested
            .unwrap_or(default)
            .min(self.max_per_page)
            .max(1)
    }
}

fn check(field: &'static str, value: usize, min: usize, max: usize) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            min,
            max,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = CoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.due_soon_window(), Duration::hours(48));
    }

    #[test]
    fn overrides_are_applied() {
        let config =
            CoreConfig::from_json_str(r#"{"queue_default_per_page": 20, "exchange_batch_size": 5}"#)
                .unwrap();
        assert_eq!(config.queue_default_per_page, 20);
        assert_eq!(config.exchange_batch_size, 5);
        assert_eq!(config.my_work_default_per_page, 25);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = CoreConfig::from_json_str(r#"{"max_per_page": 500}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                field: "max_per_page",
                ..
            }
        ));
        assert!(CoreConfig::from_json_str(r#"{"summary_batch_size": 0}"#).is_err());
        assert!(CoreConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn per_page_is_clamped_to_bounds() {
        let config = CoreConfig::default();
        assert_eq!(config.per_page(None, 25), 25);
        assert_eq!(config.per_page(Some(0), 25), 1);
        assert_eq!(config.per_page(Some(1000), 25), 200);
    }

    #[test]
    fn unvalidated_zero_max_still_yields_one_row_pages() {
        let config = CoreConfig {
            max_per_page: 0,
            ..CoreConfig::default()
        };
        assert_eq!(config.per_page(None, 25), 1);
        assert_eq!(config.per_page(Some(7), 25), 1);
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = CoreConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
