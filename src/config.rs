//! Pipeline configuration and the canonical column names.
//!
//! [`PipelineConfig`] is stored as a plain JSON object on disk; every field is
//! optional and falls back to its default:
//! ```json
//! {
//!   "encoding": "utf-8",
//!   "delimiter": ",",
//!   "strategy": "median",
//!   "keep": "first",
//!   "duplicate_key": ["date"],
//!   "bad_row_threshold": 50.0
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::parser::{Encoding, LoadOptions};
use crate::quality::{DuplicateKey, ImputeColumns, ImputeStrategy, KeepPolicy};

pub const DATE_COLUMN: &str = "date";

pub const YEAR_COLUMN: &str = "an";
pub const MONTH_COLUMN: &str = "luna";
pub const DAY_COLUMN: &str = "zi";
pub const HOUR_COLUMN: &str = "ora";
pub const MINUTE_COLUMN: &str = "minut";
pub const WEEKDAY_COLUMN: &str = "zi_saptamana";

pub const PRODUCTION_COLUMN: &str = "productie";
pub const CONSUMPTION_COLUMN: &str = "consum";
pub const BALANCE_COLUMN: &str = "sold";
pub const STORAGE_COLUMN: &str = "stocare";
pub const RATIO_COLUMN: &str = "raport_pret_calitate";

/// Per-source generation columns.
pub const ENERGY_SOURCES: [&str; 7] = [
    "carbune",
    "hidro",
    "hidrocarburi",
    "nuclear",
    "eolian",
    "fotovolt",
    "biomasa",
];

/// The eleven metric columns coerced to numbers by the feature stage.
pub const METRIC_COLUMNS: [&str; 11] = [
    "carbune",
    "consum",
    "hidro",
    "hidrocarburi",
    "nuclear",
    "eolian",
    "productie",
    "fotovolt",
    "biomasa",
    "stocare",
    "sold",
];

/// Columns appended to the raw schema by the feature stage.
pub const DERIVED_COLUMNS: [&str; 7] = [
    YEAR_COLUMN,
    MONTH_COLUMN,
    DAY_COLUMN,
    HOUR_COLUMN,
    MINUTE_COLUMN,
    WEEKDAY_COLUMN,
    RATIO_COLUMN,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub encoding: Encoding,
    pub delimiter: char,
    pub strategy: ImputeStrategy,
    pub keep: KeepPolicy,
    /// Columns forming the duplicate key; `None` compares whole rows.
    pub duplicate_key: Option<Vec<String>>,
    pub bad_row_threshold: f64,
    /// Remove rows above `bad_row_threshold` before imputation instead of only reporting them.
    pub drop_bad_rows: bool,
    pub date_column: String,
    pub numeric_columns: Option<Vec<String>>,
    pub categorical_columns: Option<Vec<String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::Utf8,
            delimiter: ',',
            strategy: ImputeStrategy::Median,
            keep: KeepPolicy::First,
            duplicate_key: None,
            bad_row_threshold: 50.0,
            drop_bad_rows: false,
            date_column: DATE_COLUMN.to_string(),
            numeric_columns: None,
            categorical_columns: None,
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| PipelineError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(PipelineError::InvalidDelimiter(self.delimiter))
        }
    }

    pub fn load_options(&self) -> Result<LoadOptions> {
        Ok(LoadOptions {
            encoding: self.encoding,
            delimiter: self.delimiter_byte()?,
        })
    }

    pub fn duplicate_key(&self) -> DuplicateKey {
        match &self.duplicate_key {
            Some(cols) if !cols.is_empty() => DuplicateKey::Columns(cols.clone()),
            _ => DuplicateKey::AllColumns,
        }
    }

    pub fn impute_columns(&self) -> ImputeColumns {
        ImputeColumns {
            numeric: self.numeric_columns.clone(),
            categorical: self.categorical_columns.clone(),
            date_column: Some(self.date_column.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "strategy": "ffill", "keep": "last" }"#).unwrap();

        assert_eq!(config.strategy, ImputeStrategy::ForwardFill);
        assert_eq!(config.keep, KeepPolicy::Last);
        assert_eq!(config.delimiter, ',');
        assert_eq!(config.bad_row_threshold, 50.0);
        assert_eq!(config.duplicate_key(), DuplicateKey::AllColumns);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let result = serde_json::from_str::<PipelineConfig>(r#"{ "strategy": "mean" }"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Unknown imputation strategy 'mean'"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(serde_json::from_str::<PipelineConfig>(r#"{ "stratgy": "drop" }"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        fs::write(
            &path,
            r#"{ "delimiter": ";", "encoding": "latin-1", "duplicate_key": ["date"] }"#,
        )
        .unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        let options = config.load_options().unwrap();

        assert_eq!(options.delimiter, b';');
        assert_eq!(options.encoding, Encoding::Latin1);
        assert_eq!(
            config.duplicate_key(),
            DuplicateKey::Columns(vec!["date".to_string()])
        );
    }

    #[test]
    fn test_non_ascii_delimiter() {
        let config = PipelineConfig {
            delimiter: 'ş',
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.delimiter_byte(),
            Err(PipelineError::InvalidDelimiter('ş'))
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let result = PipelineConfig::load("/no/such/pipeline.json");
        assert!(matches!(result, Err(PipelineError::ConfigIo { .. })));
    }
}
