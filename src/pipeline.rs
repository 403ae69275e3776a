//! End-to-end cleaning run: load, resolve quality, derive features, persist.

use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::features::{FeatureReport, coerce_numeric, derive_features_from};
use crate::output::write_table;
use crate::parser;
use crate::quality::{
    DuplicateReport, ImputeReport, MissingSummary, bad_row_indices, classify_columns, impute,
    report_missing, resolve_duplicates,
};
use crate::table::Table;

/// Everything the quality stage found and changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub missing: MissingSummary,
    pub bad_rows: usize,
    pub bad_rows_dropped: usize,
    pub imputation: ImputeReport,
    pub duplicates: DuplicateReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub input: String,
    pub output: String,
    pub rows_loaded: usize,
    pub rows_written: usize,
    pub columns_written: usize,
    pub quality: QualityReport,
    pub features: FeatureReport,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Table> {
        Ok(parser::load(path, &self.config.load_options()?)?)
    }

    /// Reports missingness, flags sparse rows, imputes and removes duplicates.
    ///
    /// Columns whose every value is numeric are converted to numbers before
    /// duplicates are compared, so `6500` and `6500.0` are the same value.
    ///
    /// The threshold is validated before any work is done. On error `table`
    /// is untouched and no partial result escapes.
    #[tracing::instrument(level = "info", skip(self, table), fields(rows = table.n_rows()))]
    pub fn resolve_quality(&self, table: &Table) -> Result<(Table, QualityReport)> {
        let missing = report_missing(table);

        let bad = bad_row_indices(table, self.config.bad_row_threshold)?;
        if !bad.is_empty() {
            warn!(
                count = bad.len(),
                threshold_pct = self.config.bad_row_threshold,
                drop = self.config.drop_bad_rows,
                "Rows above missing-value threshold"
            );
        }
        let (kept, sparse_dropped) = if self.config.drop_bad_rows && !bad.is_empty() {
            (
                table.filter_rows(|i, _| bad.binary_search(&i).is_err()),
                bad.len(),
            )
        } else {
            (table.clone(), 0)
        };

        let (imputed, imputation) =
            impute(&kept, self.config.strategy, &self.config.impute_columns());
        let numeric: Vec<String> = classify_columns(&imputed)
            .numeric()
            .map(str::to_string)
            .collect();
        debug!(columns = ?numeric, "Numeric columns coerced before duplicate check");
        let imputed = coerce_numeric(imputed, &numeric);

        let (resolved, duplicates) =
            resolve_duplicates(&imputed, &self.config.duplicate_key(), self.config.keep)?;

        Ok((
            resolved,
            QualityReport {
                missing,
                bad_rows: bad.len(),
                bad_rows_dropped: sparse_dropped,
                imputation,
                duplicates,
            },
        ))
    }

    /// Loads `input`, cleans and transforms it, and writes the canonical table to `output`.
    #[tracing::instrument(level = "info", skip(self, input, output), fields(input = %input.as_ref().display()))]
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<PipelineReport> {
        let raw = self.load(&input)?;
        let (resolved, quality) = self.resolve_quality(&raw)?;
        let (canonical, features) = derive_features_from(resolved, &self.config.date_column);

        write_table(&output, &canonical, self.config.delimiter_byte()?)?;

        let report = PipelineReport {
            input: input.as_ref().display().to_string(),
            output: output.as_ref().display().to_string(),
            rows_loaded: raw.n_rows(),
            rows_written: canonical.n_rows(),
            columns_written: canonical.n_cols(),
            quality,
            features,
        };
        info!(
            rows_loaded = report.rows_loaded,
            rows_written = report.rows_written,
            output = %report.output,
            "Canonical table written"
        );
        Ok(report)
    }
}
