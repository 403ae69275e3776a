//! Feature derivation over a resolved table.
//!
//! Every function here is total: bad cells degrade to missing values and are
//! counted, never raised. Each stage takes the table by value and hands back
//! the transformed one.

pub mod calendar;
pub mod numeric;
pub mod ratio;

pub use calendar::{CalendarParts, decompose_timestamp, parse_timestamp, weekday_name};
pub use numeric::{coerce_numeric, normalize_category, parse_number};
pub use ratio::{derive_ratio, ratio};

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::{
    CONSUMPTION_COLUMN, DATE_COLUMN, METRIC_COLUMNS, PRODUCTION_COLUMN, RATIO_COLUMN,
    WEEKDAY_COLUMN,
};
use crate::table::Table;

/// Per-cell failures absorbed while deriving features.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureReport {
    /// Present date cells that did not parse as a timestamp.
    pub unparseable_timestamps: usize,
    /// Present metric cells that did not parse as a number, per column.
    pub unparseable_numbers: BTreeMap<String, usize>,
    /// Rows whose ratio is missing.
    pub undefined_ratios: usize,
}

fn present(table: &Table, column: &str) -> usize {
    table
        .column_index(column)
        .map(|idx| table.n_rows() - table.missing_in(idx))
        .unwrap_or(0)
}

/// The canonical transform: decompose `date`, coerce the metric columns,
/// normalize `zi_saptamana` and derive `raport_pret_calitate`.
pub fn derive_features(table: Table) -> (Table, FeatureReport) {
    derive_features_from(table, DATE_COLUMN)
}

/// [`derive_features`] with the calendar fields taken from `date_column`.
#[tracing::instrument(level = "info", skip(table), fields(rows = table.n_rows()))]
pub fn derive_features_from(table: Table, date_column: &str) -> (Table, FeatureReport) {
    let mut report = FeatureReport::default();

    let dates_before = present(&table, date_column);
    let table = decompose_timestamp(table, date_column);
    report.unparseable_timestamps = dates_before - present(&table, date_column);

    let numbers_before: Vec<(&str, usize)> = METRIC_COLUMNS
        .iter()
        .map(|&c| (c, present(&table, c)))
        .collect();
    let table = coerce_numeric(table, &METRIC_COLUMNS);
    for (column, before) in numbers_before {
        let lost = before - present(&table, column);
        if lost > 0 {
            report.unparseable_numbers.insert(column.to_string(), lost);
        }
    }

    let table = normalize_category(table, WEEKDAY_COLUMN);
    let table = derive_ratio(table, PRODUCTION_COLUMN, CONSUMPTION_COLUMN, RATIO_COLUMN);
    report.undefined_ratios = table.n_rows() - present(&table, RATIO_COLUMN);

    if report.unparseable_timestamps > 0 {
        warn!(
            count = report.unparseable_timestamps,
            "Unparseable timestamps set to missing"
        );
    }
    for (column, count) in &report.unparseable_numbers {
        warn!(column = %column, count, "Non-numeric values set to missing");
    }
    info!(
        rows = table.n_rows(),
        columns = table.n_cols(),
        undefined_ratios = report.undefined_ratios,
        "Features derived"
    );
    (table, report)
}
