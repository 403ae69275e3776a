//! Report types produced by the analyzers. All are serialized as JSON.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::analyzers::grade::RatioBand;

/// Shape of the canonical table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetOverview {
    pub rows: usize,
    pub columns: usize,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
    pub missing_cells: usize,
    pub duplicate_rows: usize,
}

/// Descriptive statistics for one metric column. Missing cells are skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricStats {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub median: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
    pub variance: Option<f64>,
    pub range: Option<f64>,
    pub cv_percent: Option<f64>,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Percentiles {
    pub column: String,
    /// Keyed by percentile, e.g. `5` or `99`.
    pub values: BTreeMap<u8, Option<f64>>,
}

/// Sign breakdown of the energy balance column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceAnalysis {
    pub count: usize,
    pub positive: usize,
    pub negative: usize,
    pub zero: usize,
    pub positive_pct: f64,
    pub negative_pct: f64,
    pub zero_pct: f64,
    pub mean: Option<f64>,
    pub mean_positive: Option<f64>,
    pub mean_negative: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub key: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub median: Option<f64>,
}

/// One metric summarized per value of a grouping column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedStats {
    pub group_by: String,
    pub metric: String,
    pub groups: Vec<GroupStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearChange {
    pub metric: String,
    pub from_mean: Option<f64>,
    pub to_mean: Option<f64>,
    pub difference: Option<f64>,
    pub variation_pct: Option<f64>,
}

/// Mean comparison between the first and last year present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearOverYear {
    pub from_year: i64,
    pub to_year: i64,
    pub metrics: Vec<YearChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandCount {
    pub band: RatioBand,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedCorrelation {
    pub column: String,
    pub coefficient: Option<f64>,
}

/// Pearson correlations over pairwise complete observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationReport {
    pub columns: Vec<String>,
    /// Row-major, aligned with `columns`.
    pub matrix: Vec<Vec<Option<f64>>>,
    pub with_production: Vec<NamedCorrelation>,
    pub with_consumption: Vec<NamedCorrelation>,
}

/// Complete descriptive-statistics report for a canonical table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescribeReport {
    pub overview: DatasetOverview,
    pub metrics: Vec<MetricStats>,
    pub percentiles: Vec<Percentiles>,
    pub balance: Option<BalanceAnalysis>,
    pub grouped: Vec<GroupedStats>,
    pub year_over_year: Option<YearOverYear>,
    pub ratio_bands: Vec<BandCount>,
    pub correlations: CorrelationReport,
}

/// One point of an aggregated series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Set for daily series, whose `key` is a day of that year.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    pub key: i64,
    pub values: BTreeMap<String, Option<f64>>,
}

/// Filtered, grouped metric series with per-metric totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub granularity: String,
    pub year: Option<i64>,
    pub month: Option<i64>,
    pub hour: Option<i64>,
    pub rows_matched: usize,
    pub metrics: Vec<String>,
    pub series: Vec<SeriesPoint>,
    pub totals: BTreeMap<String, f64>,
    pub means: BTreeMap<String, Option<f64>>,
}
