//! Descriptive statistics over the canonical table.

use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::info;

use crate::analyzers::grade::{RatioBand, grade};
use crate::analyzers::types::{
    BalanceAnalysis, BandCount, CorrelationReport, DatasetOverview, DescribeReport, GroupStats,
    GroupedStats, MetricStats, NamedCorrelation, Percentiles, YearChange, YearOverYear,
};
use crate::analyzers::utility::{
    kurtosis, mean, median, pearson, percent, quantile, skewness, sorted, stddev, variance,
};
use crate::analyzers::{numeric_column, present_values};
use crate::config::{
    BALANCE_COLUMN, CONSUMPTION_COLUMN, DATE_COLUMN, ENERGY_SOURCES, HOUR_COLUMN, MONTH_COLUMN,
    PRODUCTION_COLUMN, RATIO_COLUMN, STORAGE_COLUMN, WEEKDAY_COLUMN, YEAR_COLUMN,
};
use crate::features::calendar::parse_timestamp;
use crate::table::{Cell, Table, Value};

const PERCENTILES: [u8; 8] = [5, 10, 25, 50, 75, 90, 95, 99];

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Production, consumption and balance: the columns summarized per group and per year.
const KEY_METRICS: [&str; 3] = [PRODUCTION_COLUMN, CONSUMPTION_COLUMN, BALANCE_COLUMN];

fn described_columns() -> Vec<&'static str> {
    let mut cols: Vec<&str> = ENERGY_SOURCES.to_vec();
    cols.extend([
        PRODUCTION_COLUMN,
        CONSUMPTION_COLUMN,
        BALANCE_COLUMN,
        STORAGE_COLUMN,
        RATIO_COLUMN,
    ]);
    cols
}

fn compared_columns() -> Vec<&'static str> {
    let mut cols: Vec<&str> = ENERGY_SOURCES.to_vec();
    cols.extend(KEY_METRICS);
    cols
}

/// Builds the full descriptive report. Absent columns are skipped.
#[tracing::instrument(level = "info", skip(table), fields(rows = table.n_rows()))]
pub fn describe(table: &Table) -> DescribeReport {
    let report = DescribeReport {
        overview: overview(table),
        metrics: described_columns()
            .into_iter()
            .filter_map(|c| Some(metric_stats(c, &present_values(&numeric_column(table, c)?))))
            .collect(),
        percentiles: compared_columns()
            .into_iter()
            .filter_map(|c| Some(percentiles(c, &present_values(&numeric_column(table, c)?))))
            .collect(),
        balance: numeric_column(table, BALANCE_COLUMN).map(|c| balance(&c)),
        grouped: grouped_stats(table),
        year_over_year: year_over_year(table),
        ratio_bands: numeric_column(table, RATIO_COLUMN)
            .map(|c| ratio_bands(&c))
            .unwrap_or_default(),
        correlations: correlations(table),
    };

    info!(
        metrics = report.metrics.len(),
        groups = report.grouped.len(),
        "Descriptive report built"
    );
    report
}

fn cell_timestamp(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Some(Value::Timestamp(t)) => Some(*t),
        Some(Value::Text(s)) => parse_timestamp(s),
        _ => None,
    }
}

fn overview(table: &Table) -> DatasetOverview {
    let timestamps: Vec<NaiveDateTime> = table
        .column_index(DATE_COLUMN)
        .map(|idx| table.column_cells(idx).filter_map(cell_timestamp).collect())
        .unwrap_or_default();
    let format = |t: &NaiveDateTime| Value::Timestamp(*t).to_string();

    let mut seen: HashSet<&[Cell]> = HashSet::new();
    let duplicate_rows = table
        .rows()
        .iter()
        .filter(|row| !seen.insert(row.as_slice()))
        .count();

    DatasetOverview {
        rows: table.n_rows(),
        columns: table.n_cols(),
        first_timestamp: timestamps.iter().min().map(format),
        last_timestamp: timestamps.iter().max().map(format),
        missing_cells: (0..table.n_cols()).map(|i| table.missing_in(i)).sum(),
        duplicate_rows,
    }
}

pub fn metric_stats(column: &str, values: &[f64]) -> MetricStats {
    let s = sorted(values);
    let m = mean(&s);
    let sd = stddev(&s);
    let cv_percent = match (m, sd) {
        (Some(m), Some(sd)) if m != 0.0 => Some((sd / m * 100.0).abs()),
        _ => None,
    };

    MetricStats {
        column: column.to_string(),
        count: s.len(),
        mean: m,
        std: sd,
        min: s.first().copied(),
        p25: quantile(&s, 0.25),
        median: quantile(&s, 0.5),
        p75: quantile(&s, 0.75),
        max: s.last().copied(),
        variance: variance(&s),
        range: s.first().zip(s.last()).map(|(lo, hi)| hi - lo),
        cv_percent,
        skewness: skewness(&s),
        kurtosis: kurtosis(&s),
    }
}

fn percentiles(column: &str, values: &[f64]) -> Percentiles {
    let s = sorted(values);
    Percentiles {
        column: column.to_string(),
        values: PERCENTILES
            .iter()
            .map(|&p| (p, quantile(&s, p as f64 / 100.0)))
            .collect(),
    }
}

/// Sign breakdown of the balance; shares are relative to all rows.
fn balance(column: &[Option<f64>]) -> BalanceAnalysis {
    let values = present_values(column);
    let positive: Vec<f64> = values.iter().copied().filter(|v| *v > 0.0).collect();
    let negative: Vec<f64> = values.iter().copied().filter(|v| *v < 0.0).collect();
    let zero = values.iter().filter(|v| **v == 0.0).count();
    let total = column.len() as f64;

    BalanceAnalysis {
        count: values.len(),
        positive: positive.len(),
        negative: negative.len(),
        zero,
        positive_pct: percent(positive.len() as f64, total),
        negative_pct: percent(negative.len() as f64, total),
        zero_pct: percent(zero as f64, total),
        mean: mean(&values),
        mean_positive: mean(&positive),
        mean_negative: mean(&negative),
    }
}

/// Sort position and label of a grouping cell.
fn group_key(group_by: &str, cell: &Cell) -> Option<(i64, String)> {
    let value = cell.as_ref()?;
    if group_by == WEEKDAY_COLUMN {
        let name = value.as_str()?.trim().to_lowercase();
        let pos = WEEKDAYS.iter().position(|d| *d == name)?;
        return Some((pos as i64, name));
    }
    let n = value.as_number()?.trunc() as i64;
    Some((n, n.to_string()))
}

pub fn group_stats(table: &Table, group_by: &str, metric: &str) -> Option<GroupedStats> {
    let idx = table.column_index(group_by)?;
    let values = numeric_column(table, metric)?;

    let mut groups: BTreeMap<(i64, String), Vec<f64>> = BTreeMap::new();
    for (cell, value) in table.column_cells(idx).zip(&values) {
        let Some(key) = group_key(group_by, cell) else {
            continue;
        };
        let bucket = groups.entry(key).or_default();
        if let Some(v) = value {
            bucket.push(*v);
        }
    }

    Some(GroupedStats {
        group_by: group_by.to_string(),
        metric: metric.to_string(),
        groups: groups
            .into_iter()
            .map(|((_, key), vals)| {
                let s = sorted(&vals);
                GroupStats {
                    key,
                    count: s.len(),
                    mean: mean(&s),
                    std: stddev(&s),
                    min: s.first().copied(),
                    max: s.last().copied(),
                    median: median(&s),
                }
            })
            .collect(),
    })
}

fn grouped_stats(table: &Table) -> Vec<GroupedStats> {
    [YEAR_COLUMN, MONTH_COLUMN, HOUR_COLUMN, WEEKDAY_COLUMN]
        .into_iter()
        .flat_map(|g| KEY_METRICS.into_iter().map(move |m| (g, m)))
        .filter_map(|(g, m)| group_stats(table, g, m))
        .collect()
}

/// Compares means of the first and last year in the table.
pub fn year_over_year(table: &Table) -> Option<YearOverYear> {
    let years: Vec<Option<i64>> = numeric_column(table, YEAR_COLUMN)?
        .into_iter()
        .map(|y| y.map(|y| y.trunc() as i64))
        .collect();
    let distinct: BTreeSet<i64> = years.iter().flatten().copied().collect();
    let (&from_year, &to_year) = (distinct.first()?, distinct.last()?);
    if from_year == to_year {
        return None;
    }

    let year_mean = |column: &[Option<f64>], year: i64| {
        let vals: Vec<f64> = column
            .iter()
            .zip(&years)
            .filter(|(_, y)| **y == Some(year))
            .filter_map(|(v, _)| *v)
            .collect();
        mean(&vals)
    };

    let metrics = compared_columns()
        .into_iter()
        .filter_map(|c| {
            let column = numeric_column(table, c)?;
            let from_mean = year_mean(&column, from_year);
            let to_mean = year_mean(&column, to_year);
            let difference = from_mean.zip(to_mean).map(|(a, b)| b - a);
            let variation_pct = match (difference, from_mean) {
                (Some(d), Some(a)) if a != 0.0 => Some(d / a * 100.0),
                _ => None,
            };
            Some(YearChange {
                metric: c.to_string(),
                from_mean,
                to_mean,
                difference,
                variation_pct,
            })
        })
        .collect();

    Some(YearOverYear {
        from_year,
        to_year,
        metrics,
    })
}

/// Counts of ratio values per band; shares are relative to all rows.
pub fn ratio_bands(column: &[Option<f64>]) -> Vec<BandCount> {
    let mut counts: BTreeMap<RatioBand, usize> = BTreeMap::new();
    for r in column.iter().flatten() {
        *counts.entry(grade(*r)).or_default() += 1;
    }
    RatioBand::ALL
        .into_iter()
        .map(|band| {
            let count = counts.get(&band).copied().unwrap_or(0);
            BandCount {
                band,
                count,
                percentage: percent(count as f64, column.len() as f64),
            }
        })
        .collect()
}

fn correlations(table: &Table) -> CorrelationReport {
    let sources: Vec<(&str, Vec<Option<f64>>)> = ENERGY_SOURCES
        .iter()
        .filter_map(|&c| Some((c, numeric_column(table, c)?)))
        .collect();

    let matrix: Vec<Vec<Option<f64>>> = sources
        .iter()
        .map(|(_, x)| sources.iter().map(|(_, y)| pearson(x, y)).collect())
        .collect();

    let against = |target: &str| -> Vec<NamedCorrelation> {
        let target_values = numeric_column(table, target);
        let mut out: Vec<NamedCorrelation> = sources
            .iter()
            .map(|(name, x)| NamedCorrelation {
                column: name.to_string(),
                coefficient: target_values.as_ref().and_then(|y| pearson(x, y)),
            })
            .collect();
        // strongest first, undefined last
        out.sort_by(|a, b| match (a.coefficient, b.coefficient) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        out
    };

    CorrelationReport {
        columns: sources.iter().map(|(c, _)| c.to_string()).collect(),
        matrix,
        with_production: against(PRODUCTION_COLUMN),
        with_consumption: against(CONSUMPTION_COLUMN),
    }
}
