use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::analyzers::types::{AggregateReport, SeriesPoint};
use crate::analyzers::utility::mean;
use crate::analyzers::{numeric_column, present_values};
use crate::config::{DATE_COLUMN, HOUR_COLUMN, MONTH_COLUMN, YEAR_COLUMN};
use crate::error::{PipelineError, Result};
use crate::features::calendar::parse_timestamp;
use crate::table::{Table, Value};

/// Grouping used for dashboard series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", rename_all = "lowercase")]
pub enum Granularity {
    /// Mean per hour of day.
    #[default]
    Hourly,
    /// Sum per day of year, kept apart per year.
    Daily,
    /// Sum per month.
    Monthly,
}

impl FromStr for Granularity {
    type Err = PipelineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" | "orar" => Ok(Granularity::Hourly),
            "daily" | "zilnic" => Ok(Granularity::Daily),
            "monthly" | "lunar" => Ok(Granularity::Monthly),
            _ => Err(PipelineError::UnknownGranularity(s.to_string())),
        }
    }
}

impl TryFrom<String> for Granularity {
    type Error = PipelineError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
        })
    }
}

/// Row filters, metric selection and grouping for [`aggregate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateQuery {
    pub year: Option<i64>,
    pub month: Option<i64>,
    pub hour: Option<i64>,
    pub metrics: Vec<String>,
    pub granularity: Granularity,
}

fn int_cell(table: &Table, row: usize, column: &str) -> Option<i64> {
    table
        .get(row, column)
        .and_then(Value::as_number)
        .map(|n| n.trunc() as i64)
}

/// Year and day of year of the row's timestamp.
fn day_of_year(table: &Table, row: usize) -> Option<(Option<i64>, i64)> {
    let ts = match table.get(row, DATE_COLUMN)? {
        Value::Timestamp(t) => *t,
        Value::Text(s) => parse_timestamp(s)?,
        _ => return None,
    };
    Some((Some(ts.year() as i64), ts.ordinal() as i64))
}

/// Group key of a row. Days are split by year; hours and months are not.
fn group_of(table: &Table, row: usize, granularity: Granularity) -> Option<(Option<i64>, i64)> {
    match granularity {
        Granularity::Hourly => int_cell(table, row, HOUR_COLUMN).map(|h| (None, h)),
        Granularity::Daily => day_of_year(table, row),
        Granularity::Monthly => int_cell(table, row, MONTH_COLUMN).map(|m| (None, m)),
    }
}

/// Filters the canonical table and groups the selected metrics.
///
/// Rows whose group key is missing are left out of the series but still
/// count toward totals and means.
///
/// # Errors
///
/// [`PipelineError::UnknownColumn`] if a requested metric is not in the table.
#[tracing::instrument(level = "info", skip(table, query), fields(granularity = %query.granularity))]
pub fn aggregate(table: &Table, query: &AggregateQuery) -> Result<AggregateReport> {
    let columns: Vec<Vec<Option<f64>>> = query
        .metrics
        .iter()
        .map(|m| numeric_column(table, m).ok_or_else(|| PipelineError::UnknownColumn(m.clone())))
        .collect::<Result<_>>()?;

    let passes = |filter: Option<i64>, row: usize, column: &str| {
        filter.is_none_or(|want| int_cell(table, row, column) == Some(want))
    };
    let rows: Vec<usize> = (0..table.n_rows())
        .filter(|&r| {
            passes(query.year, r, YEAR_COLUMN)
                && passes(query.month, r, MONTH_COLUMN)
                && passes(query.hour, r, HOUR_COLUMN)
        })
        .collect();
    debug!(rows_matched = rows.len(), "Rows filtered");

    let mut groups: BTreeMap<(Option<i64>, i64), Vec<usize>> = BTreeMap::new();
    for &r in &rows {
        if let Some(key) = group_of(table, r, query.granularity) {
            groups.entry(key).or_default().push(r);
        }
    }

    let series = groups
        .into_iter()
        .map(|((year, key), members)| {
            let values = query
                .metrics
                .iter()
                .zip(&columns)
                .map(|(name, column)| {
                    let vals: Vec<f64> = members.iter().filter_map(|&r| column[r]).collect();
                    let v = match query.granularity {
                        Granularity::Hourly => mean(&vals),
                        Granularity::Daily | Granularity::Monthly => Some(vals.iter().sum()),
                    };
                    (name.clone(), v)
                })
                .collect();
            SeriesPoint { year, key, values }
        })
        .collect::<Vec<_>>();

    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    let mut means: BTreeMap<String, Option<f64>> = BTreeMap::new();
    for (name, column) in query.metrics.iter().zip(&columns) {
        let selected: Vec<Option<f64>> = rows.iter().map(|&r| column[r]).collect();
        let vals = present_values(&selected);
        totals.insert(name.clone(), vals.iter().sum());
        means.insert(name.clone(), mean(&vals));
    }

    info!(
        rows_matched = rows.len(),
        points = series.len(),
        "Series aggregated"
    );
    Ok(AggregateReport {
        granularity: query.granularity.to_string(),
        year: query.year,
        month: query.month,
        hour: query.hour,
        rows_matched: rows.len(),
        metrics: query.metrics.clone(),
        series,
        totals,
        means,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hourly_is_mean_per_hour() {
        let report = aggregate(&sample_table(), &query(Granularity::Hourly)).unwrap();

        assert_eq!(report.series.len(), 2);
        assert_eq!(report.series[0].key, 0);
        assert_eq!(report.series[0].year, None);
        assert_eq!(report.series[0].values["eolian"], Some(15.0));
        assert_eq!(report.series[1].values["eolian"], Some(30.0));
    }

    #[test]
    fn test_daily_is_sum_per_day_of_year() {
        let report = aggregate(&sample_table(), &query(Granularity::Daily)).unwrap();
        let keys: Vec<i64> = report.series.iter().map(|p| p.key).collect();

        assert_eq!(keys, vec![1, 32]);
        assert_eq!(report.series[0].year, Some(2024));
        assert_eq!(report.series[0].values["eolian"], Some(40.0));
        assert_eq!(report.series[1].values["eolian"], Some(20.0));
    }

    #[test]
    fn test_daily_keeps_same_day_of_different_years_apart() {
        let mut table = sample_table();
        table.push_row(vec![
            Some(Value::text("2025-01-01 00:00:00")),
            Some(Value::Integer(2025)),
            Some(Value::Integer(1)),
            Some(Value::Integer(0)),
            Some(Value::Number(5.0)),
        ]);
        let report = aggregate(&table, &query(Granularity::Daily)).unwrap();
        let keys: Vec<(Option<i64>, i64)> =
            report.series.iter().map(|p| (p.year, p.key)).collect();

        assert_eq!(keys, vec![(Some(2024), 1), (Some(2024), 32), (Some(2025), 1)]);
        assert_eq!(report.series[0].values["eolian"], Some(40.0));
        assert_eq!(report.series[2].values["eolian"], Some(5.0));
    }

    #[test]
    fn test_filters_and_totals() {
        let q = AggregateQuery {
            year: Some(2024),
            month: Some(1),
            ..query(Granularity::Monthly)
        };
        let report = aggregate(&sample_table(), &q).unwrap();

        assert_eq!(report.rows_matched, 2);
        assert_eq!(report.series.len(), 1);
        assert_eq!(report.totals["eolian"], 40.0);
        assert_eq!(report.means["eolian"], Some(20.0));
    }

    #[test]
    fn test_unknown_metric_fails() {
        let q = AggregateQuery {
            metrics: vec!["solar".into()],
            ..AggregateQuery::default()
        };
        assert!(matches!(
            aggregate(&sample_table(), &q),
            Err(PipelineError::UnknownColumn(c)) if c == "solar"
        ));
    }

    #[test]
    fn test_granularity_from_str() {
        assert_eq!("Monthly".parse::<Granularity>().unwrap(), Granularity::Monthly);
        assert_eq!("zilnic".parse::<Granularity>().unwrap(), Granularity::Daily);
        assert!("weekly".parse::<Granularity>().is_err());
    }

    fn query(granularity: Granularity) -> AggregateQuery {
        AggregateQuery {
            metrics: vec!["eolian".into()],
            granularity,
            ..AggregateQuery::default()
        }
    }

    fn sample_table() -> Table {
        let row = |date: &str, an: i64, luna: i64, ora: i64, eolian: Option<f64>| {
            vec![
                Some(Value::text(date)),
                Some(Value::Integer(an)),
                Some(Value::Integer(luna)),
                Some(Value::Integer(ora)),
                eolian.map(Value::Number),
            ]
        };
        Table::from_rows(
            vec![
                "date".into(),
                "an".into(),
                "luna".into(),
                "ora".into(),
                "eolian".into(),
            ],
            vec![
                row("2024-01-01 00:00:00", 2024, 1, 0, Some(10.0)),
                row("2024-01-01 01:00:00", 2024, 1, 1, Some(30.0)),
                row("2024-02-01 00:00:00", 2024, 2, 0, Some(20.0)),
                row("2024-02-01 01:00:00", 2024, 2, 1, None),
            ],
        )
    }
}
