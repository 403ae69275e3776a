//! Missing-value imputation.
//!
//! One of four strategies is applied per call. The input table is never
//! modified; the result comes back with an [`ImputeReport`] recording missing
//! counts before and after, rows dropped, and every column fill.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::analyzers::utility::{median, mode};
use crate::error::PipelineError;
use crate::features::calendar::parse_timestamp;
use crate::features::numeric::to_number;
use crate::quality::missing::missing_by_column;
use crate::quality::roles::{ColumnRole, resolve_roles};
use crate::table::{Cell, Table, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", rename_all = "lowercase")]
pub enum ImputeStrategy {
    /// Remove every row that has a missing cell.
    Drop,
    /// Fill from the nearest preceding value, then from the nearest following one.
    #[serde(rename = "ffill")]
    ForwardFill,
    /// Numeric columns take the median, categorical columns the mode.
    Median,
    /// Every column takes its mode.
    Mode,
}

impl FromStr for ImputeStrategy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(ImputeStrategy::Drop),
            "ffill" => Ok(ImputeStrategy::ForwardFill),
            "median" => Ok(ImputeStrategy::Median),
            "mode" => Ok(ImputeStrategy::Mode),
            _ => Err(PipelineError::UnknownStrategy(s.to_string())),
        }
    }
}

impl TryFrom<String> for ImputeStrategy {
    type Error = PipelineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImputeStrategy::Drop => "drop",
            ImputeStrategy::ForwardFill => "ffill",
            ImputeStrategy::Median => "median",
            ImputeStrategy::Mode => "mode",
        })
    }
}

/// Optional explicit column partition and sort column for imputation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImputeColumns {
    pub numeric: Option<Vec<String>>,
    pub categorical: Option<Vec<String>>,
    /// Rows are sorted by this column before a forward fill, when present.
    pub date_column: Option<String>,
}

/// One column's fill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnFill {
    pub column: String,
    pub role: Option<ColumnRole>,
    /// The constant used, or `None` for a forward fill.
    pub fill_value: Option<String>,
    pub before: usize,
    pub after: usize,
}

impl ColumnFill {
    pub fn filled(&self) -> usize {
        self.before - self.after
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImputeReport {
    pub strategy: ImputeStrategy,
    pub before_missing: BTreeMap<String, usize>,
    pub after_missing: BTreeMap<String, usize>,
    pub dropped_rows: usize,
    pub fills: Vec<ColumnFill>,
    /// Columns that still have missing cells because no fill value exists.
    pub unfilled: Vec<String>,
}

impl ImputeReport {
    pub fn filled_cells(&self) -> usize {
        self.fills.iter().map(ColumnFill::filled).sum()
    }

    pub fn remaining_missing(&self) -> usize {
        self.after_missing.values().sum()
    }
}

/// Fills or removes missing values under `strategy`.
#[tracing::instrument(level = "info", skip(table, strategy, columns), fields(rows = table.n_rows(), strategy = %strategy))]
pub fn impute(
    table: &Table,
    strategy: ImputeStrategy,
    columns: &ImputeColumns,
) -> (Table, ImputeReport) {
    let before_missing = missing_by_column(table);

    let (out, dropped_rows, fills, unfilled) = match strategy {
        ImputeStrategy::Drop => {
            let kept = table.filter_rows(|_, row| row.iter().all(Option::is_some));
            let dropped = table.n_rows() - kept.n_rows();
            info!(dropped_rows = dropped, "Rows with missing values dropped");
            (kept, dropped, Vec::new(), Vec::new())
        }
        ImputeStrategy::ForwardFill => {
            let (filled, fills, unfilled) = forward_fill(table, columns.date_column.as_deref());
            (filled, 0, fills, unfilled)
        }
        ImputeStrategy::Median | ImputeStrategy::Mode => {
            let (filled, fills, unfilled) = fill_with_statistic(table, strategy, columns);
            (filled, 0, fills, unfilled)
        }
    };

    let report = ImputeReport {
        strategy,
        after_missing: missing_by_column(&out),
        before_missing,
        dropped_rows,
        fills,
        unfilled,
    };
    info!(
        filled = report.filled_cells(),
        dropped_rows = report.dropped_rows,
        remaining_missing = report.remaining_missing(),
        "Imputation complete"
    );
    (out, report)
}

/// Sort key for the date column: parsed timestamps first, then unparseable
/// text, then missing cells.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Time(NaiveDateTime),
    Text(String),
    Missing,
}

fn sort_key(cell: &Cell) -> SortKey {
    match cell {
        Some(Value::Timestamp(t)) => SortKey::Time(*t),
        Some(Value::Text(s)) => parse_timestamp(s)
            .map(SortKey::Time)
            .unwrap_or_else(|| SortKey::Text(s.clone())),
        Some(other) => SortKey::Text(other.to_string()),
        None => SortKey::Missing,
    }
}

fn forward_fill(
    table: &Table,
    date_column: Option<&str>,
) -> (Table, Vec<ColumnFill>, Vec<String>) {
    let mut order: Vec<usize> = (0..table.n_rows()).collect();
    if let Some(idx) = date_column.and_then(|c| table.column_index(c)) {
        let keys: Vec<SortKey> = table.column_cells(idx).map(sort_key).collect();
        order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
    }
    let mut out = table.select_rows(&order);

    let mut fills = Vec::new();
    let mut unfilled = Vec::new();

    for (idx, name) in table.headers().iter().enumerate() {
        let before = out.missing_in(idx);
        if before == 0 {
            continue;
        }

        let mut last: Option<Value> = None;
        out.update_column(idx, |cell| match cell {
            Some(v) => {
                last = Some(v.clone());
                Some(v)
            }
            None => last.clone(),
        });

        // leading gap takes the first present value
        let first = out.column_cells(idx).find_map(|c| c.clone());
        match first {
            Some(v) => out.update_column(idx, |cell| cell.or_else(|| Some(v.clone()))),
            None => {
                warn!(column = %name, "Column has no values to fill from");
                unfilled.push(name.clone());
            }
        }

        let after = out.missing_in(idx);
        debug!(column = %name, before, after, "Forward/backward fill");
        fills.push(ColumnFill {
            column: name.clone(),
            role: None,
            fill_value: None,
            before,
            after,
        });
    }

    (out, fills, unfilled)
}

fn fill_with_statistic(
    table: &Table,
    strategy: ImputeStrategy,
    columns: &ImputeColumns,
) -> (Table, Vec<ColumnFill>, Vec<String>) {
    let roles = resolve_roles(
        table,
        columns.numeric.as_deref(),
        columns.categorical.as_deref(),
    );
    let mut out = table.clone();
    let mut fills = Vec::new();
    let mut unfilled = Vec::new();

    for (name, role) in roles.iter() {
        let Some(idx) = out.column_index(name) else {
            continue;
        };

        if role == ColumnRole::Numeric {
            out.update_column(idx, |cell| cell.and_then(to_number));
        }

        let before = out.missing_in(idx);
        if before == 0 {
            continue;
        }

        let fill = match (role, strategy) {
            (ColumnRole::Numeric, ImputeStrategy::Median) => {
                let values: Vec<f64> = out
                    .column_cells(idx)
                    .filter_map(|c| c.as_ref().and_then(Value::as_number))
                    .collect();
                median(&values).map(Value::Number)
            }
            _ => mode(out.column_cells(idx).flatten().cloned()),
        }
        .filter(|v| !matches!(v, Value::Number(n) if n.is_nan()));

        let Some(fill) = fill else {
            warn!(column = %name, ?role, "No usable fill value, column left unfilled");
            unfilled.push(name.to_string());
            continue;
        };

        out.update_column(idx, |cell| cell.or_else(|| Some(fill.clone())));
        let after = out.missing_in(idx);
        debug!(column = %name, ?role, fill = %fill, before, after, "Column filled");

        fills.push(ColumnFill {
            column: name.to_string(),
            role: Some(role),
            fill_value: Some(fill.to_string()),
            before,
            after,
        });
    }

    (out, fills, unfilled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    #[test]
    fn test_median_fills_numeric_gaps() {
        let table = numeric_column(&[Some(10.0), None, Some(20.0), None, Some(30.0)]);
        let (out, report) = impute(&table, ImputeStrategy::Median, &ImputeColumns::default());

        assert_eq!(values(&out), vec![10.0, 20.0, 20.0, 20.0, 30.0]);
        assert_eq!(report.before_missing["v"], 2);
        assert_eq!(report.after_missing["v"], 0);
        assert_eq!(report.fills[0].fill_value.as_deref(), Some("20"));
        assert_eq!(report.filled_cells(), 2);
    }

    #[test]
    fn test_ffill_backfills_leading_gap() {
        let table = numeric_column(&[None, Some(5.0), None, Some(7.0)]);
        let (out, report) =
            impute(&table, ImputeStrategy::ForwardFill, &ImputeColumns::default());

        assert_eq!(values(&out), vec![5.0, 5.0, 5.0, 7.0]);
        assert_eq!(report.remaining_missing(), 0);
        assert_eq!(report.fills[0].filled(), 2);
    }

    #[test]
    fn test_ffill_sorts_by_date_column_first() {
        let table = Table::from_rows(
            vec!["date".into(), "v".into()],
            vec![
                vec![Some(Value::text("2024-01-01 02:00:00")), None],
                vec![Some(Value::text("2024-01-01 00:00:00")), Some(Value::Number(1.0))],
                vec![None, Some(Value::Number(9.0))],
                vec![Some(Value::text("2024-01-01 01:00:00")), Some(Value::Number(3.0))],
            ],
        );
        let columns = ImputeColumns {
            date_column: Some("date".into()),
            ..ImputeColumns::default()
        };
        let (out, report) = impute(&table, ImputeStrategy::ForwardFill, &columns);

        // 00:00, 01:00, 02:00 (filled from 01:00), then the undated row
        assert_eq!(values(&out), vec![1.0, 3.0, 3.0, 9.0]);
        assert_eq!(out.get(2, "date"), Some(&Value::text("2024-01-01 02:00:00")));
        assert!(report.unfilled.is_empty());
    }

    #[test]
    fn test_ffill_all_missing_column_stays_missing() {
        let table = numeric_column(&[None, None]);
        let (out, report) =
            impute(&table, ImputeStrategy::ForwardFill, &ImputeColumns::default());

        assert_eq!(out.missing_in(0), 2);
        assert_eq!(report.unfilled, vec!["v".to_string()]);
    }

    #[test]
    fn test_mode_ties_resolve_to_smallest_value() {
        let table = numeric_column(&[Some(3.0), Some(1.0), Some(3.0), Some(1.0), None]);
        let (out, _) = impute(&table, ImputeStrategy::Mode, &ImputeColumns::default());

        assert_eq!(values(&out), vec![3.0, 1.0, 3.0, 1.0, 1.0]);
    }

    #[test]
    fn test_categorical_columns_take_mode_under_median() {
        let table = Table::from_rows(
            vec!["zi_saptamana".into()],
            vec![
                vec![Some(Value::text("monday"))],
                vec![None],
                vec![Some(Value::text("friday"))],
                vec![Some(Value::text("friday"))],
            ],
        );
        let (out, report) = impute(&table, ImputeStrategy::Median, &ImputeColumns::default());

        assert_eq!(out.get(1, "zi_saptamana"), Some(&Value::text("friday")));
        assert_eq!(report.fills[0].role, Some(ColumnRole::Categorical));
    }

    #[test]
    fn test_all_missing_column_is_reported_not_failed() {
        let table = Table::from_rows(
            vec!["v".into(), "w".into()],
            vec![
                vec![Some(Value::text("1")), None],
                vec![None, None],
            ],
        );
        let (out, report) = impute(&table, ImputeStrategy::Median, &ImputeColumns::default());

        assert_eq!(out.get(1, "v"), Some(&Value::Number(1.0)));
        assert_eq!(out.missing_in(1), 2);
        assert_eq!(report.unfilled, vec!["w".to_string()]);
    }

    #[test]
    fn test_infinite_median_fills_but_undefined_median_does_not() {
        let table = parse_str("k,v\na,inf\nb,\nc,inf\n", b',').unwrap();
        let (out, report) = impute(&table, ImputeStrategy::Median, &ImputeColumns::default());

        assert_eq!(out.get(1, "v"), Some(&Value::Number(f64::INFINITY)));
        assert_eq!(report.fills[0].fill_value.as_deref(), Some("inf"));

        let table = parse_str("k,v\na,-inf\nb,\nc,inf\n", b',').unwrap();
        let (out, report) = impute(&table, ImputeStrategy::Median, &ImputeColumns::default());

        assert_eq!(out.get(1, "v"), None);
        assert_eq!(report.after_missing["v"], 1);
        assert_eq!(report.unfilled, vec!["v".to_string()]);
        assert_eq!(report.filled_cells(), 0);
    }

    #[test]
    fn test_drop_removes_incomplete_rows() {
        let table = numeric_column(&[Some(1.0), None, Some(2.0)]);
        let (out, report) = impute(&table, ImputeStrategy::Drop, &ImputeColumns::default());

        assert_eq!(out.n_rows(), 2);
        assert_eq!(report.dropped_rows, 1);
        assert_eq!(report.remaining_missing(), 0);
    }

    #[test]
    fn test_input_table_is_not_modified() {
        let table = numeric_column(&[None, Some(2.0)]);
        let snapshot = table.clone();
        let _ = impute(&table, ImputeStrategy::Median, &ImputeColumns::default());
        assert_eq!(table, snapshot);
    }

    #[test]
    fn test_unknown_strategy() {
        assert_eq!(
            "FFILL".parse::<ImputeStrategy>().unwrap(),
            ImputeStrategy::ForwardFill
        );
        assert!(matches!(
            "interpolate".parse::<ImputeStrategy>(),
            Err(PipelineError::UnknownStrategy(s)) if s == "interpolate"
        ));
    }

    fn numeric_column(cells: &[Option<f64>]) -> Table {
        Table::from_rows(
            vec!["v".into()],
            cells.iter().map(|c| vec![c.map(Value::Number)]).collect(),
        )
    }

    fn values(table: &Table) -> Vec<f64> {
        table
            .column_cells(0)
            .map(|c| c.as_ref().and_then(Value::as_number).unwrap_or(f64::NAN))
            .collect()
    }
}
