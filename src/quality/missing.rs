use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::table::Table;

/// Missing-value count and share for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMissing {
    pub column: String,
    pub count: usize,
    pub percentage: f64,
}

/// Missing values per column, most affected columns first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingSummary {
    pub rows: usize,
    pub total_missing: usize,
    pub columns: Vec<ColumnMissing>,
}

impl MissingSummary {
    pub fn count(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.count)
    }

    /// Columns that have at least one missing cell.
    pub fn affected(&self) -> impl Iterator<Item = &ColumnMissing> {
        self.columns.iter().filter(|c| c.count > 0)
    }
}

pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Missing count per column, keyed by column name.
pub fn missing_by_column(table: &Table) -> BTreeMap<String, usize> {
    table
        .headers()
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.clone(), table.missing_in(idx)))
        .collect()
}

/// Counts missing cells per column.
///
/// Columns are ordered by percentage descending; ties keep table order. An
/// empty table yields zero counts and zero percentages.
pub fn report_missing(table: &Table) -> MissingSummary {
    let rows = table.n_rows();
    let mut columns: Vec<ColumnMissing> = table
        .headers()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let count = table.missing_in(idx);
            ColumnMissing {
                column: name.clone(),
                count,
                percentage: pct(count, rows),
            }
        })
        .collect();
    columns.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));

    let summary = MissingSummary {
        rows,
        total_missing: columns.iter().map(|c| c.count).sum(),
        columns,
    };

    for c in summary.affected() {
        debug!(column = %c.column, count = c.count, percentage = c.percentage, "Missing values");
    }
    info!(
        rows,
        total_missing = summary.total_missing,
        affected_columns = summary.affected().count(),
        "Missing-value report"
    );
    summary
}

/// Missing cells per row, in row order.
pub fn row_missing_counts(table: &Table) -> Vec<usize> {
    table
        .rows()
        .iter()
        .map(|row| row.iter().filter(|c| c.is_none()).count())
        .collect()
}

/// Indices of rows whose missing share strictly exceeds `threshold_pct`.
///
/// # Errors
///
/// [`PipelineError::InvalidThreshold`] unless `0 <= threshold_pct <= 100`.
pub fn bad_row_indices(table: &Table, threshold_pct: f64) -> Result<Vec<usize>> {
    if !(0.0..=100.0).contains(&threshold_pct) {
        return Err(PipelineError::InvalidThreshold(threshold_pct));
    }

    let width = table.n_cols();
    Ok(row_missing_counts(table)
        .into_iter()
        .enumerate()
        .filter(|&(_, missing)| pct(missing, width) > threshold_pct)
        .map(|(idx, _)| idx)
        .collect())
}

/// Returns the rows whose missing share strictly exceeds `threshold_pct`.
pub fn detect_bad_rows(table: &Table, threshold_pct: f64) -> Result<Table> {
    let indices = bad_row_indices(table, threshold_pct)?;
    if !indices.is_empty() {
        warn!(
            count = indices.len(),
            threshold_pct, "Rows above missing-value threshold"
        );
    }
    Ok(table.select_rows(&indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, Value};

    #[test]
    fn test_counts_match_injected_missing_cells() {
        let table = sample_table();
        let summary = report_missing(&table);

        assert_eq!(summary.rows, 4);
        assert_eq!(summary.count("a"), Some(0));
        assert_eq!(summary.count("b"), Some(1));
        assert_eq!(summary.count("c"), Some(3));
        assert_eq!(summary.total_missing, 4);
        assert_eq!(summary.total_missing, row_missing_counts(&table).iter().sum::<usize>());
    }

    #[test]
    fn test_summary_is_sorted_by_percentage() {
        let summary = report_missing(&sample_table());
        let order: Vec<&str> = summary.columns.iter().map(|c| c.column.as_str()).collect();

        assert_eq!(order, vec!["c", "b", "a"]);
        assert_eq!(summary.columns[0].percentage, 75.0);
        assert_eq!(summary.columns[1].percentage, 25.0);
    }

    #[test]
    fn test_empty_table_is_all_zero() {
        let table = Table::new(vec!["x".into(), "y".into()]);
        let summary = report_missing(&table);

        assert_eq!(summary.total_missing, 0);
        assert!(summary.columns.iter().all(|c| c.count == 0 && c.percentage == 0.0));
        assert_eq!(summary.columns.len(), 2);
    }

    #[test]
    fn test_bad_rows_strictly_exceed_threshold() {
        let table = sample_table();
        // row missing shares: 1/3, 0, 1/3, 2/3
        let bad = detect_bad_rows(&table, 50.0).unwrap();
        assert_eq!(bad.n_rows(), 1);
        assert_eq!(bad.get(0, "a"), Some(&Value::Integer(4)));

        let above_forty = bad_row_indices(&table, 40.0).unwrap();
        assert_eq!(above_forty, vec![3]);

        let none_missing = bad_row_indices(&table, 0.0).unwrap();
        assert_eq!(none_missing, vec![0, 2, 3]);
    }

    #[test]
    fn test_threshold_out_of_range_fails_fast() {
        let table = sample_table();
        assert!(matches!(
            detect_bad_rows(&table, 101.0),
            Err(PipelineError::InvalidThreshold(_))
        ));
        assert!(detect_bad_rows(&table, -0.5).is_err());
        assert!(detect_bad_rows(&table, f64::NAN).is_err());
    }

    fn sample_table() -> Table {
        let n = |v: i64| -> Cell { Some(Value::Integer(v)) };
        Table::from_rows(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                vec![n(1), n(1), None],
                vec![n(2), n(2), n(2)],
                vec![n(3), n(3), None],
                vec![n(4), None, None],
            ],
        )
    }
}
