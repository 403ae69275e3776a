//! Read-only analyses over the canonical table.
//!
//! This module computes the descriptive-statistics report and the grouped
//! series used by the dashboard. Rendering is left to the caller; every
//! result is a serializable report from [`types`].

pub mod aggregate;
pub mod describe;
pub mod grade;
pub mod types;
pub mod utility;

use crate::table::{Table, Value};

/// Numeric view of a column, one entry per row. `None` if the column does not exist.
pub(crate) fn numeric_column(table: &Table, name: &str) -> Option<Vec<Option<f64>>> {
    let idx = table.column_index(name)?;
    Some(
        table
            .column_cells(idx)
            .map(|c| c.as_ref().and_then(Value::as_number))
            .collect(),
    )
}

/// Present values of a column, in row order.
pub(crate) fn present_values(column: &[Option<f64>]) -> Vec<f64> {
    column.iter().flatten().copied().collect()
}
