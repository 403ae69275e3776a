use crate::table::{Table, Value};

/// `numerator / denominator`, or `None` when either side is missing, the
/// denominator is zero, or the quotient is not a number.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 {
        return None;
    }
    Some(n / d).filter(|r| !r.is_nan())
}

/// Recomputes `output` from the current `numerator` and `denominator` columns.
///
/// Any previous content of `output` is replaced. If an input column is absent
/// the whole output column is missing.
pub fn derive_ratio(mut table: Table, numerator: &str, denominator: &str, output: &str) -> Table {
    let cells = match (table.column_index(numerator), table.column_index(denominator)) {
        (Some(n), Some(d)) => table
            .rows()
            .iter()
            .map(|row| {
                let num = row[n].as_ref().and_then(Value::as_number);
                let den = row[d].as_ref().and_then(Value::as_number);
                ratio(num, den).map(Value::Number)
            })
            .collect(),
        _ => vec![None; table.n_rows()],
    };
    table.set_column(output, cells);
    table
}
