use crate::table::{Cell, Table, Value};

/// Parses a trimmed float literal. `NaN` is treated as missing; infinities are kept.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Numeric view of a present value, or `None` when it has none.
pub fn to_number(value: Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_nan() => None,
        Value::Number(_) => Some(value),
        Value::Integer(i) => Some(Value::Number(i as f64)),
        Value::Text(s) => parse_number(&s).map(Value::Number),
        Value::Timestamp(_) => None,
    }
}

/// Coerces each named column to numbers; values that do not parse become missing.
///
/// Absent columns are skipped. Coercing an already numeric column is a no-op.
pub fn coerce_numeric<S: AsRef<str>>(mut table: Table, columns: &[S]) -> Table {
    for column in columns {
        if let Some(idx) = table.column_index(column.as_ref()) {
            table.update_column(idx, |cell| cell.and_then(to_number));
        }
    }
    table
}

/// Trims and lowercases text in `column`. Missing and non-text cells pass through.
pub fn normalize_category(table: Table, column: &str) -> Table {
    table.map_column(column, normalize_cell)
}

fn normalize_cell(cell: Cell) -> Cell {
    match cell {
        Some(Value::Text(s)) => Some(Value::Text(s.trim().to_lowercase())),
        other => other,
    }
}
