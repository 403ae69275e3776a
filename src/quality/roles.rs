//! Numeric / categorical classification of columns.
//!
//! Classification is a separate pass producing a [`ColumnRoles`] map that
//! later stages consume. Inference looks only at a column's values, never at
//! its name.

use serde::Serialize;

use crate::table::{Cell, Table, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Numeric,
    Categorical,
}

/// Role per column, in table order. Columns without a role are left alone by imputation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnRoles {
    roles: Vec<(String, ColumnRole)>,
}

impl ColumnRoles {
    pub fn role(&self, column: &str) -> Option<ColumnRole> {
        self.roles
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, role)| *role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnRole)> {
        self.roles.iter().map(|(name, role)| (name.as_str(), *role))
    }

    pub fn numeric(&self) -> impl Iterator<Item = &str> {
        self.with_role(ColumnRole::Numeric)
    }

    pub fn categorical(&self) -> impl Iterator<Item = &str> {
        self.with_role(ColumnRole::Categorical)
    }

    fn with_role(&self, role: ColumnRole) -> impl Iterator<Item = &str> {
        self.roles
            .iter()
            .filter(move |(_, r)| *r == role)
            .map(|(name, _)| name.as_str())
    }
}

fn is_numeric_value(value: &Value) -> bool {
    match value {
        Value::Number(_) | Value::Integer(_) => true,
        Value::Text(_) => value.as_number().is_some(),
        Value::Timestamp(_) => false,
    }
}

/// A column is numeric when every present cell is, or parses as, a number.
/// A column with no present cells is numeric.
pub fn classify_cells<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> ColumnRole {
    if cells.into_iter().flatten().all(is_numeric_value) {
        ColumnRole::Numeric
    } else {
        ColumnRole::Categorical
    }
}

/// Infers a role for every column of `table`.
pub fn classify_columns(table: &Table) -> ColumnRoles {
    ColumnRoles {
        roles: table
            .headers()
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), classify_cells(table.column_cells(idx))))
            .collect(),
    }
}

/// Combines caller-supplied column lists with inference.
///
/// Without a numeric list the numeric columns are inferred; without a
/// categorical list every non-numeric column is categorical. Listed columns
/// absent from the table are ignored, and a column listed as both is numeric.
pub fn resolve_roles(
    table: &Table,
    numeric: Option<&[String]>,
    categorical: Option<&[String]>,
) -> ColumnRoles {
    let inferred = classify_columns(table);
    let is_numeric = |name: &str| match numeric {
        Some(cols) => cols.iter().any(|c| c == name),
        None => inferred.role(name) == Some(ColumnRole::Numeric),
    };
    let is_categorical = |name: &str| match categorical {
        Some(cols) => cols.iter().any(|c| c == name),
        None => true,
    };

    let roles = table
        .headers()
        .iter()
        .filter_map(|name| {
            if is_numeric(name) {
                Some((name.clone(), ColumnRole::Numeric))
            } else if is_categorical(name) {
                Some((name.clone(), ColumnRole::Categorical))
            } else {
                None
            }
        })
        .collect();

    ColumnRoles { roles }
}
