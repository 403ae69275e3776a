//! In-memory tables with an explicit missing marker.
//!
//! A [`Table`] is an ordered list of column names plus row-major cells. Every
//! cell is a [`Cell`], i.e. `Option<Value>`: `None` is the missing marker and
//! is never confused with zero, an empty string or sentinel text.

use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::features::numeric::parse_number;

/// Format used when a parsed timestamp is written back to text. Sub-second
/// digits appear only when the timestamp has them.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A present cell value.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Integer(i64),
    Text(String),
    Timestamp(NaiveDateTime),
}

/// A single table cell. `None` marks a missing value.
pub type Cell = Option<Value>;

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Numeric view of the value. Text is parsed; timestamps have no numeric view.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            Value::Number(_) => None,
            Value::Integer(i) => Some(*i as f64),
            Value::Text(s) => parse_number(s),
            Value::Timestamp(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Number(_) => 0,
            Value::Integer(_) => 1,
            Value::Timestamp(_) => 2,
            Value::Text(_) => 3,
        }
    }
}

// -0.0 and 0.0 are the same value for grouping purposes.
fn folded(n: f64) -> f64 {
    if n == 0.0 { 0.0 } else { n }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => folded(*a).to_bits() == folded(*b).to_bits(),
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Number(n) => folded(*n).to_bits().hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Text(s) => s.hash(state),
            Value::Timestamp(t) => t.hash(state),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => folded(*a).total_cmp(&folded(*b)),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// Named columns over row-major cells.
///
/// Every row always has exactly one cell per column; constructors pad short
/// rows with missing cells and truncate long ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let mut table = Self::new(headers);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cells of column `idx`, top to bottom.
    pub fn column_cells(&self, idx: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    /// Cells of the named column, or `None` if the column does not exist.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.column_cells(idx).collect())
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_ref()
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    /// Replaces the named column, or appends it when absent.
    pub fn set_column(&mut self, name: &str, mut cells: Vec<Cell>) {
        cells.resize(self.rows.len(), None);
        match self.column_index(name) {
            Some(idx) => {
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row[idx] = cell;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row.push(cell);
                }
            }
        }
    }

    /// Rewrites every cell of column `idx` in place.
    pub fn update_column<F: FnMut(Cell) -> Cell>(&mut self, idx: usize, mut f: F) {
        for row in &mut self.rows {
            let cell = row[idx].take();
            row[idx] = f(cell);
        }
    }

    /// Consuming variant of [`Table::update_column`] keyed by name; absent columns are a no-op.
    pub fn map_column<F: FnMut(Cell) -> Cell>(mut self, name: &str, f: F) -> Self {
        if let Some(idx) = self.column_index(name) {
            self.update_column(idx, f);
        }
        self
    }

    /// New table holding clones of the rows at `indices`, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            headers: self.headers.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// New table holding clones of the rows for which `keep(index, row)` holds.
    pub fn filter_rows<F: Fn(usize, &[Cell]) -> bool>(&self, keep: F) -> Table {
        Table {
            headers: self.headers.clone(),
            rows: self
                .rows
                .iter()
                .enumerate()
                .filter(|(i, row)| keep(*i, row))
                .map(|(_, row)| row.clone())
                .collect(),
        }
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Cell>>) {
        (self.headers, self.rows)
    }

    /// Number of missing cells in column `idx`.
    pub fn missing_in(&self, idx: usize) -> usize {
        self.column_cells(idx).filter(|c| c.is_none()).count()
    }
}
