use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::table::{Cell, Table};

/// Which columns two rows must agree on to count as duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DuplicateKey {
    #[default]
    AllColumns,
    /// An empty list behaves like [`DuplicateKey::AllColumns`].
    Columns(Vec<String>),
}

/// Which member of a duplicate group survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", rename_all = "lowercase")]
pub enum KeepPolicy {
    /// Keep the earliest row of each group.
    #[default]
    First,
    /// Keep the latest row of each group.
    Last,
    /// Drop every row that belongs to a group of two or more.
    None,
}

impl FromStr for KeepPolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(KeepPolicy::First),
            "last" => Ok(KeepPolicy::Last),
            "none" | "false" => Ok(KeepPolicy::None),
            _ => Err(PipelineError::UnknownKeepPolicy(s.to_string())),
        }
    }
}

impl TryFrom<String> for KeepPolicy {
    type Error = PipelineError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for KeepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeepPolicy::First => "first",
            KeepPolicy::Last => "last",
            KeepPolicy::None => "none",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateReport {
    pub policy: KeepPolicy,
    /// Rows belonging to any group of two or more, counted before the policy is applied.
    pub duplicate_rows: usize,
    pub duplicate_groups: usize,
    pub removed: usize,
    pub remaining: usize,
}

fn key_indices(table: &Table, key: &DuplicateKey) -> Result<Vec<usize>> {
    match key {
        DuplicateKey::Columns(cols) if !cols.is_empty() => cols
            .iter()
            .map(|c| {
                table
                    .column_index(c)
                    .ok_or_else(|| PipelineError::UnknownColumn(c.clone()))
            })
            .collect(),
        _ => Ok((0..table.n_cols()).collect()),
    }
}

/// Groups rows by `key` and applies `keep` to every group of two or more.
///
/// Survivors keep their original relative order. Missing cells compare equal
/// to each other.
///
/// # Errors
///
/// [`PipelineError::UnknownColumn`] if a key column is not in the table.
#[tracing::instrument(level = "info", skip(table, key, keep), fields(rows = table.n_rows(), policy = %keep))]
pub fn resolve_duplicates(
    table: &Table,
    key: &DuplicateKey,
    keep: KeepPolicy,
) -> Result<(Table, DuplicateReport)> {
    let key_idx = key_indices(table, key)?;

    let mut groups: HashMap<Vec<&Cell>, Vec<usize>> = HashMap::new();
    for (i, row) in table.rows().iter().enumerate() {
        let k: Vec<&Cell> = key_idx.iter().map(|&j| &row[j]).collect();
        groups.entry(k).or_default().push(i);
    }

    let mut keep_mask = vec![true; table.n_rows()];
    let mut duplicate_rows = 0;
    let mut duplicate_groups = 0;

    for members in groups.values().filter(|g| g.len() > 1) {
        duplicate_rows += members.len();
        duplicate_groups += 1;

        let dropped = match keep {
            KeepPolicy::First => &members[1..],
            KeepPolicy::Last => &members[..members.len() - 1],
            KeepPolicy::None => &members[..],
        };
        for &i in dropped {
            keep_mask[i] = false;
        }
    }

    if duplicate_groups > 0 {
        warn!(duplicate_rows, duplicate_groups, "Duplicate rows found");
    }

    let resolved = table.filter_rows(|i, _| keep_mask[i]);
    let report = DuplicateReport {
        policy: keep,
        duplicate_rows,
        duplicate_groups,
        removed: table.n_rows() - resolved.n_rows(),
        remaining: resolved.n_rows(),
    };

    info!(
        removed = report.removed,
        remaining = report.remaining,
        "Duplicates resolved"
    );
    Ok((resolved, report))
}
