//! Quality resolution for raw tables.
//!
//! This module reports missingness, flags sparse rows, resolves duplicate
//! rows and imputes missing values. Every operation borrows its input and
//! returns a new table alongside a report of what it found and changed, so a
//! failing call leaves the caller's table untouched.

pub mod duplicates;
pub mod impute;
pub mod missing;
pub mod roles;

pub use duplicates::{DuplicateKey, DuplicateReport, KeepPolicy, resolve_duplicates};
pub use impute::{ColumnFill, ImputeColumns, ImputeReport, ImputeStrategy, impute};
pub use missing::{
    ColumnMissing, MissingSummary, bad_row_indices, detect_bad_rows, report_missing,
    row_missing_counts,
};
pub use roles::{ColumnRole, ColumnRoles, classify_columns, resolve_roles};
