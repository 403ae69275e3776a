//! Persistence for canonical tables and pipeline reports.
//!
//! Supports CSV (optionally gzip-compressed) for tables and pretty JSON for
//! reports. Every file is written to a temporary sibling first and renamed
//! into place, so a failed write never leaves a partial file behind.

use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::parser::is_gzip;
use crate::table::Table;

/// Prints a report to stdout as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes a report as pretty-printed JSON to `path`.
pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let body = serde_json::to_vec_pretty(value)?;
    write_atomically(path, &body)?;
    debug!(path = %path.display(), bytes = body.len(), "JSON report written");
    Ok(())
}

/// Encodes `table` as delimited text. Missing cells become empty fields.
pub fn to_delimited_bytes(table: &Table, delimiter: u8) -> csv::Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(table.headers())?;
    for row in table.rows() {
        writer.write_record(
            row.iter()
                .map(|cell| cell.as_ref().map(|v| v.to_string()).unwrap_or_default()),
        )?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Persists `table` to `path`, gzip-compressed when the path ends in `.gz`.
#[tracing::instrument(level = "info", skip(path, table), fields(path = %path.as_ref().display(), rows = table.n_rows()))]
pub fn write_table<P: AsRef<Path>>(path: P, table: &Table, delimiter: u8) -> Result<()> {
    let path = path.as_ref();
    let body = to_delimited_bytes(table, delimiter).map_err(|source| PipelineError::CsvWrite {
        path: path.to_path_buf(),
        source,
    })?;

    let body = if is_gzip(path) {
        let write_err = |source| PipelineError::Write {
            path: path.to_path_buf(),
            source,
        };
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&body).map_err(write_err)?;
        encoder.finish().map_err(write_err)?
    } else {
        body
    };

    write_atomically(path, &body)?;
    info!(
        rows = table.n_rows(),
        columns = table.n_cols(),
        "Table written"
    );
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_atomically(path: &Path, body: &[u8]) -> Result<()> {
    let write_err = |source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let tmp = temp_path(path);
    if let Err(source) = fs::write(&tmp, body).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(source));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{LoadOptions, load};
    use crate::table::Value;
    use serde_json::json;

    #[test]
    fn test_missing_cells_are_written_empty() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![Some(Value::Number(1.5)), None]],
        );
        let bytes = to_delimited_bytes(&table, b',').unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "a,b\n1.5,\n");
    }

    #[test]
    fn test_write_table_creates_parent_dirs_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("canonical.csv");
        let table = Table::from_rows(vec!["x".into()], vec![vec![Some(Value::Integer(3))]]);

        write_table(&path, &table, b',').unwrap();

        assert!(path.exists());
        assert!(!temp_path(&path).exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "x\n3\n");
    }

    #[test]
    fn test_gzip_output_round_trips_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canonical.csv.gz");
        let table = Table::from_rows(
            vec!["zi_saptamana".into(), "sold".into()],
            vec![
                vec![Some(Value::text("friday")), Some(Value::Number(-12.25))],
                vec![None, Some(Value::Number(4.0))],
            ],
        );

        write_table(&path, &table, b',').unwrap();
        let loaded = load(&path, &LoadOptions::default()).unwrap();

        assert_eq!(loaded.get(0, "zi_saptamana"), Some(&Value::text("friday")));
        assert_eq!(loaded.get(0, "sold"), Some(&Value::text("-12.25")));
        assert_eq!(loaded.get(1, "zi_saptamana"), None);
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        write_json(&path, &json!({ "removed": 2 })).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"removed\": 2"));
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&json!({ "rows": 0 })).unwrap();
    }
}
