//! Delimited-text loader for raw energy tables.
//!
//! Loading is whole-file and all-or-nothing: the file is read, optionally
//! gunzipped, decoded, and parsed into a [`Table`] of raw text cells. No
//! schema is enforced beyond the header row.

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{LoadError, PipelineError};
use crate::table::{Cell, Table, Value};

/// Cell texts treated as missing on load (pandas' default NA set).
pub const NA_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "#N/A",
    "#NA", "<NA>", "1.#IND", "1.#QNAN", "-1.#IND", "-1.#QNAN", "#N/A N/A",
];

/// Text encoding of the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Encoding {
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    /// UTF-8 with invalid sequences replaced by U+FFFD.
    #[serde(rename = "utf-8-lossy")]
    Utf8Lossy,
    /// ISO-8859-1; every byte maps to the code point of the same value.
    #[serde(rename = "latin-1")]
    Latin1,
}

impl FromStr for Encoding {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "utf-8-lossy" | "utf8-lossy" => Ok(Encoding::Utf8Lossy),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            _ => Err(PipelineError::UnknownEncoding(s.to_string())),
        }
    }
}

impl TryFrom<String> for Encoding {
    type Error = PipelineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Utf8Lossy => "utf-8-lossy",
            Encoding::Latin1 => "latin-1",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub encoding: Encoding,
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            encoding: Encoding::Utf8,
            delimiter: b',',
        }
    }
}

pub fn is_na_token(raw: &str) -> bool {
    NA_TOKENS.contains(&raw)
}

/// Returns `true` when `path` should be read or written through gzip.
pub fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

/// Loads a delimited file into a raw [`Table`].
///
/// # Errors
///
/// Returns [`LoadError`] if the file cannot be read, decompressed or decoded,
/// has no header row, or has rows whose field count differs from the header.
#[tracing::instrument(level = "info", skip(path, options), fields(path = %path.as_ref().display()))]
pub fn load<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Table, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(bytes = bytes.len(), "Input bytes read");

    let bytes = if is_gzip(path) {
        let mut out = Vec::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_end(&mut out)
            .map_err(|source| LoadError::Gzip {
                path: path.to_path_buf(),
                source,
            })?;
        out
    } else {
        bytes
    };

    let text = decode(path, bytes, options.encoding)?;
    let table = parse_delimited(path, &text, options.delimiter)?;

    info!(
        rows = table.n_rows(),
        columns = table.n_cols(),
        "Raw table loaded"
    );
    Ok(table)
}

/// Parses in-memory delimited text. Used by [`load`] and handy for tests.
pub fn parse_str(text: &str, delimiter: u8) -> Result<Table, LoadError> {
    parse_delimited(Path::new("<memory>"), text, delimiter)
}

fn decode(path: &Path, bytes: Vec<u8>, encoding: Encoding) -> Result<String, LoadError> {
    let text = match encoding {
        Encoding::Utf8 => String::from_utf8(bytes).map_err(|e| LoadError::Decode {
            path: path.to_path_buf(),
            encoding: encoding.to_string(),
            message: e.utf8_error().to_string(),
        })?,
        Encoding::Utf8Lossy => String::from_utf8_lossy(&bytes).into_owned(),
        Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
    };

    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

fn parse_delimited(path: &Path, text: &str, delimiter: u8) -> Result<Table, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let raw_headers = rdr.headers().map_err(csv_err)?.clone();
    if raw_headers.is_empty() {
        return Err(LoadError::NoHeader {
            path: path.to_path_buf(),
        });
    }

    let mut table = Table::new(mangle_headers(raw_headers.iter()));
    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        let row: Vec<Cell> = record
            .iter()
            .map(|field| {
                if is_na_token(field) {
                    None
                } else {
                    Some(Value::text(field))
                }
            })
            .collect();
        table.push_row(row);
    }

    Ok(table)
}

/// Repeated header names get `.1`, `.2`, ... suffixes so every column stays addressable.
fn mangle_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in raw {
        let mut candidate = name.to_string();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{name}.{n}");
            n += 1;
        }
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_parse_marks_na_tokens_missing() {
        let table = parse_str("date,consum\n2024-01-01 00:00:00,\n,NaN\nx,12\n", b',').unwrap();

        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.get(0, "consum"), None);
        assert_eq!(table.get(1, "date"), None);
        assert_eq!(table.get(1, "consum"), None);
        assert_eq!(table.get(2, "consum"), Some(&Value::text("12")));
    }

    #[test]
    fn test_ragged_rows_are_a_load_error() {
        let result = parse_str("a,b\n1,2\n3\n", b',');
        assert!(matches!(result, Err(LoadError::Csv { .. })));
    }

    #[test]
    fn test_empty_input_has_no_header() {
        let result = parse_str("", b',');
        assert!(matches!(result, Err(LoadError::NoHeader { .. })));
    }

    #[test]
    fn test_header_only_input_is_an_empty_table() {
        let table = parse_str("a;b\n", b';').unwrap();
        assert_eq!(table.n_cols(), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn test_duplicate_headers_are_mangled() {
        let table = parse_str("a,a,b,a\n1,2,3,4\n", b',').unwrap();
        assert_eq!(table.headers(), &["a", "a.1", "b", "a.2"]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load("/definitely/not/here.csv", &LoadOptions::default());
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_load_latin1_and_strict_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // 0xE9 is 'é' in latin-1 and invalid as a lone UTF-8 byte
        fs::write(&path, b"nume\ncaf\xe9\n").unwrap();

        let strict = load(&path, &LoadOptions::default());
        assert!(matches!(strict, Err(LoadError::Decode { .. })));

        let options = LoadOptions {
            encoding: Encoding::Latin1,
            ..LoadOptions::default()
        };
        let table = load(&path, &options).unwrap();
        assert_eq!(table.get(0, "nume"), Some(&Value::text("café")));
    }

    #[test]
    fn test_load_gzip_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("energy.csv.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"\xef\xbb\xbfdate,sold\n2024-01-01,5\n").unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let table = load(&path, &LoadOptions::default()).unwrap();
        assert_eq!(table.headers(), &["date", "sold"]);
        assert_eq!(table.get(0, "sold"), Some(&Value::text("5")));
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("UTF-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("latin1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert!("cp1250".parse::<Encoding>().is_err());
    }
}
