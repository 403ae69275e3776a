use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The source could not be turned into a table. Nothing is partially loaded.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to decompress gzip input {path}: {source}")]
    Gzip {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Input {path} is not valid {encoding} text: {message}")]
    Decode {
        path: PathBuf,
        encoding: String,
        message: String,
    },
    #[error("Malformed delimited data in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Input {path} has no header row")]
    NoHeader { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Loading failed: {0}")]
    Load(#[from] LoadError),
    #[error("Unknown imputation strategy '{0}' (expected drop, ffill, median or mode)")]
    UnknownStrategy(String),
    #[error("Unknown duplicate keep policy '{0}' (expected first, last or none)")]
    UnknownKeepPolicy(String),
    #[error("Unknown encoding '{0}' (expected utf-8, utf-8-lossy or latin-1)")]
    UnknownEncoding(String),
    #[error("Unknown granularity '{0}' (expected hourly, daily or monthly)")]
    UnknownGranularity(String),
    #[error("Delimiter '{0}' is not a single ASCII character")]
    InvalidDelimiter(char),
    #[error("Missing-value threshold {0} is outside [0, 100]")]
    InvalidThreshold(f64),
    #[error("Column '{0}' is not present in the table")]
    UnknownColumn(String),
    #[error("IO error writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to encode delimited data for {path}: {source}")]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("IO error reading config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse JSON configuration in {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
