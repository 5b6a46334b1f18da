use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors produced while turning one input into a session table.
///
/// The "nothing to report" conditions (empty input, no valid rows, ...) are
/// not errors; they travel as [`crate::models::NoResultReason`].
#[derive(Error, Debug)]
pub enum SessionError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input file type is not one the reader understands.
    #[error("Unsupported input file: {0}")]
    UnsupportedInput(PathBuf),

    /// A required column is absent from the header row.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A `create_time` cell did not match any recognised format.
    #[error("Invalid timestamp in row {row}: {value:?}")]
    TimestampParse { row: usize, value: String },

    /// A metric cell held something other than a number.
    #[error("Invalid number in column {column}, row {row}: {value:?}")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },

    /// A session mean could not be computed (no values, or not finite).
    #[error("Cannot aggregate {metric} for device {mac}")]
    Aggregation { mac: String, metric: String },

    /// The spreadsheet library rejected a read or write.
    #[error("Workbook error: {0}")]
    Workbook(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the session crates.
pub type Result<T> = std::result::Result<T, SessionError>;
