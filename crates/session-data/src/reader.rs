//! Input discovery and loading.
//!
//! Turns `.xlsx` workbooks and `.jsonl` exports into [`RawTable`]s for the
//! session pipeline.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Reader, Xlsx};
use session_core::data_processors::TimestampParser;
use session_core::error::{Result, SessionError};
use session_core::models::{Cell, RawTable};
use tracing::{debug, warn};

/// File extensions [`read_table`] understands, lower-case.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["xlsx", "jsonl"];

/// Prefix office suites give their lock files next to an open workbook.
const LOCK_FILE_PREFIX: &str = "~$";

// ── Public API ────────────────────────────────────────────────────────────────

/// `true` when `path` has one of [`SUPPORTED_EXTENSIONS`] (any case).
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Expand the command-line input list into concrete files.
///
/// Directories are walked recursively and their supported files sorted by
/// path. Explicit files keep their argument order. Missing paths and
/// unsupported files are logged and skipped.
pub fn discover_inputs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = walkdir::WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| {
                    entry.file_type().is_file()
                        && is_supported(entry.path())
                        && !is_lock_file(entry.path())
                })
                .map(|entry| entry.into_path())
                .collect();
            found.sort();
            debug!("{}: {} input file(s)", path.display(), found.len());
            files.extend(found);
        } else if path.is_file() {
            if is_supported(path) {
                files.push(path.clone());
            } else {
                warn!("Skipping unsupported input: {}", path.display());
            }
        } else {
            warn!("Input does not exist: {}", path.display());
        }
    }

    files
}

/// Read the table stored at `path`, choosing the format by extension.
pub fn read_table(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("xlsx") => read_xlsx(path),
        Some("jsonl") => read_jsonl(path),
        _ => Err(SessionError::UnsupportedInput(path.to_path_buf())),
    }
}

// ── xlsx ──────────────────────────────────────────────────────────────────────

/// First worksheet of the workbook; its first row is the header. Rows with
/// no content at all are skipped.
fn read_xlsx(path: &Path) -> Result<RawTable> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| SessionError::Workbook(format!("{}: {}", path.display(), e)))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => {
            range.map_err(|e| SessionError::Workbook(format!("{}: {}", path.display(), e)))?
        }
        None => {
            debug!("{}: workbook has no worksheets", path.display());
            return Ok(RawTable::default());
        }
    };

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(header_text).collect(),
        None => return Ok(RawTable::default()),
    };

    let data: Vec<Vec<Cell>> = rows
        .map(|row| row.iter().map(convert_cell).collect::<Vec<Cell>>())
        .filter(|cells| !cells.iter().all(Cell::is_blank))
        .collect();

    debug!(
        "{}: {} column(s), {} data row(s)",
        path.display(),
        headers.len(),
        data.len()
    );
    Ok(RawTable::new(headers, data))
}

fn header_text(value: &Data) -> String {
    match value {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn convert_cell(value: &Data) -> Cell {
    match value {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => Cell::DateTime(naive),
            None => Cell::Text(dt.to_string()),
        },
        Data::DateTimeIso(s) => match TimestampParser::parse_str(s) {
            Some(naive) => Cell::DateTime(naive),
            None => Cell::Text(s.clone()),
        },
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

// ── jsonl ─────────────────────────────────────────────────────────────────────

/// One JSON object per line. The header is the union of every line's keys
/// in first-seen order; a key absent from a line reads as an empty cell.
fn read_jsonl(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).map_err(|source| SessionError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let reader = std::io::BufReader::new(file);
    let mut objects: Vec<serde_json::Map<String, serde_json::Value>> = Vec::new();

    for line_result in reader.lines() {
        let line = line_result.map_err(|source| SessionError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        objects.push(serde_json::from_str(trimmed)?);
    }

    let mut headers: Vec<String> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.clone());
            }
        }
    }

    let rows: Vec<Vec<Cell>> = objects
        .iter()
        .map(|object| {
            headers
                .iter()
                .map(|h| object.get(h).map(json_cell).unwrap_or(Cell::Empty))
                .collect()
        })
        .collect();

    debug!("{}: {} record(s)", path.display(), rows.len());
    Ok(RawTable::new(headers, rows))
}

fn json_cell(value: &serde_json::Value) -> Cell {
    match value {
        serde_json::Value::Null => Cell::Empty,
        serde_json::Value::Bool(b) => Cell::Bool(*b),
        serde_json::Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
        serde_json::Value::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(LOCK_FILE_PREFIX))
        .unwrap_or(false)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
