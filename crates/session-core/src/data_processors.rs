use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::models::Cell;

// ── TimestampParser ───────────────────────────────────────────────────────────

/// Parses `create_time` values in the formats collectors are known to export.
pub struct TimestampParser;

impl TimestampParser {
    /// Patterns tried, in order, after RFC 3339.
    const FORMATS: &'static [&'static str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    /// Attempt to parse a timestamp string into a naive date-time.
    ///
    /// Strings carrying an offset (RFC 3339) are converted to UTC first and
    /// then stripped of their zone; everything else is taken as written.
    /// A bare date means midnight.
    pub fn parse_str(s: &str) -> Option<NaiveDateTime> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.naive_utc());
        }

        for fmt in Self::FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(naive);
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0);
        }

        debug!("TimestampParser: could not parse \"{}\"", s);
        None
    }
}

// ── CellConverter ─────────────────────────────────────────────────────────────

/// Helpers for turning loosely typed table cells into record fields.
pub struct CellConverter;

impl CellConverter {
    /// Render a cell as text.
    ///
    /// Integral numbers lose their trailing `.0` so that serial numbers and
    /// identifiers stored as numbers read the way they were typed.
    pub fn text(cell: &Cell) -> String {
        match cell {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => Self::number_text(*n),
            Cell::Bool(b) => b.to_string(),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Read a numeric cell.
    ///
    /// Returns `Ok(None)` for a blank cell and `Err(raw_text)` when the cell
    /// holds something that is not a number.
    pub fn number(cell: &Cell) -> Result<Option<f64>, String> {
        match cell {
            Cell::Empty => Ok(None),
            Cell::Number(n) => Ok(Some(*n)),
            Cell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| trimmed.to_string())
            }
            other => Err(Self::text(other)),
        }
    }

    /// Read a timestamp cell; native date cells pass straight through.
    pub fn timestamp(cell: &Cell) -> Option<NaiveDateTime> {
        match cell {
            Cell::DateTime(dt) => Some(*dt),
            Cell::Text(s) => TimestampParser::parse_str(s),
            _ => None,
        }
    }

    fn number_text(n: f64) -> String {
        if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
            format!("{}", n as i64)
        } else {
            n.to_string()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
