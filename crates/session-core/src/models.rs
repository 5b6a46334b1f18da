use chrono::NaiveDateTime;
use serde::Serialize;

/// Largest gap, in seconds, allowed between consecutive readings of one
/// session. A larger gap starts a new session.
pub const SESSION_GAP_SECS: i64 = 300;

/// Column names the loader requires in the input header.
pub mod columns {
    pub const SERIAL_NO: &str = "serial_no";
    pub const MAC: &str = "mac";
    pub const SIGNAL: &str = "signal";
    pub const TX_RATE: &str = "tx_rate";
    pub const RX_RATE: &str = "rx_rate";
    pub const CREATE_TIME: &str = "create_time";
    pub const USER: &str = "user";
}

/// Output header, in column order.
pub const SESSION_HEADERS: [&str; 7] = [
    "SN",
    "mac",
    "avg_signal",
    "avg_tx_rate",
    "avg_rx_rate",
    "total_duration(hour)",
    "start_time",
];

/// A single cell of an input table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// A native spreadsheet date/time value.
    DateTime(NaiveDateTime),
}

impl Cell {
    /// `true` for an empty cell or a text cell holding no characters at all.
    ///
    /// Whitespace counts as a value here: `" "` is not null.
    pub fn is_null(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// `true` for an empty cell or text that is blank after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

/// An input table as handed over by a reader: a header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    /// Index of the column whose trimmed header equals `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Cell at (`row`, `col`); short rows read as [`Cell::Empty`].
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One standalone signal reading that survived the loader's filter.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    /// Serial number of the collector that took the reading.
    pub serial_no: String,
    /// Hardware address of the observed device.
    pub mac: String,
    /// Signal strength; `None` when the cell was empty.
    pub signal: Option<f64>,
    /// Transmit rate; `None` when the cell was empty.
    pub tx_rate: Option<f64>,
    /// Receive rate; `None` when the cell was empty.
    pub rx_rate: Option<f64>,
    /// When the reading was taken.
    pub timestamp: NaiveDateTime,
}

/// One summarised session of a single device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    #[serde(rename = "SN")]
    pub serial_no: String,
    pub mac: String,
    pub avg_signal: f64,
    pub avg_tx_rate: f64,
    pub avg_rx_rate: f64,
    #[serde(rename = "total_duration(hour)")]
    pub duration_hours: f64,
    pub start_time: NaiveDateTime,
}

/// The final result of one transform: sessions sorted by `start_time`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionTable {
    pub sessions: Vec<Session>,
}

impl SessionTable {
    /// Fixed output header in column order.
    pub fn headers(&self) -> &'static [&'static str] {
        &SESSION_HEADERS
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Why a transform produced no sessions.
///
/// Callers treat every variant the same way ("no valid data"); the variant
/// only makes logs more useful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoResultReason {
    /// The input table has no data rows.
    EmptyInput,
    /// Every row was a connected-client row.
    NoValidRows,
    /// No record carried a device identifier.
    NoMacAddresses,
    /// Every device had fewer than two readings.
    NoSessionsProduced,
}

impl std::fmt::Display for NoResultReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            NoResultReason::EmptyInput => "input is empty",
            NoResultReason::NoValidRows => "no rows without an associated user",
            NoResultReason::NoMacAddresses => "no device identifiers",
            NoResultReason::NoSessionsProduced => "no sessions produced",
        };
        f.write_str(text)
    }
}

/// Outcome of a successful (non-fatal) transform.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome {
    Sessions(SessionTable),
    NoResult(NoResultReason),
}

impl TransformOutcome {
    /// The session table, if any was produced.
    pub fn sessions(&self) -> Option<&SessionTable> {
        match self {
            TransformOutcome::Sessions(table) => Some(table),
            TransformOutcome::NoResult(_) => None,
        }
    }
}
