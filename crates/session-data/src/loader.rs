//! Record loading: validates the raw input table and keeps the rows that are
//! standalone signal readings.

use session_core::data_processors::CellConverter;
use session_core::error::{Result, SessionError};
use session_core::models::{columns, Cell, NoResultReason, RawTable, SignalRecord};
use tracing::{info, warn};

use crate::analysis::Halt;

// ── ColumnLayout ──────────────────────────────────────────────────────────────

/// Positions of the required columns within one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub serial_no: usize,
    pub mac: usize,
    pub signal: usize,
    pub tx_rate: usize,
    pub rx_rate: usize,
    pub create_time: usize,
    pub user: usize,
}

impl ColumnLayout {
    /// Locate every required column in `table`'s header.
    pub fn resolve(table: &RawTable) -> Result<Self> {
        let find = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| SessionError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            serial_no: find(columns::SERIAL_NO)?,
            mac: find(columns::MAC)?,
            signal: find(columns::SIGNAL)?,
            tx_rate: find(columns::TX_RATE)?,
            rx_rate: find(columns::RX_RATE)?,
            create_time: find(columns::CREATE_TIME)?,
            user: find(columns::USER)?,
        })
    }

    /// Build the [`SignalRecord`] for data row `row` (0-based).
    fn record(&self, table: &RawTable, row: usize) -> Result<SignalRecord> {
        let timestamp_cell = table.cell(row, self.create_time);
        let timestamp = CellConverter::timestamp(timestamp_cell).ok_or_else(|| {
            SessionError::TimestampParse {
                row: row + 1,
                value: CellConverter::text(timestamp_cell),
            }
        })?;

        Ok(SignalRecord {
            serial_no: CellConverter::text(table.cell(row, self.serial_no)),
            mac: CellConverter::text(table.cell(row, self.mac)),
            signal: metric(table.cell(row, self.signal), columns::SIGNAL, row)?,
            tx_rate: metric(table.cell(row, self.tx_rate), columns::TX_RATE, row)?,
            rx_rate: metric(table.cell(row, self.rx_rate), columns::RX_RATE, row)?,
            timestamp,
        })
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Filter `table` down to standalone readings and parse them.
///
/// Rows with a non-empty `user` cell belong to connected clients and are
/// dropped. An empty table or a table with nothing left after filtering is a
/// no-result halt; a missing column, a bad number or an unparseable
/// timestamp fails the whole input.
pub fn load_records(table: &RawTable) -> std::result::Result<Vec<SignalRecord>, Halt> {
    let total_rows = table.len();
    info!("Total rows: {}", total_rows);

    if total_rows == 0 {
        warn!("Input table is empty");
        return Err(NoResultReason::EmptyInput.into());
    }

    let layout = ColumnLayout::resolve(table)?;

    let kept: Vec<usize> = (0..total_rows)
        .filter(|&row| table.cell(row, layout.user).is_null())
        .collect();
    info!(
        "Valid rows: {} ({} rows with an associated user dropped)",
        kept.len(),
        total_rows - kept.len()
    );

    if kept.is_empty() {
        warn!("No valid rows left after filtering");
        return Err(NoResultReason::NoValidRows.into());
    }

    let records = kept
        .into_iter()
        .map(|row| layout.record(table, row))
        .collect::<Result<Vec<_>>>()?;
    Ok(records)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn metric(cell: &Cell, column: &str, row: usize) -> Result<Option<f64>> {
    CellConverter::number(cell).map_err(|value| SessionError::InvalidNumber {
        column: column.to_string(),
        row: row + 1,
        value,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
