//! Result output: one worksheet per input, plus an optional JSON export.

use std::path::Path;

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet, XlsxError};
use serde::Serialize;
use session_core::error::{Result, SessionError};
use session_core::models::{Session, SessionTable};
use tracing::{debug, info};
use unicode_width::UnicodeWidthStr;

/// Header of a message sheet.
pub const MESSAGE_HEADER: &str = "message";
/// Message written for an input that produced no sessions.
pub const NO_DATA_MESSAGE: &str = "no valid data";
/// Extra characters added to the widest cell of a column.
const COLUMN_PADDING: usize = 4;
const DATETIME_NUM_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const DATETIME_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── OutputSheet ───────────────────────────────────────────────────────────────

/// What one worksheet holds.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetContent<'a> {
    Sessions(&'a SessionTable),
    Message(String),
}

/// One named worksheet of the output.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSheet<'a> {
    pub label: &'a str,
    pub content: SheetContent<'a>,
}

impl<'a> OutputSheet<'a> {
    pub fn sessions(label: &'a str, table: &'a SessionTable) -> Self {
        Self {
            label,
            content: SheetContent::Sessions(table),
        }
    }

    pub fn no_data(label: &'a str) -> Self {
        Self {
            label,
            content: SheetContent::Message(NO_DATA_MESSAGE.to_string()),
        }
    }

    pub fn failed(label: &'a str, detail: &str) -> Self {
        Self {
            label,
            content: SheetContent::Message(format!("processing error: {detail}")),
        }
    }
}

// ── Workbook ──────────────────────────────────────────────────────────────────

/// Write `sheets` to an `.xlsx` workbook at `path`, in order.
///
/// Every cell is centred horizontally and vertically; each column is as
/// wide as its widest cell plus a small padding.
pub fn write_workbook(path: &Path, sheets: &[OutputSheet<'_>]) -> Result<()> {
    let mut workbook = Workbook::new();
    let cell_format = Format::new()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    let datetime_format = cell_format.clone().set_num_format(DATETIME_NUM_FORMAT);

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.label).map_err(workbook_error)?;

        match &sheet.content {
            SheetContent::Sessions(table) => {
                write_sessions(worksheet, table, &cell_format, &datetime_format)
                    .map_err(workbook_error)?;
                debug!("Sheet {}: {} session row(s)", sheet.label, table.len());
            }
            SheetContent::Message(message) => {
                write_message(worksheet, message, &cell_format).map_err(workbook_error)?;
                debug!("Sheet {}: {}", sheet.label, message);
            }
        }
    }

    workbook.save(path).map_err(workbook_error)?;
    info!("Wrote {} sheet(s) to {}", sheets.len(), path.display());
    Ok(())
}

fn write_sessions(
    worksheet: &mut Worksheet,
    table: &SessionTable,
    cell_format: &Format,
    datetime_format: &Format,
) -> std::result::Result<(), XlsxError> {
    let mut widths = ColumnWidths::default();

    for (col, header) in table.headers().iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, *header, cell_format)?;
        widths.observe(col, header);
    }

    for (i, session) in table.sessions.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_string_with_format(row, 0, &session.serial_no, cell_format)?;
        worksheet.write_string_with_format(row, 1, &session.mac, cell_format)?;
        worksheet.write_number_with_format(row, 2, session.avg_signal, cell_format)?;
        worksheet.write_number_with_format(row, 3, session.avg_tx_rate, cell_format)?;
        worksheet.write_number_with_format(row, 4, session.avg_rx_rate, cell_format)?;
        worksheet.write_number_with_format(row, 5, session.duration_hours, cell_format)?;
        worksheet.write_datetime_with_format(row, 6, &session.start_time, datetime_format)?;

        widths.observe(0, &session.serial_no);
        widths.observe(1, &session.mac);
        widths.observe(2, &session.avg_signal.to_string());
        widths.observe(3, &session.avg_tx_rate.to_string());
        widths.observe(4, &session.avg_rx_rate.to_string());
        widths.observe(5, &session.duration_hours.to_string());
        widths.observe(6, &format_datetime(&session.start_time));
    }

    widths.apply(worksheet)
}

fn write_message(
    worksheet: &mut Worksheet,
    message: &str,
    cell_format: &Format,
) -> std::result::Result<(), XlsxError> {
    let mut widths = ColumnWidths::default();
    worksheet.write_string_with_format(0, 0, MESSAGE_HEADER, cell_format)?;
    worksheet.write_string_with_format(1, 0, message, cell_format)?;
    widths.observe(0, MESSAGE_HEADER);
    widths.observe(0, message);
    widths.apply(worksheet)
}

/// Widest display width seen per column.
#[derive(Debug, Default)]
struct ColumnWidths {
    widths: Vec<usize>,
}

impl ColumnWidths {
    fn observe(&mut self, col: u16, text: &str) {
        let col = col as usize;
        if self.widths.len() <= col {
            self.widths.resize(col + 1, 0);
        }
        self.widths[col] = self.widths[col].max(UnicodeWidthStr::width(text));
    }

    fn apply(&self, worksheet: &mut Worksheet) -> std::result::Result<(), XlsxError> {
        for (col, width) in self.widths.iter().enumerate() {
            worksheet.set_column_width(col as u16, (width + COLUMN_PADDING) as f64)?;
        }
        Ok(())
    }
}

fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_TEXT_FORMAT).to_string()
}

fn workbook_error(err: XlsxError) -> SessionError {
    SessionError::Workbook(err.to_string())
}

// ── JSON ──────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonSheet<'a> {
    label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sessions: Option<&'a [Session]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl<'a> From<&'a OutputSheet<'a>> for JsonSheet<'a> {
    fn from(sheet: &'a OutputSheet<'a>) -> Self {
        match &sheet.content {
            SheetContent::Sessions(table) => JsonSheet {
                label: sheet.label,
                sessions: Some(table.sessions.as_slice()),
                message: None,
            },
            SheetContent::Message(message) => JsonSheet {
                label: sheet.label,
                sessions: None,
                message: Some(message),
            },
        }
    }
}

/// Write `sheets` as a pretty-printed JSON array, in order.
pub fn write_json(path: &Path, sheets: &[OutputSheet<'_>]) -> Result<()> {
    let doc: Vec<JsonSheet<'_>> = sheets.iter().map(JsonSheet::from).collect();
    let json = serde_json::to_string_pretty(&doc)?;
    std::fs::write(path, json)?;
    info!("Wrote JSON results for {} input(s) to {}", sheets.len(), path.display());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
