//! The session pipeline.
//!
//! Runs loading, segmentation, aggregation and assembly over one raw table,
//! returning either a session table or a "no result" outcome.

use std::path::Path;

use session_core::error::{Result, SessionError};
use session_core::models::{NoResultReason, RawTable, SessionTable, TransformOutcome};
use tracing::debug;

use crate::aggregator::SessionAggregator;
use crate::assembler::ResultAssembler;
use crate::loader::load_records;
use crate::reader::read_table;
use crate::segmenter::SessionSegmenter;

// ── Halt ──────────────────────────────────────────────────────────────────────

/// Why a pipeline stage stopped early.
#[derive(Debug)]
pub enum Halt {
    /// Nothing to report; the input is fine but yields no sessions.
    NoResult(NoResultReason),
    /// The input cannot be processed.
    Fatal(SessionError),
}

impl From<NoResultReason> for Halt {
    fn from(reason: NoResultReason) -> Self {
        Halt::NoResult(reason)
    }
}

impl From<SessionError> for Halt {
    fn from(err: SessionError) -> Self {
        Halt::Fatal(err)
    }
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Turn one raw table into its session table.
///
/// Pure and synchronous: no I/O beyond logging, no state kept between calls.
/// The four "nothing to report" conditions come back as
/// [`TransformOutcome::NoResult`]; parse and arithmetic faults are errors.
pub fn transform(table: &RawTable) -> Result<TransformOutcome> {
    match run_pipeline(table) {
        Ok(sessions) => Ok(TransformOutcome::Sessions(sessions)),
        Err(Halt::NoResult(reason)) => {
            debug!("transform produced no result: {}", reason);
            Ok(TransformOutcome::NoResult(reason))
        }
        Err(Halt::Fatal(err)) => Err(err),
    }
}

/// Read the table stored at `path` and transform it.
pub fn analyze_file(path: &Path) -> Result<TransformOutcome> {
    let load_start = std::time::Instant::now();
    let table = read_table(path)?;
    let load_time = load_start.elapsed().as_secs_f64();

    let transform_start = std::time::Instant::now();
    let outcome = transform(&table);
    let transform_time = transform_start.elapsed().as_secs_f64();

    debug!(
        "{}: read {} rows in {:.3}s, transformed in {:.3}s",
        path.display(),
        table.len(),
        load_time,
        transform_time
    );
    outcome
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn run_pipeline(table: &RawTable) -> std::result::Result<SessionTable, Halt> {
    let records = load_records(table)?;

    let segmenter = SessionSegmenter::new();
    let groups = segmenter.group_by_device(records)?;

    let mut assembler = ResultAssembler::new();
    for group in &groups {
        for segment in segmenter.split_sessions(&group.records) {
            assembler.push(SessionAggregator::summarize(&group.mac, segment)?);
        }
    }

    Ok(assembler.finish()?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
