//! Async batch orchestrator.
//!
//! Runs the session pipeline for every input on tokio's blocking pool, a
//! bounded number at a time, and reports progress through an `mpsc` channel
//! so the caller can log or display it while the batch is running.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use session_core::error::Result;
use session_core::formatting::{sheet_label, unique_label};
use session_core::models::{NoResultReason, SessionTable, TransformOutcome};
use session_data::analysis::analyze_file;
use session_data::writer::OutputSheet;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Progress updates buffered before the batch task waits on the consumer.
const PROGRESS_BUFFER: usize = 16;

// ── Public types ──────────────────────────────────────────────────────────────

/// One input file together with its output label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInput {
    pub path: PathBuf,
    pub label: String,
}

/// Attach a unique label to every input, in order.
pub fn plan_inputs(paths: Vec<PathBuf>) -> Vec<BatchInput> {
    let mut planned: Vec<BatchInput> = Vec::with_capacity(paths.len());
    for (index, path) in paths.into_iter().enumerate() {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let label = unique_label(
            &sheet_label(&file_name, index),
            planned.iter().map(|p| p.label.as_str()),
        );
        planned.push(BatchInput { path, label });
    }
    planned
}

/// A progress snapshot: overall completion plus a short status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub percent: u8,
    pub status: String,
}

/// What became of one input.
#[derive(Debug, Clone, PartialEq)]
pub enum InputOutcome {
    Sessions(SessionTable),
    NoResult(NoResultReason),
    /// The input failed; holds the error message.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputReport {
    pub label: String,
    pub path: PathBuf,
    pub outcome: InputOutcome,
}

/// Every input's outcome, in input order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub inputs: Vec<InputReport>,
    pub generated_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, InputOutcome::Sessions(_)))
    }

    pub fn no_result(&self) -> usize {
        self.count(|o| matches!(o, InputOutcome::NoResult(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, InputOutcome::Failed(_)))
    }

    /// Output sheets for the writer, one per input.
    pub fn sheets(&self) -> Vec<OutputSheet<'_>> {
        self.inputs
            .iter()
            .map(|input| match &input.outcome {
                InputOutcome::Sessions(table) => OutputSheet::sessions(&input.label, table),
                InputOutcome::NoResult(_) => OutputSheet::no_data(&input.label),
                InputOutcome::Failed(detail) => OutputSheet::failed(&input.label, detail),
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&InputOutcome) -> bool) -> usize {
        self.inputs.iter().filter(|i| pred(&i.outcome)).count()
    }
}

// ── BatchOrchestrator ─────────────────────────────────────────────────────────

/// Background batch coordinator.
///
/// Call [`BatchOrchestrator::start`] to process the inputs in a dedicated
/// tokio task and receive a channel endpoint for [`ProgressUpdate`]s.
pub struct BatchOrchestrator {
    inputs: Vec<BatchInput>,
    /// Per-input limit; `None` waits indefinitely.
    input_timeout: Option<Duration>,
    /// Inputs allowed on the blocking pool at once.
    max_concurrent: usize,
}

impl BatchOrchestrator {
    pub fn new(inputs: Vec<BatchInput>, input_timeout: Option<Duration>) -> Self {
        Self {
            inputs,
            input_timeout,
            max_concurrent: 1,
        }
    }

    /// Allow up to `limit` inputs to be processed at the same time.
    pub fn with_max_concurrent(mut self, limit: usize) -> Self {
        self.max_concurrent = limit.max(1);
        self
    }

    /// Start processing.
    ///
    /// At most `max_concurrent` inputs run at once; results are collected in
    /// input order. Returns the progress receiver and a [`BatchHandle`]
    /// resolving to the [`BatchReport`].
    pub fn start(self) -> (mpsc::Receiver<ProgressUpdate>, BatchHandle) {
        let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
        let slots = Arc::new(Semaphore::new(self.max_concurrent));
        let batch_slots = Arc::clone(&slots);
        let handle = tokio::spawn(async move { self.run(tx, batch_slots).await });
        (rx, BatchHandle { handle, slots })
    }

    // ── Private implementation ────────────────────────────────────────────

    async fn run(self, tx: mpsc::Sender<ProgressUpdate>, slots: Arc<Semaphore>) -> BatchReport {
        let total = self.inputs.len();
        info!(
            "Processing {} input(s), {} at a time",
            total, self.max_concurrent
        );

        let limit = self.input_timeout;
        let workers: Vec<(BatchInput, JoinHandle<InputOutcome>)> = self
            .inputs
            .into_iter()
            .map(|input| {
                let path = input.path.clone();
                let slots = Arc::clone(&slots);
                let worker =
                    tokio::spawn(run_input(move || analyze_file(&path), slots, limit));
                (input, worker)
            })
            .collect();

        let mut reports = Vec::with_capacity(total);
        for (processed, (input, worker)) in workers.into_iter().enumerate() {
            send(&tx, percent(processed, total), format!("processing: {}", input.label)).await;

            let outcome = worker.await.unwrap_or_else(|join_err| {
                InputOutcome::Failed(format!("worker stopped: {}", join_err))
            });
            let status = match &outcome {
                InputOutcome::Sessions(table) => {
                    info!("{}: {} session(s)", input.label, table.len());
                    format!("finished: {}", input.label)
                }
                InputOutcome::NoResult(reason) => {
                    info!("{}: no valid data ({})", input.label, reason);
                    format!("no valid data: {}", input.label)
                }
                InputOutcome::Failed(err) => {
                    warn!("{}: {}", input.label, err);
                    format!("failed: {}: {}", input.label, err)
                }
            };
            send(&tx, percent(processed + 1, total), status).await;

            reports.push(InputReport {
                label: input.label,
                path: input.path,
                outcome,
            });
        }

        send(&tx, 100, "all inputs processed".to_string()).await;
        BatchReport {
            inputs: reports,
            generated_at: Utc::now(),
        }
    }
}

/// Run one input's `job` on the blocking pool once a slot is free.
///
/// The timeout clock starts when the slot is acquired. The slot is held until
/// the blocking work returns, even if the input has already timed out.
async fn run_input<F>(job: F, slots: Arc<Semaphore>, limit: Option<Duration>) -> InputOutcome
where
    F: FnOnce() -> Result<TransformOutcome> + Send + 'static,
{
    let permit = match slots.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return InputOutcome::Failed("batch closed".to_string()),
    };

    let worker = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        job()
    });

    let joined = match limit {
        Some(limit) => match tokio::time::timeout(limit, worker).await {
            Ok(joined) => joined,
            Err(_) => {
                return InputOutcome::Failed(format!(
                    "timed out after {}s",
                    limit.as_secs_f64()
                ));
            }
        },
        None => worker.await,
    };

    match joined {
        Ok(Ok(TransformOutcome::Sessions(table))) => InputOutcome::Sessions(table),
        Ok(Ok(TransformOutcome::NoResult(reason))) => InputOutcome::NoResult(reason),
        Ok(Err(err)) => InputOutcome::Failed(err.to_string()),
        Err(join_err) => InputOutcome::Failed(format!("worker stopped: {}", join_err)),
    }
}

// ── BatchHandle ───────────────────────────────────────────────────────────────

/// A handle to the background batch task.
pub struct BatchHandle {
    handle: JoinHandle<BatchReport>,
    slots: Arc<Semaphore>,
}

impl BatchHandle {
    /// Wait for the batch to finish.
    pub async fn join(self) -> Result<BatchReport> {
        let report = self.handle.await.map_err(std::io::Error::from)?;
        Ok(report)
    }

    /// Stop collecting results. Inputs still waiting for a slot are never
    /// started; inputs already on the blocking pool run to completion in the
    /// background.
    pub fn abort(&self) {
        self.slots.close();
        self.handle.abort();
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (processed * 100 / total) as u8
}

async fn send(tx: &mpsc::Sender<ProgressUpdate>, percent: u8, status: String) {
    debug!("progress {}%: {}", percent, status);
    if tx.send(ProgressUpdate { percent, status }).await.is_err() {
        debug!("progress receiver dropped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    const GOOD: &[&str] = &[
        r#"{"serial_no":"AP","mac":"AA","signal":-50,"tx_rate":10,"rx_rate":5,"create_time":"2024-01-15 10:00:00","user":null}"#,
        r#"{"serial_no":"AP","mac":"AA","signal":-60,"tx_rate":20,"rx_rate":7,"create_time":"2024-01-15 10:04:59","user":null}"#,
    ];

    const CLIENTS_ONLY: &[&str] = &[
        r#"{"serial_no":"AP","mac":"AA","signal":-50,"tx_rate":10,"rx_rate":5,"create_time":"2024-01-15 10:00:00","user":"erin"}"#,
    ];

    const BAD_TIME: &[&str] = &[
        r#"{"serial_no":"AP","mac":"AA","signal":-50,"tx_rate":10,"rx_rate":5,"create_time":"yesterday","user":null}"#,
    ];

    fn write_jsonl(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    async fn run(inputs: Vec<BatchInput>) -> (Vec<ProgressUpdate>, BatchReport) {
        let (mut rx, handle) = BatchOrchestrator::new(inputs, None)
            .with_max_concurrent(2)
            .start();
        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }
        (updates, handle.join().await.unwrap())
    }

    // ── plan_inputs ───────────────────────────────────────────────────────

    #[test]
    fn test_plan_inputs_labels_unique_in_order() {
        let planned = plan_inputs(vec![
            PathBuf::from("/data/north/site.xlsx"),
            PathBuf::from("/data/south/site.xlsx"),
            PathBuf::from("/data/SITE.jsonl"),
            PathBuf::from("/data/???.jsonl"),
        ]);
        let labels: Vec<&str> = planned.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["site", "site_2", "SITE_3", "jsonl"]);
        assert_eq!(planned[1].path, PathBuf::from("/data/south/site.xlsx"));
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 66);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 100);
    }

    // ── BatchOrchestrator ─────────────────────────────────────────────────

    #[tokio::test]
    async fn test_batch_reports_every_outcome_in_order() {
        let dir = TempDir::new().unwrap();
        let inputs = plan_inputs(vec![
            write_jsonl(dir.path(), "good.jsonl", GOOD),
            write_jsonl(dir.path(), "clients.jsonl", CLIENTS_ONLY),
            write_jsonl(dir.path(), "bad.jsonl", BAD_TIME),
        ]);

        let (updates, report) = run(inputs).await;

        assert_eq!(report.inputs.len(), 3);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.no_result(), 1);
        assert_eq!(report.failed(), 1);

        match &report.inputs[0].outcome {
            InputOutcome::Sessions(table) => {
                assert_eq!(table.len(), 1);
                assert_eq!(table.sessions[0].avg_signal, -55.0);
                assert_eq!(table.sessions[0].duration_hours, 0.08);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            report.inputs[1].outcome,
            InputOutcome::NoResult(NoResultReason::NoValidRows)
        );
        match &report.inputs[2].outcome {
            InputOutcome::Failed(msg) => assert!(msg.contains("yesterday"), "{msg}"),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let statuses: Vec<&str> = updates.iter().map(|u| u.status.as_str()).collect();
        assert_eq!(statuses[0], "processing: good");
        assert_eq!(statuses[1], "finished: good");
        assert_eq!(statuses[3], "no valid data: clients");
        assert!(statuses[5].starts_with("failed: bad: "));
        assert_eq!(statuses.last(), Some(&"all inputs processed"));

        let percents: Vec<u8> = updates.iter().map(|u| u.percent).collect();
        assert_eq!(percents, vec![0, 33, 33, 66, 66, 100, 100]);
    }

    #[tokio::test]
    async fn test_batch_larger_than_slot_count_keeps_order() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = (0..5)
            .map(|i| write_jsonl(dir.path(), &format!("site{i}.jsonl"), GOOD))
            .collect();
        let (mut rx, handle) = BatchOrchestrator::new(plan_inputs(paths), None)
            .with_max_concurrent(1)
            .start();
        while rx.recv().await.is_some() {}
        let report = handle.join().await.unwrap();

        let labels: Vec<&str> = report.inputs.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["site0", "site1", "site2", "site3", "site4"]);
        assert_eq!(report.succeeded(), 5);
    }

    #[tokio::test]
    async fn test_empty_batch_finishes_immediately() {
        let (updates, report) = run(Vec::new()).await;
        assert!(report.inputs.is_empty());
        assert_eq!(
            updates,
            vec![ProgressUpdate {
                percent: 100,
                status: "all inputs processed".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_reported_as_failure() {
        let dir = TempDir::new().unwrap();
        let inputs = plan_inputs(vec![dir.path().join("vanished.jsonl")]);
        let (_, report) = run(inputs).await;
        assert_eq!(report.failed(), 1);
        assert_eq!(report.inputs[0].label, "vanished");
    }

    #[tokio::test]
    async fn test_report_sheets_follow_outcomes() {
        let dir = TempDir::new().unwrap();
        let inputs = plan_inputs(vec![
            write_jsonl(dir.path(), "good.jsonl", GOOD),
            write_jsonl(dir.path(), "clients.jsonl", CLIENTS_ONLY),
        ]);
        let (_, report) = run(inputs).await;

        let sheets = report.sheets();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].label, "good");
        assert_eq!(sheets[1], OutputSheet::no_data("clients"));

        let out = dir.path().join("out.xlsx");
        session_data::writer::write_workbook(&out, &sheets).unwrap();
        assert!(out.exists());
    }

    // ── run_input ─────────────────────────────────────────────────────────

    fn slow_job(millis: u64) -> impl FnOnce() -> Result<TransformOutcome> + Send + 'static {
        move || {
            std::thread::sleep(Duration::from_millis(millis));
            Ok(TransformOutcome::NoResult(NoResultReason::EmptyInput))
        }
    }

    #[tokio::test]
    async fn test_run_input_times_out() {
        let slots = Arc::new(Semaphore::new(1));
        let outcome = run_input(slow_job(1_000), slots, Some(Duration::from_millis(50))).await;
        assert_eq!(outcome, InputOutcome::Failed("timed out after 0.05s".to_string()));
    }

    #[tokio::test]
    async fn test_run_input_timer_starts_when_slot_is_acquired() {
        let slots = Arc::new(Semaphore::new(1));
        let limit = Some(Duration::from_millis(1_500));

        // Both jobs are queued together; the second waits ~600ms for the slot
        // and still gets its full limit.
        let first = tokio::spawn(run_input(slow_job(600), Arc::clone(&slots), limit));
        let second = tokio::spawn(run_input(slow_job(1_100), Arc::clone(&slots), limit));

        let expected = InputOutcome::NoResult(NoResultReason::EmptyInput);
        assert_eq!(first.await.unwrap(), expected);
        assert_eq!(second.await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_run_input_after_close_never_starts() {
        let slots = Arc::new(Semaphore::new(1));
        slots.close();
        let job = || -> Result<TransformOutcome> { panic!("job must not run") };
        let outcome = run_input(job, slots, None).await;
        assert_eq!(outcome, InputOutcome::Failed("batch closed".to_string()));
    }

    #[tokio::test]
    async fn test_run_input_reports_job_error() {
        let slots = Arc::new(Semaphore::new(1));
        let job = || -> Result<TransformOutcome> {
            Err(session_core::error::SessionError::MissingColumn("mac".to_string()))
        };
        let outcome = run_input(job, slots, None).await;
        assert_eq!(
            outcome,
            InputOutcome::Failed("Missing required column: mac".to_string())
        );
    }
}
