mod bootstrap;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use session_core::settings::Settings;
use session_data::reader::discover_inputs;
use session_data::writer::{write_json, write_workbook};
use session_runtime::orchestrator::{plan_inputs, BatchOrchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("WiFi sessions v{} starting", env!("CARGO_PKG_VERSION"));

    let files = discover_inputs(&settings.inputs);
    if files.is_empty() {
        anyhow::bail!("No .xlsx or .jsonl inputs found");
    }

    let inputs = plan_inputs(files);
    let timeout =
        (settings.input_timeout_secs > 0).then(|| Duration::from_secs(settings.input_timeout_secs));
    let (mut rx, handle) = BatchOrchestrator::new(inputs, timeout)
        .with_max_concurrent(settings.worker_limit())
        .start();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Some(update) => tracing::info!("[{:>3}%] {}", update.percent, update.status),
                None => break,
            },
            _ = &mut ctrl_c => {
                tracing::warn!("Ctrl+C received; abandoning batch");
                handle.abort();
                anyhow::bail!("interrupted");
            }
        }
    }

    let report = handle.join().await?;
    let sheets = report.sheets();

    let output_dir = settings.resolved_output_dir();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    if settings.writes_xlsx() {
        write_workbook(&output_dir.join(&settings.output_name), &sheets)?;
    }
    if settings.writes_json() {
        write_json(&json_output_path(&output_dir, &settings.output_name), &sheets)?;
    }

    tracing::info!(
        "Done: {} with sessions, {} without valid data, {} failed (generated {})",
        report.succeeded(),
        report.no_result(),
        report.failed(),
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    Ok(())
}

/// The JSON export sits next to the workbook, sharing its stem.
fn json_output_path(output_dir: &Path, output_name: &str) -> PathBuf {
    output_dir.join(Path::new(output_name).with_extension("json"))
}
