//! Sub-command handlers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sleepscope_core::import::{
    BulkImportResult, FileImportResult, ImportOptions, ImportProgress, ImportStage, ProgressSink,
};

use crate::main_lib::AppState;

pub async fn import_file(
    state: &AppState,
    path: PathBuf,
    options: ImportOptions,
) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::unbounded_channel::<ImportProgress>();
    let reporter = tokio::spawn(report_progress(rx));

    let importer = state.import_service.clone();
    let result = tokio::task::spawn_blocking(move || importer.import_file(&path, &options, &tx))
        .await
        .context("Import worker panicked")?;
    let _ = reporter.await;

    print_file_result(&result?);
    Ok(())
}

pub async fn import_directory(
    state: &AppState,
    path: PathBuf,
    options: ImportOptions,
) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::unbounded_channel::<ImportProgress>();
    let reporter = tokio::spawn(report_progress(rx));
    let cancel = CancellationToken::new();

    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current file");
                cancel.cancel();
            }
        })
    };

    let progress: Arc<dyn ProgressSink> = Arc::new(tx);
    let handle = state
        .import_service
        .clone()
        .spawn_import_directory(path, options, progress, cancel);
    let result = handle.await.context("Import worker panicked")?;
    ctrl_c.abort();
    let _ = reporter.await;

    let result = result?;
    print_bulk_result(&result);
    if result.failed > 0 {
        bail!("{} of {} files failed to import", result.failed, result.files_found);
    }
    Ok(())
}

async fn report_progress(mut rx: mpsc::UnboundedReceiver<ImportProgress>) {
    while let Some(progress) = rx.recv().await {
        match progress.stage {
            ImportStage::BatchWriting => info!(
                "[{}/{}] {}: {}/{} rows",
                progress.file_index,
                progress.file_count,
                progress.filename,
                progress.rows_written,
                progress.rows_total
            ),
            ImportStage::Committed | ImportStage::Skipped | ImportStage::RolledBack => info!(
                "[{}/{}] {}: {:?}",
                progress.file_index, progress.file_count, progress.filename, progress.stage
            ),
            _ => {}
        }
    }
}

fn print_file_result(result: &FileImportResult) {
    if result.skipped() {
        println!("{}: unchanged, skipped", result.filename);
        return;
    }
    println!(
        "{}: {} rows imported, {} dropped (participant {})",
        result.filename, result.rows_imported, result.rows_dropped, result.participant.key
    );
    for superseded in &result.superseded_files {
        println!("  replaced {}", superseded);
    }
    for warning in &result.warnings {
        println!("  warning: {}", warning);
    }
}

fn print_bulk_result(result: &BulkImportResult) {
    for file in &result.results {
        print_file_result(file);
    }
    for failure in &result.failures {
        println!("{}: FAILED {}", failure.path.display(), failure.error);
    }
    println!(
        "{} files: {} imported, {} skipped, {} failed{}",
        result.files_found,
        result.imported,
        result.skipped,
        result.failed,
        if result.cancelled { " (cancelled)" } else { "" }
    );
}

pub fn list_files(state: &AppState, json: bool) -> anyhow::Result<()> {
    let files = state.storage_service.get_available_files()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }
    for file in &files {
        let range = match (file.date_range_start, file.date_range_end) {
            (Some(start), Some(end)) => format!("{} .. {}", start, end),
            _ => "-".to_string(),
        };
        println!(
            "{:<40} {:<16} {:>8} rows  {}",
            file.filename, file.participant_key, file.total_records, range
        );
    }
    let stats = state.storage_service.get_import_statistics()?;
    println!(
        "{} files ({} imported, {} importing, {} failed), {} activity rows",
        stats.total_files,
        stats.imported_files,
        stats.importing_files,
        stats.error_files,
        stats.total_activity_rows
    );
    Ok(())
}

pub fn list_dates(state: &AppState, filename: &str) -> anyhow::Result<()> {
    let dates = state.storage_service.get_file_date_ranges(filename)?;
    if dates.is_empty() {
        bail!("No activity data stored for {}", filename);
    }
    for date in dates {
        println!("{}", date);
    }
    Ok(())
}

pub fn delete_file(state: &AppState, filename: &str) -> anyhow::Result<()> {
    let summary = state.storage_service.delete_imported_file(filename)?;
    for (table, rows) in &summary.rows_deleted {
        println!("{:<28} {}", table, rows);
    }
    println!("Deleted {} rows for {}", summary.total(), summary.filename);
    Ok(())
}

pub fn export(state: &AppState, output: Option<&Path>) -> anyhow::Result<()> {
    let rows = state.storage_service.get_all_sleep_data_for_export()?;
    let body = serde_json::to_string_pretty(&rows)?;
    match output {
        Some(path) => {
            fs::write(path, body).with_context(|| format!("Cannot write {}", path.display()))?;
            info!("Exported {} records to {}", rows.len(), path.display());
        }
        None => println!("{}", body),
    }
    Ok(())
}
