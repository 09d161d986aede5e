use chrono::{DateTime, Local, NaiveDateTime};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::constants::SUPPORTED_EXTENSIONS;
use crate::errors::{Error, ImportError, Result, ValidationError};
use crate::file_registry::{FileRegistryEntry, ImportCommit, ImportStatus, NewFileRegistration};
use crate::import::columns::identify_columns;
use crate::import::fingerprint::compute_file_hash;
use crate::import::import_model::{
    BulkImportResult, ChangeDecision, FileImportResult, ImportOptions, ImportProgress,
    ImportReason, ImportStage, ProgressSink,
};
use crate::import::reader::{read_delimited, ReadConfig};
use crate::import::samples::SampleBatches;
use crate::import::timestamps::{check_epoch, parse_timestamps};
use crate::participant::extract_participant_info;
use crate::schema_guard::validate_import_path;
use crate::storage::StorageService;
use crate::validation::require_text;

/// Decides whether a file needs importing given what the registry holds
/// for its participant key.
pub fn decide_change(
    existing: Option<&FileRegistryEntry>,
    filename: &str,
    file_hash: &str,
    force_reimport: bool,
) -> ChangeDecision {
    if force_reimport {
        return ChangeDecision::Import(ImportReason::Forced);
    }
    match existing {
        None => ChangeDecision::Import(ImportReason::New),
        Some(entry) if entry.filename != filename => {
            ChangeDecision::Import(ImportReason::Superseded)
        }
        Some(entry) if entry.status != ImportStatus::Imported => {
            ChangeDecision::Import(ImportReason::PreviousError)
        }
        Some(entry) if entry.file_hash != file_hash => ChangeDecision::Import(ImportReason::Changed),
        Some(_) => ChangeDecision::Skip,
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn last_modified(metadata: &std::fs::Metadata) -> Option<NaiveDateTime> {
    metadata
        .modified()
        .ok()
        .map(|t| DateTime::<Local>::from(t).naive_local())
}

/// Tracks where a file sits within the current run for progress reports.
struct FileContext<'a> {
    filename: &'a str,
    file_index: usize,
    file_count: usize,
    progress: &'a dyn ProgressSink,
}

impl FileContext<'_> {
    fn stage(&self, stage: ImportStage, rows_written: usize, rows_total: usize) {
        debug!("{}: {:?}", self.filename, stage);
        self.progress.report(ImportProgress {
            filename: self.filename.to_string(),
            stage,
            file_index: self.file_index,
            file_count: self.file_count,
            rows_written,
            rows_total,
        });
    }
}

/// Imports device exports into storage.
pub struct ImportService {
    storage: Arc<StorageService>,
}

impl ImportService {
    pub fn new(storage: Arc<StorageService>) -> Self {
        Self { storage }
    }

    /// Imports a single file.
    pub fn import_file(
        &self,
        path: &Path,
        options: &ImportOptions,
        progress: &dyn ProgressSink,
    ) -> Result<FileImportResult> {
        self.import_one(path, options, progress, 1, 1)
    }

    /// Imports every supported file in `dir`.
    ///
    /// Per-file failures are collected in the result. A storage
    /// infrastructure failure stops the run and is returned as `Err`. The
    /// token is checked between files only, so a file that started always
    /// finishes or rolls back.
    pub fn import_directory(
        &self,
        dir: &Path,
        options: &ImportOptions,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BulkImportResult> {
        let files = discover_files(dir, options.recursive)?;
        let file_count = files.len();
        info!("Found {} importable files in {}", file_count, dir.display());

        let mut result = BulkImportResult {
            files_found: file_count,
            ..Default::default()
        };

        for (idx, path) in files.into_iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Import cancelled after {} of {} files", idx, file_count);
                result.cancelled = true;
                break;
            }

            match self.import_one(&path, options, progress, idx + 1, file_count) {
                Ok(file_result) => result.record(file_result),
                Err(e) if e.is_infrastructure() => {
                    error!("Aborting directory import at {}: {}", path.display(), e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Failed to import {}: {}", path.display(), e);
                    result.record_failure(path, e.to_string());
                }
            }
        }

        info!(
            "Directory import finished: {} imported, {} skipped, {} failed",
            result.imported, result.skipped, result.failed
        );
        Ok(result)
    }

    /// Runs [`ImportService::import_directory`] on the blocking thread pool.
    pub fn spawn_import_directory(
        self: Arc<Self>,
        dir: PathBuf,
        options: ImportOptions,
        progress: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<BulkImportResult>> {
        tokio::task::spawn_blocking(move || {
            self.import_directory(&dir, &options, progress.as_ref(), &cancel)
        })
    }

    fn import_one(
        &self,
        path: &Path,
        options: &ImportOptions,
        progress: &dyn ProgressSink,
        file_index: usize,
        file_count: usize,
    ) -> Result<FileImportResult> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                ValidationError::InvalidInput(format!("{} has no file name", path.display()))
            })?;
        require_text("filename", &filename)?;

        let ctx = FileContext {
            filename: &filename,
            file_index,
            file_count,
            progress,
        };
        ctx.stage(ImportStage::Discovered, 0, 0);

        if !is_supported(path) {
            return Err(ImportError::UnsupportedFormat(filename.clone()).into());
        }
        let metadata = std::fs::metadata(path)?;
        if metadata.len() > options.max_file_size {
            return Err(ImportError::FileTooLarge {
                size: metadata.len(),
                limit: options.max_file_size,
            }
            .into());
        }
        if metadata.len() == 0 {
            return Err(ImportError::Parse(format!("{} is empty", filename)).into());
        }
        ctx.stage(ImportStage::SizeValidated, 0, 0);

        let file_hash = compute_file_hash(path)?;
        ctx.stage(ImportStage::HashComputed, 0, 0);

        let participant = extract_participant_info(&filename);
        let existing = self.storage.find_file_by_participant(&participant.key)?;
        let decision = decide_change(
            existing.as_ref(),
            &filename,
            &file_hash,
            options.force_reimport,
        );

        let mut result = FileImportResult {
            filename: filename.clone(),
            participant: participant.clone(),
            file_hash: file_hash.clone(),
            decision: decision.clone(),
            rows_imported: 0,
            rows_dropped: 0,
            superseded_files: Vec::new(),
            warnings: Vec::new(),
        };

        let reason = match decision {
            ChangeDecision::Skip => {
                info!("{} is unchanged, skipping", filename);
                ctx.stage(ImportStage::Skipped, 0, 0);
                return Ok(result);
            }
            ChangeDecision::Import(reason) => reason,
        };
        info!("Importing {} ({}) as {}", filename, reason, participant.key);

        let content = std::fs::read(path)?;
        let table = read_delimited(
            &content,
            &ReadConfig {
                skip_rows: options.skip_rows,
                delimiter: options.delimiter,
            },
        )?;
        result.warnings.extend(table.warnings);

        let mapping = identify_columns(&table.headers, &table.rows, &options.column_overrides)?;
        ctx.stage(ImportStage::ColumnsIdentified, 0, 0);

        let parsed = parse_timestamps(table.rows, mapping.timestamp)?;
        if parsed.unparsable > 0 {
            result.warnings.push(format!(
                "{} rows dropped with unparsable timestamps",
                parsed.unparsable
            ));
        }
        if parsed.duplicates > 0 {
            result.warnings.push(format!(
                "{} rows dropped with duplicate timestamps",
                parsed.duplicates
            ));
        }
        result
            .warnings
            .extend(check_epoch(&parsed.timestamps, options.epoch_seconds));
        let rows_total = parsed.rows.len();
        ctx.stage(ImportStage::TimestampsParsed, 0, rows_total);

        let registration = NewFileRegistration {
            filename: filename.clone(),
            file_hash,
            participant: participant.clone(),
            file_size: i64::try_from(metadata.len()).unwrap_or(i64::MAX),
            last_modified: last_modified(&metadata),
        };
        self.storage.register_importing(&registration)?;
        ctx.stage(ImportStage::Registered, 0, rows_total);

        let commit = ImportCommit::new(&registration, Local::now().naive_local());
        let mut batches = SampleBatches::new(
            &filename,
            &participant.key,
            &mapping,
            &parsed.timestamps,
            &parsed.rows,
            options.batch_size,
        );
        let mut on_batch =
            |written: usize| ctx.stage(ImportStage::BatchWriting, written, rows_total);

        match self.storage.commit_import(&commit, &mut batches, &mut on_batch) {
            Ok(summary) => {
                result.rows_imported = summary.rows_written;
                result.rows_dropped = parsed.unparsable + parsed.duplicates + batches.dropped();
                result.superseded_files = summary.superseded_files;
                ctx.stage(ImportStage::Committed, summary.rows_written, rows_total);
                info!(
                    "Imported {} rows from {} in {} batches",
                    summary.rows_written, filename, summary.batches_written
                );
                Ok(result)
            }
            Err(e) => {
                ctx.stage(ImportStage::RolledBack, 0, rows_total);
                self.record_failure(&filename, &e);
                Err(e)
            }
        }
    }

    /// Marks the registry row as failed after the import transaction rolled
    /// back. Skipped for infrastructure failures, which would fail again.
    fn record_failure(&self, filename: &str, failure: &Error) {
        if failure.is_infrastructure() {
            return;
        }
        if let Err(e) = self.storage.mark_import_error(filename, &failure.to_string()) {
            error!("Could not mark {} as failed: {}", filename, e);
        }
    }
}

/// Supported files under `dir`, sorted by path.
fn discover_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ValidationError::InvalidInput(format!(
            "{} is not a directory",
            dir.display()
        ))
        .into());
    }
    let base = std::fs::canonicalize(dir)?;

    let walker = WalkDir::new(&base)
        .follow_links(false)
        .max_depth(if recursive { usize::MAX } else { 1 });

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_supported(entry.path()) => {
                files.push(validate_import_path(&base, entry.path())?);
            }
            Ok(_) => {}
            Err(e) => warn!("Error accessing entry under {}: {}", base.display(), e),
        }
    }
    files.sort();
    Ok(files)
}
