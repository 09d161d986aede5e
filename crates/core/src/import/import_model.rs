//! Import pipeline models: options, progress, decisions and results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_EPOCH_SECONDS, DEFAULT_MAX_FILE_SIZE, DEFAULT_SKIP_ROWS,
};
use crate::participant::ParticipantInfo;

/// Caller-supplied header names that take precedence over detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnOverrides {
    pub date: Option<String>,
    pub time: Option<String>,
    pub datetime: Option<String>,
    pub activity: Option<String>,
    pub axis_x: Option<String>,
    pub axis_y: Option<String>,
    pub axis_z: Option<String>,
    pub vector_magnitude: Option<String>,
}

/// Options for importing device exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    /// Metadata lines before the header row
    pub skip_rows: usize,
    /// Rows per insert batch
    pub batch_size: usize,
    /// Largest accepted file, in bytes
    pub max_file_size: u64,
    /// Field delimiter; auto-detected among `,` `;` `\t` when `None`
    pub delimiter: Option<char>,
    /// Expected sampling interval
    pub epoch_seconds: i64,
    pub column_overrides: ColumnOverrides,
    /// Import even when the registry says the file is unchanged
    pub force_reimport: bool,
    /// Descend into subdirectories on directory import
    pub recursive: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            skip_rows: DEFAULT_SKIP_ROWS,
            batch_size: DEFAULT_BATCH_SIZE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            delimiter: None,
            epoch_seconds: DEFAULT_EPOCH_SECONDS,
            column_overrides: ColumnOverrides::default(),
            force_reimport: false,
            recursive: false,
        }
    }
}

/// Why a file is being imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportReason {
    /// Nothing registered for the participant key
    New,
    /// Same filename, different content
    Changed,
    /// The last attempt for this filename did not finish
    PreviousError,
    /// A different file is registered for the participant key
    Superseded,
    Forced,
}

impl fmt::Display for ImportReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportReason::New => "new",
            ImportReason::Changed => "changed",
            ImportReason::PreviousError => "previous error",
            ImportReason::Superseded => "supersedes another file",
            ImportReason::Forced => "forced",
        };
        f.write_str(s)
    }
}

/// Outcome of comparing a file against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "decision", content = "reason")]
pub enum ChangeDecision {
    Skip,
    Import(ImportReason),
}

/// Pipeline stage reported through a [`ProgressSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportStage {
    Discovered,
    SizeValidated,
    HashComputed,
    Skipped,
    ColumnsIdentified,
    TimestampsParsed,
    Registered,
    BatchWriting,
    Committed,
    RolledBack,
}

/// A progress update for one file of an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
    pub filename: String,
    pub stage: ImportStage,
    /// 1-based position of the file within a directory import
    pub file_index: usize,
    pub file_count: usize,
    pub rows_written: usize,
    pub rows_total: usize,
}

/// Receives progress updates. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: ImportProgress);
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _progress: ImportProgress) {}
}

impl ProgressSink for UnboundedSender<ImportProgress> {
    fn report(&self, progress: ImportProgress) {
        // A dropped receiver just means nobody is watching any more.
        let _ = self.send(progress);
    }
}

/// Result of importing (or skipping) one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileImportResult {
    pub filename: String,
    pub participant: ParticipantInfo,
    pub file_hash: String,
    pub decision: ChangeDecision,
    pub rows_imported: usize,
    /// Rows dropped for unparsable or duplicate timestamps or unparsable numeric cells
    pub rows_dropped: usize,
    /// Other filenames of the participant replaced by this import
    pub superseded_files: Vec<String>,
    pub warnings: Vec<String>,
}

impl FileImportResult {
    pub fn skipped(&self) -> bool {
        self.decision == ChangeDecision::Skip
    }
}

/// A file that failed during a directory import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileImportFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Aggregate result of a directory import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportResult {
    pub files_found: usize,
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<FileImportResult>,
    pub failures: Vec<FileImportFailure>,
    /// Set when the cancellation token fired before every file was visited
    pub cancelled: bool,
}

impl BulkImportResult {
    pub(crate) fn record(&mut self, result: FileImportResult) {
        if result.skipped() {
            self.skipped += 1;
        } else {
            self.imported += 1;
        }
        self.results.push(result);
    }

    pub(crate) fn record_failure(&mut self, path: PathBuf, error: String) {
        self.failed += 1;
        self.failures.push(FileImportFailure { path, error });
    }
}
