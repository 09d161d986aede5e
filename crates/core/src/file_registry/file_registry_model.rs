//! File registry domain models.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, ValidationError};
use crate::participant::ParticipantInfo;

/// Lifecycle of an imported file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Importing,
    Imported,
    Error,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Importing => "importing",
            ImportStatus::Imported => "imported",
            ImportStatus::Error => "error",
        }
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "importing" => Ok(ImportStatus::Importing),
            "imported" => Ok(ImportStatus::Imported),
            "error" => Ok(ImportStatus::Error),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown import status '{}'",
                other
            ))
            .into()),
        }
    }
}

/// One row of `file_registry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRegistryEntry {
    pub filename: String,
    pub file_hash: String,
    pub participant_key: String,
    pub participant_id: String,
    pub participant_group: String,
    pub participant_timepoint: String,
    pub file_size: i64,
    pub date_range_start: Option<NaiveDate>,
    pub date_range_end: Option<NaiveDate>,
    pub total_records: i64,
    pub last_modified: Option<NaiveDateTime>,
    pub import_date: Option<NaiveDateTime>,
    pub status: ImportStatus,
    pub error_message: Option<String>,
}

/// Registration written at import start with status `importing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFileRegistration {
    pub filename: String,
    pub file_hash: String,
    pub participant: ParticipantInfo,
    pub file_size: i64,
    pub last_modified: Option<NaiveDateTime>,
}

/// Identifies the file whose batches are being committed.
///
/// The fingerprint fields reach the registry row only when the commit
/// succeeds, so a failed re-import leaves the previous ones in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportCommit {
    pub filename: String,
    pub participant_key: String,
    pub file_hash: String,
    pub file_size: i64,
    pub last_modified: Option<NaiveDateTime>,
    pub import_date: NaiveDateTime,
}

impl ImportCommit {
    pub fn new(registration: &NewFileRegistration, import_date: NaiveDateTime) -> Self {
        Self {
            filename: registration.filename.clone(),
            participant_key: registration.participant.key.clone(),
            file_hash: registration.file_hash.clone(),
            file_size: registration.file_size,
            last_modified: registration.last_modified,
            import_date,
        }
    }
}

/// What a committed import transaction changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    pub rows_written: usize,
    pub batches_written: usize,
    /// Other filenames of the same participant that were replaced
    pub superseded_files: Vec<String>,
    pub date_range_start: Option<NaiveDate>,
    pub date_range_end: Option<NaiveDate>,
}

/// Rows removed per table by a cascading file delete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDeletionSummary {
    pub filename: String,
    pub rows_deleted: Vec<(String, usize)>,
}

impl FileDeletionSummary {
    pub fn total(&self) -> usize {
        self.rows_deleted.iter().map(|(_, n)| n).sum()
    }

    pub fn deleted_from(&self, table: &str) -> usize {
        self.rows_deleted
            .iter()
            .find(|(t, _)| t == table)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Aggregate registry counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatistics {
    pub total_files: i64,
    pub imported_files: i64,
    pub importing_files: i64,
    pub error_files: i64,
    pub total_activity_rows: i64,
}

/// Summary of an imported file offered to callers choosing what to analyze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableFile {
    pub filename: String,
    pub participant_key: String,
    pub participant_id: String,
    pub participant_group: String,
    pub participant_timepoint: String,
    pub date_range_start: Option<NaiveDate>,
    pub date_range_end: Option<NaiveDate>,
    pub total_records: i64,
    pub import_date: Option<NaiveDateTime>,
}

impl From<FileRegistryEntry> for AvailableFile {
    fn from(entry: FileRegistryEntry) -> Self {
        Self {
            filename: entry.filename,
            participant_key: entry.participant_key,
            participant_id: entry.participant_id,
            participant_group: entry.participant_group,
            participant_timepoint: entry.participant_timepoint,
            date_range_start: entry.date_range_start,
            date_range_end: entry.date_range_end,
            total_records: entry.total_records,
            import_date: entry.import_date,
        }
    }
}
