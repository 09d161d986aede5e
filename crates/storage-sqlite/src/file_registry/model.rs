//! Database models for the file registry and raw activity rows.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use sleepscope_core::activity::RawActivitySample;
use sleepscope_core::file_registry::{FileRegistryEntry, ImportStatus, NewFileRegistration};
use sleepscope_core::validation::{
    format_timestamp, parse_stored_date, parse_stored_timestamp,
};
use sleepscope_core::Error;

/// Database model for `file_registry`
#[derive(Queryable, Selectable, Identifiable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::file_registry)]
#[diesel(primary_key(filename))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct FileRegistryDB {
    pub filename: String,
    pub file_hash: String,
    pub participant_key: String,
    pub participant_id: String,
    pub participant_group: String,
    pub participant_timepoint: String,
    pub file_size: i64,
    pub date_range_start: Option<String>,
    pub date_range_end: Option<String>,
    pub total_records: i64,
    pub last_modified: Option<String>,
    pub import_date: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
}

/// Row written when an import starts.
#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::file_registry)]
#[diesel(treat_none_as_null = true, treat_none_as_default_value = false)]
pub struct NewFileRegistryDB {
    pub filename: String,
    pub file_hash: String,
    pub participant_key: String,
    pub participant_id: String,
    pub participant_group: String,
    pub participant_timepoint: String,
    pub file_size: i64,
    pub date_range_start: Option<String>,
    pub date_range_end: Option<String>,
    pub total_records: i64,
    pub last_modified: Option<String>,
    pub import_date: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
}

impl From<&NewFileRegistration> for NewFileRegistryDB {
    fn from(registration: &NewFileRegistration) -> Self {
        Self {
            filename: registration.filename.clone(),
            file_hash: registration.file_hash.clone(),
            participant_key: registration.participant.key.clone(),
            participant_id: registration.participant.numerical_id.clone(),
            participant_group: registration.participant.group.clone(),
            participant_timepoint: registration.participant.timepoint.clone(),
            file_size: registration.file_size,
            date_range_start: None,
            date_range_end: None,
            total_records: 0,
            last_modified: registration.last_modified.as_ref().map(format_timestamp),
            import_date: None,
            status: ImportStatus::Importing.as_str().to_string(),
            error_message: None,
        }
    }
}

impl TryFrom<FileRegistryDB> for FileRegistryEntry {
    type Error = Error;

    fn try_from(db: FileRegistryDB) -> Result<Self, Self::Error> {
        Ok(Self {
            date_range_start: db.date_range_start.as_deref().map(parse_stored_date).transpose()?,
            date_range_end: db.date_range_end.as_deref().map(parse_stored_date).transpose()?,
            last_modified: db
                .last_modified
                .as_deref()
                .map(parse_stored_timestamp)
                .transpose()?,
            import_date: db.import_date.as_deref().map(parse_stored_timestamp).transpose()?,
            status: db.status.parse()?,
            filename: db.filename,
            file_hash: db.file_hash,
            participant_key: db.participant_key,
            participant_id: db.participant_id,
            participant_group: db.participant_group,
            participant_timepoint: db.participant_timepoint,
            file_size: db.file_size,
            total_records: db.total_records,
            error_message: db.error_message,
        })
    }
}

/// One raw activity row as inserted during an import commit.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::raw_activity_data)]
#[diesel(treat_none_as_default_value = false)]
pub struct NewRawActivityDB {
    pub filename: String,
    pub participant_key: String,
    pub timestamp: String,
    pub axis_y: Option<f64>,
    pub axis_x: Option<f64>,
    pub axis_z: Option<f64>,
    pub vector_magnitude: Option<f64>,
}

/// Bound parameters per `NewRawActivityDB` row.
pub const RAW_ACTIVITY_INSERT_PARAMS: usize = 7;

impl From<&RawActivitySample> for NewRawActivityDB {
    fn from(sample: &RawActivitySample) -> Self {
        Self {
            filename: sample.filename.clone(),
            participant_key: sample.participant_key.clone(),
            timestamp: format_timestamp(&sample.timestamp),
            axis_y: sample.axis_y,
            axis_x: sample.axis_x,
            axis_z: sample.axis_z,
            vector_magnitude: sample.vector_magnitude,
        }
    }
}
