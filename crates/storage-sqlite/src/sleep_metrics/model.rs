//! Database models for sleep metrics.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use sleepscope_core::sleep_metrics::{AutosaveMetrics, SleepMetricsRecord, SleepPeriod};
use sleepscope_core::validation::{
    format_date, format_timestamp, parse_stored_date, parse_stored_timestamp,
};
use sleepscope_core::Result;

use crate::errors::StorageError;

/// Database model for `sleep_metrics`
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::sleep_metrics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SleepMetricsDB {
    pub id: i32,
    pub filename: String,
    pub participant_key: String,
    pub participant_id: String,
    pub participant_group: String,
    pub participant_timepoint: String,
    pub analysis_date: String,
    pub onset_timestamp: Option<String>,
    pub offset_timestamp: Option<String>,
    pub total_sleep_time: Option<f64>,
    pub sleep_efficiency: Option<f64>,
    pub total_minutes_in_bed: Option<f64>,
    pub waso: Option<f64>,
    pub awakenings: Option<i32>,
    pub average_awakening_length: Option<f64>,
    pub movement_index: Option<f64>,
    pub fragmentation_index: Option<f64>,
    pub sleep_fragmentation_index: Option<f64>,
    pub total_activity: Option<f64>,
    pub non_zero_epochs: Option<i32>,
    pub sleep_algorithm: Option<String>,
    pub period_metrics: String,
    pub updated_at: String,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::sleep_metrics)]
#[diesel(treat_none_as_null = true, treat_none_as_default_value = false)]
pub struct NewSleepMetricsDB {
    pub filename: String,
    pub participant_key: String,
    pub participant_id: String,
    pub participant_group: String,
    pub participant_timepoint: String,
    pub analysis_date: String,
    pub onset_timestamp: Option<String>,
    pub offset_timestamp: Option<String>,
    pub total_sleep_time: Option<f64>,
    pub sleep_efficiency: Option<f64>,
    pub total_minutes_in_bed: Option<f64>,
    pub waso: Option<f64>,
    pub awakenings: Option<i32>,
    pub average_awakening_length: Option<f64>,
    pub movement_index: Option<f64>,
    pub fragmentation_index: Option<f64>,
    pub sleep_fragmentation_index: Option<f64>,
    pub total_activity: Option<f64>,
    pub non_zero_epochs: Option<i32>,
    pub sleep_algorithm: Option<String>,
    pub period_metrics: String,
    pub updated_at: String,
}

impl NewSleepMetricsDB {
    pub fn from_record(record: &SleepMetricsRecord, updated_at: &NaiveDateTime) -> Self {
        Self {
            filename: record.filename.clone(),
            participant_key: record.participant_key.clone(),
            participant_id: record.participant_id.clone(),
            participant_group: record.participant_group.clone(),
            participant_timepoint: record.participant_timepoint.clone(),
            analysis_date: format_date(&record.analysis_date),
            onset_timestamp: record.onset_timestamp.as_ref().map(format_timestamp),
            offset_timestamp: record.offset_timestamp.as_ref().map(format_timestamp),
            total_sleep_time: record.total_sleep_time,
            sleep_efficiency: record.sleep_efficiency,
            total_minutes_in_bed: record.total_minutes_in_bed,
            waso: record.waso,
            awakenings: record.awakenings,
            average_awakening_length: record.average_awakening_length,
            movement_index: record.movement_index,
            fragmentation_index: record.fragmentation_index,
            sleep_fragmentation_index: record.sleep_fragmentation_index,
            total_activity: record.total_activity,
            non_zero_epochs: record.non_zero_epochs,
            sleep_algorithm: record.sleep_algorithm.clone(),
            period_metrics: record.period_metrics.to_string(),
            updated_at: format_timestamp(updated_at),
        }
    }
}

impl SleepMetricsDB {
    /// Builds the domain record, attaching marker rows loaded separately.
    pub fn into_record(self, periods: Vec<SleepPeriod>) -> Result<SleepMetricsRecord> {
        let period_metrics: serde_json::Value =
            serde_json::from_str(&self.period_metrics).map_err(StorageError::from)?;
        Ok(SleepMetricsRecord {
            analysis_date: parse_stored_date(&self.analysis_date)?,
            onset_timestamp: self
                .onset_timestamp
                .as_deref()
                .map(parse_stored_timestamp)
                .transpose()?,
            offset_timestamp: self
                .offset_timestamp
                .as_deref()
                .map(parse_stored_timestamp)
                .transpose()?,
            updated_at: Some(parse_stored_timestamp(&self.updated_at)?),
            filename: self.filename,
            participant_key: self.participant_key,
            participant_id: self.participant_id,
            participant_group: self.participant_group,
            participant_timepoint: self.participant_timepoint,
            total_sleep_time: self.total_sleep_time,
            sleep_efficiency: self.sleep_efficiency,
            total_minutes_in_bed: self.total_minutes_in_bed,
            waso: self.waso,
            awakenings: self.awakenings,
            average_awakening_length: self.average_awakening_length,
            movement_index: self.movement_index,
            fragmentation_index: self.fragmentation_index,
            sleep_fragmentation_index: self.sleep_fragmentation_index,
            total_activity: self.total_activity,
            non_zero_epochs: self.non_zero_epochs,
            sleep_algorithm: self.sleep_algorithm,
            period_metrics,
            periods,
        })
    }
}

/// Database model for `sleep_markers_extended`
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::sleep_markers_extended)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SleepMarkerDB {
    pub id: i32,
    pub filename: String,
    pub analysis_date: String,
    pub marker_index: i32,
    pub marker_type: String,
    pub start_timestamp: Option<String>,
    pub end_timestamp: Option<String>,
    pub created_at: String,
}

impl TryFrom<SleepMarkerDB> for SleepPeriod {
    type Error = sleepscope_core::Error;

    fn try_from(db: SleepMarkerDB) -> std::result::Result<Self, Self::Error> {
        Ok(SleepPeriod {
            marker_index: db.marker_index,
            marker_type: db.marker_type.parse()?,
            onset: db
                .start_timestamp
                .as_deref()
                .map(parse_stored_timestamp)
                .transpose()?,
            offset: db
                .end_timestamp
                .as_deref()
                .map(parse_stored_timestamp)
                .transpose()?,
        })
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::sleep_markers_extended)]
#[diesel(treat_none_as_default_value = false)]
pub struct NewSleepMarkerDB {
    pub filename: String,
    pub analysis_date: String,
    pub marker_index: i32,
    pub marker_type: String,
    pub start_timestamp: Option<String>,
    pub end_timestamp: Option<String>,
    pub created_at: String,
}

impl NewSleepMarkerDB {
    pub fn from_period(
        filename: &str,
        analysis_date: &str,
        period: &SleepPeriod,
        created_at: &NaiveDateTime,
    ) -> Self {
        Self {
            filename: filename.to_string(),
            analysis_date: analysis_date.to_string(),
            marker_index: period.marker_index,
            marker_type: period.marker_type.as_str().to_string(),
            start_timestamp: period.onset.as_ref().map(format_timestamp),
            end_timestamp: period.offset.as_ref().map(format_timestamp),
            created_at: format_timestamp(created_at),
        }
    }
}

/// Database model for `autosave_metrics`
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::autosave_metrics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AutosaveDB {
    pub id: i32,
    pub filename: String,
    pub analysis_date: String,
    pub payload: String,
    pub saved_at: String,
}

impl TryFrom<AutosaveDB> for AutosaveMetrics {
    type Error = sleepscope_core::Error;

    fn try_from(db: AutosaveDB) -> std::result::Result<Self, Self::Error> {
        Ok(AutosaveMetrics {
            analysis_date: parse_stored_date(&db.analysis_date)?,
            payload: serde_json::from_str(&db.payload).map_err(StorageError::from)?,
            saved_at: parse_stored_timestamp(&db.saved_at)?,
            filename: db.filename,
        })
    }
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::autosave_metrics)]
pub struct NewAutosaveDB {
    pub filename: String,
    pub analysis_date: String,
    pub payload: String,
    pub saved_at: String,
}

impl From<&AutosaveMetrics> for NewAutosaveDB {
    fn from(autosave: &AutosaveMetrics) -> Self {
        Self {
            filename: autosave.filename.clone(),
            analysis_date: format_date(&autosave.analysis_date),
            payload: autosave.payload.to_string(),
            saved_at: format_timestamp(&autosave.saved_at),
        }
    }
}
