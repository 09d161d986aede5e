use chrono::NaiveDateTime;
use diesel::prelude::*;

use sleepscope_core::nonwear::{ManualNonwearMarker, NonwearPeriod, NonwearSource};
use sleepscope_core::validation::{format_timestamp, parse_stored_timestamp};
use sleepscope_core::Result;

/// Database model for `manual_nonwear_markers`
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::manual_nonwear_markers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ManualNonwearMarkerDB {
    pub id: i32,
    pub filename: String,
    pub sleep_date: String,
    pub marker_index: i32,
    pub start_timestamp: Option<String>,
    pub end_timestamp: Option<String>,
    pub created_at: String,
}

impl TryFrom<ManualNonwearMarkerDB> for ManualNonwearMarker {
    type Error = sleepscope_core::Error;

    fn try_from(db: ManualNonwearMarkerDB) -> std::result::Result<Self, Self::Error> {
        Ok(ManualNonwearMarker {
            marker_index: db.marker_index,
            start_time: db
                .start_timestamp
                .as_deref()
                .map(parse_stored_timestamp)
                .transpose()?,
            end_time: db
                .end_timestamp
                .as_deref()
                .map(parse_stored_timestamp)
                .transpose()?,
        })
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::manual_nonwear_markers)]
#[diesel(treat_none_as_default_value = false)]
pub struct NewManualNonwearMarkerDB {
    pub filename: String,
    pub sleep_date: String,
    pub marker_index: i32,
    pub start_timestamp: Option<String>,
    pub end_timestamp: Option<String>,
    pub created_at: String,
}

impl NewManualNonwearMarkerDB {
    pub fn from_marker(
        filename: &str,
        sleep_date: &str,
        marker: &ManualNonwearMarker,
        created_at: &NaiveDateTime,
    ) -> Self {
        Self {
            filename: filename.to_string(),
            sleep_date: sleep_date.to_string(),
            marker_index: marker.marker_index,
            start_timestamp: marker.start_time.as_ref().map(format_timestamp),
            end_timestamp: marker.end_time.as_ref().map(format_timestamp),
            created_at: format_timestamp(created_at),
        }
    }
}

/// Database model for `nonwear_sensor_periods`
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::nonwear_sensor_periods)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SensorNonwearDB {
    pub id: i32,
    pub filename: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: Option<f64>,
    pub start_index: Option<i64>,
    pub end_index: Option<i64>,
}

impl SensorNonwearDB {
    pub fn into_period(self) -> Result<NonwearPeriod> {
        Ok(NonwearPeriod {
            start_time: parse_stored_timestamp(&self.start_time)?,
            end_time: parse_stored_timestamp(&self.end_time)?,
            duration_minutes: self.duration_minutes,
            start_index: self.start_index,
            end_index: self.end_index,
            source: NonwearSource::Sensor,
        })
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::nonwear_sensor_periods)]
#[diesel(treat_none_as_default_value = false)]
pub struct NewSensorNonwearDB {
    pub filename: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: Option<f64>,
    pub start_index: Option<i64>,
    pub end_index: Option<i64>,
}

pub const SENSOR_NONWEAR_INSERT_PARAMS: usize = 6;

impl NewSensorNonwearDB {
    pub fn from_period(filename: &str, period: &NonwearPeriod) -> Self {
        Self {
            filename: filename.to_string(),
            start_time: format_timestamp(&period.start_time),
            end_time: format_timestamp(&period.end_time),
            duration_minutes: period.duration_minutes,
            start_index: period.start_index,
            end_index: period.end_index,
        }
    }
}

/// Database model for `algorithm_nonwear_periods`
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::algorithm_nonwear_periods)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AlgorithmNonwearDB {
    pub id: i32,
    pub filename: String,
    pub algorithm_name: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: Option<f64>,
    pub start_index: Option<i64>,
    pub end_index: Option<i64>,
}

impl AlgorithmNonwearDB {
    pub fn into_period(self) -> Result<NonwearPeriod> {
        Ok(NonwearPeriod {
            start_time: parse_stored_timestamp(&self.start_time)?,
            end_time: parse_stored_timestamp(&self.end_time)?,
            duration_minutes: self.duration_minutes,
            start_index: self.start_index,
            end_index: self.end_index,
            source: NonwearSource::Algorithm(self.algorithm_name),
        })
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::algorithm_nonwear_periods)]
#[diesel(treat_none_as_default_value = false)]
pub struct NewAlgorithmNonwearDB {
    pub filename: String,
    pub algorithm_name: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: Option<f64>,
    pub start_index: Option<i64>,
    pub end_index: Option<i64>,
}

pub const ALGORITHM_NONWEAR_INSERT_PARAMS: usize = 7;

impl NewAlgorithmNonwearDB {
    pub fn from_period(filename: &str, algorithm: &str, period: &NonwearPeriod) -> Self {
        Self {
            filename: filename.to_string(),
            algorithm_name: algorithm.to_string(),
            start_time: format_timestamp(&period.start_time),
            end_time: format_timestamp(&period.end_time),
            duration_minutes: period.duration_minutes,
            start_index: period.start_index,
            end_index: period.end_index,
        }
    }
}
