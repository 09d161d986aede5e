//! Database models for diary tables.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use sleepscope_core::diary::{
    wall_clock_duration_minutes, DiaryEntry, DiaryFileEntry, DiaryPeriod, DiaryRawRow,
};
use sleepscope_core::validation::{
    format_clock_time, format_date, format_timestamp, parse_stored_clock_time, parse_stored_date,
};
use sleepscope_core::Result;

fn parse_clock(value: Option<&str>) -> Result<Option<chrono::NaiveTime>> {
    value.map(parse_stored_clock_time).transpose()
}

/// Database model for `diary_file_registry`
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::diary_file_registry)]
#[diesel(primary_key(filename))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DiaryFileDB {
    pub filename: String,
    pub file_hash: String,
    pub import_date: String,
    pub entry_count: i64,
}

impl From<&DiaryFileEntry> for DiaryFileDB {
    fn from(entry: &DiaryFileEntry) -> Self {
        Self {
            filename: entry.filename.clone(),
            file_hash: entry.file_hash.clone(),
            import_date: format_timestamp(&entry.import_date),
            entry_count: entry.entry_count,
        }
    }
}

/// Database model for `diary_data`
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::diary_data)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DiaryEntryDB {
    pub id: i32,
    pub participant_key: String,
    pub diary_date: String,
    pub filename: String,
    pub bed_time: Option<String>,
    pub sleep_onset_time: Option<String>,
    pub sleep_offset_time: Option<String>,
    pub out_of_bed_time: Option<String>,
    pub nap_occurred: bool,
    pub nonwear_occurred: bool,
    pub notes: Option<String>,
    pub updated_at: String,
}

impl TryFrom<DiaryEntryDB> for DiaryEntry {
    type Error = sleepscope_core::Error;

    fn try_from(db: DiaryEntryDB) -> std::result::Result<Self, Self::Error> {
        Ok(DiaryEntry {
            diary_date: parse_stored_date(&db.diary_date)?,
            bed_time: parse_clock(db.bed_time.as_deref())?,
            sleep_onset_time: parse_clock(db.sleep_onset_time.as_deref())?,
            sleep_offset_time: parse_clock(db.sleep_offset_time.as_deref())?,
            out_of_bed_time: parse_clock(db.out_of_bed_time.as_deref())?,
            participant_key: db.participant_key,
            filename: db.filename,
            nap_occurred: db.nap_occurred,
            nonwear_occurred: db.nonwear_occurred,
            notes: db.notes,
        })
    }
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::diary_data)]
#[diesel(treat_none_as_null = true, treat_none_as_default_value = false)]
pub struct NewDiaryEntryDB {
    pub participant_key: String,
    pub diary_date: String,
    pub filename: String,
    pub bed_time: Option<String>,
    pub sleep_onset_time: Option<String>,
    pub sleep_offset_time: Option<String>,
    pub out_of_bed_time: Option<String>,
    pub nap_occurred: bool,
    pub nonwear_occurred: bool,
    pub notes: Option<String>,
    pub updated_at: String,
}

impl NewDiaryEntryDB {
    pub fn from_entry(entry: &DiaryEntry, updated_at: &NaiveDateTime) -> Self {
        Self {
            participant_key: entry.participant_key.clone(),
            diary_date: format_date(&entry.diary_date),
            filename: entry.filename.clone(),
            bed_time: entry.bed_time.as_ref().map(format_clock_time),
            sleep_onset_time: entry.sleep_onset_time.as_ref().map(format_clock_time),
            sleep_offset_time: entry.sleep_offset_time.as_ref().map(format_clock_time),
            out_of_bed_time: entry.out_of_bed_time.as_ref().map(format_clock_time),
            nap_occurred: entry.nap_occurred,
            nonwear_occurred: entry.nonwear_occurred,
            notes: entry.notes.clone(),
            updated_at: format_timestamp(updated_at),
        }
    }
}

/// Database model for `diary_nap_periods`
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::diary_nap_periods)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DiaryNapPeriodDB {
    pub id: i32,
    pub filename: String,
    pub participant_key: String,
    pub diary_date: String,
    pub period_index: i32,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_minutes: Option<f64>,
}

impl TryFrom<DiaryNapPeriodDB> for DiaryPeriod {
    type Error = sleepscope_core::Error;

    fn try_from(db: DiaryNapPeriodDB) -> std::result::Result<Self, Self::Error> {
        Ok(DiaryPeriod {
            period_index: db.period_index,
            start_time: parse_clock(db.start_time.as_deref())?,
            end_time: parse_clock(db.end_time.as_deref())?,
            duration_minutes: db.duration_minutes,
            reason: None,
        })
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::diary_nap_periods)]
#[diesel(treat_none_as_default_value = false)]
pub struct NewDiaryNapPeriodDB {
    pub filename: String,
    pub participant_key: String,
    pub diary_date: String,
    pub period_index: i32,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_minutes: Option<f64>,
}

impl NewDiaryNapPeriodDB {
    pub fn from_period(filename: &str, participant_key: &str, day: &str, p: &DiaryPeriod) -> Self {
        Self {
            filename: filename.to_string(),
            participant_key: participant_key.to_string(),
            diary_date: day.to_string(),
            period_index: p.period_index,
            start_time: p.start_time.as_ref().map(format_clock_time),
            end_time: p.end_time.as_ref().map(format_clock_time),
            duration_minutes: wall_clock_duration_minutes(p.start_time, p.end_time),
        }
    }
}

/// Database model for `diary_nonwear_periods`
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::diary_nonwear_periods)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DiaryNonwearPeriodDB {
    pub id: i32,
    pub filename: String,
    pub participant_key: String,
    pub diary_date: String,
    pub period_index: i32,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_minutes: Option<f64>,
    pub reason: Option<String>,
}

impl TryFrom<DiaryNonwearPeriodDB> for DiaryPeriod {
    type Error = sleepscope_core::Error;

    fn try_from(db: DiaryNonwearPeriodDB) -> std::result::Result<Self, Self::Error> {
        Ok(DiaryPeriod {
            period_index: db.period_index,
            start_time: parse_clock(db.start_time.as_deref())?,
            end_time: parse_clock(db.end_time.as_deref())?,
            duration_minutes: db.duration_minutes,
            reason: db.reason,
        })
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::diary_nonwear_periods)]
#[diesel(treat_none_as_default_value = false)]
pub struct NewDiaryNonwearPeriodDB {
    pub filename: String,
    pub participant_key: String,
    pub diary_date: String,
    pub period_index: i32,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_minutes: Option<f64>,
    pub reason: Option<String>,
}

impl NewDiaryNonwearPeriodDB {
    pub fn from_period(filename: &str, participant_key: &str, day: &str, p: &DiaryPeriod) -> Self {
        Self {
            filename: filename.to_string(),
            participant_key: participant_key.to_string(),
            diary_date: day.to_string(),
            period_index: p.period_index,
            start_time: p.start_time.as_ref().map(format_clock_time),
            end_time: p.end_time.as_ref().map(format_clock_time),
            duration_minutes: wall_clock_duration_minutes(p.start_time, p.end_time),
            reason: p.reason.clone(),
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::diary_raw_data)]
#[diesel(treat_none_as_default_value = false)]
pub struct NewDiaryRawDB {
    pub filename: String,
    pub row_index: i64,
    pub participant_key: Option<String>,
    pub diary_date: Option<String>,
    pub payload: String,
}

pub const DIARY_RAW_INSERT_PARAMS: usize = 5;

impl From<&DiaryRawRow> for NewDiaryRawDB {
    fn from(row: &DiaryRawRow) -> Self {
        Self {
            filename: row.filename.clone(),
            row_index: row.row_index,
            participant_key: row.participant_key.clone(),
            diary_date: row.diary_date.as_ref().map(format_date),
            payload: row.payload.to_string(),
        }
    }
}
