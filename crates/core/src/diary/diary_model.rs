//! Sleep diary domain models.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// One diary day for one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryEntry {
    pub participant_key: String,
    pub diary_date: NaiveDate,
    /// Diary file the entry was read from
    pub filename: String,
    pub bed_time: Option<NaiveTime>,
    pub sleep_onset_time: Option<NaiveTime>,
    pub sleep_offset_time: Option<NaiveTime>,
    pub out_of_bed_time: Option<NaiveTime>,
    pub nap_occurred: bool,
    pub nonwear_occurred: bool,
    pub notes: Option<String>,
}

/// A nap or nonwear interval reported in the diary, by wall-clock time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryPeriod {
    /// Slot position within the day, starting at 1
    pub period_index: i32,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    /// Filled in on save from start/end; `None` when either is missing
    pub duration_minutes: Option<f64>,
    /// Only used for nonwear periods
    pub reason: Option<String>,
}

impl DiaryPeriod {
    pub fn new(period_index: i32, start_time: Option<NaiveTime>, end_time: Option<NaiveTime>) -> Self {
        Self {
            period_index,
            start_time,
            end_time,
            duration_minutes: wall_clock_duration_minutes(start_time, end_time),
            reason: None,
        }
    }
}

/// Minutes from `start` to `end` on a 24h clock. An end before the start
/// is taken to be on the following day.
pub fn wall_clock_duration_minutes(start: Option<NaiveTime>, end: Option<NaiveTime>) -> Option<f64> {
    let (start, end) = (start?, end?);
    let mut minutes = (end - start).num_minutes();
    if minutes < 0 {
        minutes += 24 * 60;
    }
    Some(minutes as f64)
}

/// One row of `diary_file_registry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryFileEntry {
    pub filename: String,
    pub file_hash: String,
    pub import_date: NaiveDateTime,
    pub entry_count: i64,
}

/// A verbatim diary row kept for auditing column mappings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryRawRow {
    pub filename: String,
    pub row_index: i64,
    pub participant_key: Option<String>,
    pub diary_date: Option<NaiveDate>,
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    #[test]
    fn test_duration_same_day() {
        assert_eq!(wall_clock_duration_minutes(t(13, 0), t(14, 30)), Some(90.0));
    }

    #[test]
    fn test_duration_crossing_midnight() {
        assert_eq!(wall_clock_duration_minutes(t(23, 30), t(0, 15)), Some(45.0));
    }

    #[test]
    fn test_duration_missing_boundary() {
        assert_eq!(wall_clock_duration_minutes(t(13, 0), None), None);
        assert_eq!(wall_clock_duration_minutes(None, t(13, 0)), None);
    }

    #[test]
    fn test_new_period_computes_duration() {
        let period = DiaryPeriod::new(1, t(15, 0), t(15, 40));
        assert_eq!(period.duration_minutes, Some(40.0));
    }
}
