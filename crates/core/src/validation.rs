//! Input checks shared by every repository method.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::constants::{CLOCK_TIME_FORMAT, DATE_FORMAT, MAX_TEXT_INPUT_LENGTH, TIMESTAMP_FORMAT};
use crate::errors::{Result, ValidationError};

/// Rejects empty or overlong text arguments.
pub fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field.to_string()).into());
    }
    if value.chars().count() > MAX_TEXT_INPUT_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_INPUT_LENGTH,
        }
        .into());
    }
    Ok(())
}

/// Rejects a slot index outside `1..=max`.
pub fn require_slot(field: &str, index: i32, max: usize) -> Result<()> {
    if index < 1 || index as usize > max {
        return Err(ValidationError::InvalidInput(format!(
            "{} must be between 1 and {}, got {}",
            field, max, index
        ))
        .into());
    }
    Ok(())
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_stored_timestamp(value: &str) -> Result<NaiveDateTime> {
    Ok(NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)?)
}

pub fn parse_stored_date(value: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(value, DATE_FORMAT)?)
}

pub fn format_clock_time(time: &NaiveTime) -> String {
    time.format(CLOCK_TIME_FORMAT).to_string()
}

/// Parses a stored `HH:MM` diary time. Values with seconds are accepted too.
pub fn parse_stored_clock_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, CLOCK_TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    #[test]
    fn test_require_text_rejects_blank() {
        let err = require_text("filename", "   ").unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingField(ref f)) if f == "filename"
        ));
    }

    #[test]
    fn test_require_text_rejects_overlong() {
        let long = "a".repeat(MAX_TEXT_INPUT_LENGTH + 1);
        assert!(require_text("filename", &long).is_err());
        assert!(require_text("filename", &long[1..]).is_ok());
    }

    #[test]
    fn test_require_slot_bounds() {
        assert!(require_slot("marker_index", 1, 4).is_ok());
        assert!(require_slot("marker_index", 4, 4).is_ok());
        assert!(require_slot("marker_index", 0, 4).is_err());
        assert!(require_slot("marker_index", 5, 4).is_err());
    }

    #[test]
    fn test_timestamp_round_trip_format() {
        let ts = parse_stored_timestamp("2024-01-01 23:59:00").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-01 23:59:00");
    }

    #[test]
    fn test_clock_time_accepts_seconds() {
        let t = parse_stored_clock_time("22:15:30").unwrap();
        assert_eq!(format_clock_time(&t), "22:15");
        assert!(parse_stored_clock_time("25:00").is_err());
    }
}
