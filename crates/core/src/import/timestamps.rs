//! Timestamp parsing for device exports.
//!
//! A strict pass uses the single format inferred from the first value. If any
//! row fails it, a permissive pass tries every known format per row. Rows
//! that still fail are dropped together with their source row.

use chrono::NaiveDateTime;
use log::{debug, warn};
use std::collections::HashSet;

use crate::constants::EPOCH_TOLERANCE_SECONDS;
use crate::errors::ImportError;
use crate::import::columns::TimestampSource;
use crate::Result;

/// Formats accepted for combined (or joined date + time) values, most
/// common first. Month-first wins over day-first when both would parse.
const KNOWN_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

/// Rows that survived timestamp parsing, index-aligned with `timestamps`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedRows {
    pub timestamps: Vec<NaiveDateTime>,
    pub rows: Vec<Vec<String>>,
    /// Rows whose timestamp could not be parsed
    pub unparsable: usize,
    /// Rows whose timestamp repeated an earlier row
    pub duplicates: usize,
    /// The single format used, when the strict pass succeeded
    pub strict_format: Option<&'static str>,
}

fn raw_timestamp(row: &[String], source: TimestampSource) -> String {
    let cell = |idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or("");
    match source {
        TimestampSource::Combined { column } => cell(column).to_string(),
        TimestampSource::Split { date, time } => format!("{} {}", cell(date), cell(time)),
    }
}

fn infer_format(value: &str) -> Option<&'static str> {
    KNOWN_FORMATS
        .iter()
        .copied()
        .find(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
}

fn parse_permissive(value: &str) -> Option<NaiveDateTime> {
    KNOWN_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn parse_strict(raw: &[String], format: &str) -> Option<Vec<NaiveDateTime>> {
    raw.iter()
        .map(|value| NaiveDateTime::parse_from_str(value, format).ok())
        .collect()
}

/// Parses the timestamp of every row, dropping unparsable rows and repeated
/// timestamps (the first occurrence wins).
pub fn parse_timestamps(rows: Vec<Vec<String>>, source: TimestampSource) -> Result<TimestampedRows> {
    let raw: Vec<String> = rows.iter().map(|row| raw_timestamp(row, source)).collect();

    let strict_format = raw.iter().find_map(|value| infer_format(value));
    let strict = strict_format.and_then(|fmt| parse_strict(&raw, fmt));

    let parsed: Vec<Option<NaiveDateTime>> = match strict {
        Some(values) => {
            debug!("Strict timestamp pass succeeded with {:?}", strict_format);
            values.into_iter().map(Some).collect()
        }
        None => {
            debug!("Strict timestamp pass failed; parsing each row permissively");
            raw.iter().map(|value| parse_permissive(value)).collect()
        }
    };
    let strict_used = parsed.iter().all(Option::is_some) && strict_format.is_some();

    let total = rows.len();
    let mut seen = HashSet::with_capacity(total);
    let mut timestamps = Vec::with_capacity(total);
    let mut kept = Vec::with_capacity(total);
    let mut unparsable = 0;
    let mut duplicates = 0;

    for (row, ts) in rows.into_iter().zip(parsed) {
        match ts {
            None => unparsable += 1,
            Some(ts) if !seen.insert(ts) => duplicates += 1,
            Some(ts) => {
                timestamps.push(ts);
                kept.push(row);
            }
        }
    }

    if timestamps.is_empty() {
        let example = raw.first().cloned().unwrap_or_default();
        return Err(ImportError::TimestampParse(format!(
            "none of {} rows has a recognizable timestamp (first value '{}')",
            total, example
        ))
        .into());
    }
    if unparsable > 0 {
        warn!("Dropped {} of {} rows with unparsable timestamps", unparsable, total);
    }
    if duplicates > 0 {
        warn!("Dropped {} rows with duplicate timestamps", duplicates);
    }

    Ok(TimestampedRows {
        timestamps,
        rows: kept,
        unparsable,
        duplicates,
        strict_format: if strict_used { strict_format } else { None },
    })
}

/// Returns a warning when the first sampling interval is not the expected
/// epoch length.
pub fn check_epoch(timestamps: &[NaiveDateTime], epoch_seconds: i64) -> Option<String> {
    let [first, second, ..] = timestamps else {
        return None;
    };
    let interval = (*second - *first).num_seconds();
    if (interval - epoch_seconds).abs() > EPOCH_TOLERANCE_SECONDS {
        let message = format!(
            "First sampling interval is {}s, expected {}s epochs",
            interval, epoch_seconds
        );
        warn!("{}", message);
        Some(message)
    } else {
        None
    }
}
