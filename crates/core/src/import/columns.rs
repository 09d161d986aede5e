//! Column identification across device export layouts.
//!
//! Devices disagree on header names, so columns are matched on normalized
//! header text. Caller overrides always win over detection.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::ImportError;
use crate::import::import_model::ColumnOverrides;
use crate::Result;

const COMBINED_DATETIME_HEADERS: [&str; 4] = ["datetime", "timestamp", "date time", "date_time"];
const VECTOR_MAGNITUDE_HEADERS: [&str; 4] =
    ["vector magnitude", "vector_magnitude", "vectormagnitude", "vm"];
const ACTIVITY_KEYWORDS: [&str; 2] = ["activity", "count"];

/// Rows inspected when looking for numeric columns
const NUMERIC_SAMPLE_ROWS: usize = 20;

/// Where a row's timestamp comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TimestampSource {
    Combined { column: usize },
    Split { date: usize, time: usize },
}

/// Column positions for one file. Axis and vector magnitude positions are
/// only set for exact canonical headers or overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub timestamp: TimestampSource,
    pub activity: usize,
    pub axis_y: Option<usize>,
    pub axis_x: Option<usize>,
    pub axis_z: Option<usize>,
    pub vector_magnitude: Option<usize>,
}

impl ColumnMapping {
    /// Every column whose cells are parsed as numbers, without duplicates.
    pub fn numeric_columns(&self) -> Vec<usize> {
        let mut columns = vec![self.activity];
        for idx in [self.axis_y, self.axis_x, self.axis_z, self.vector_magnitude]
            .into_iter()
            .flatten()
        {
            if !columns.contains(&idx) {
                columns.push(idx);
            }
        }
        columns
    }
}

fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn find_override(
    normalized: &[String],
    field: &str,
    requested: Option<&String>,
) -> Result<Option<usize>> {
    let Some(requested) = requested else {
        return Ok(None);
    };
    let wanted = normalize_header(requested);
    normalized
        .iter()
        .position(|h| *h == wanted)
        .map(Some)
        .ok_or_else(|| {
            ImportError::MissingColumns(format!(
                "{} column '{}' not found in headers",
                field, requested
            ))
            .into()
        })
}

fn find_exact(normalized: &[String], names: &[&str]) -> Option<usize> {
    normalized.iter().position(|h| names.contains(&h.as_str()))
}

fn is_numeric_column(rows: &[Vec<String>], idx: usize) -> bool {
    let mut seen_value = false;
    for row in rows.iter().take(NUMERIC_SAMPLE_ROWS) {
        let cell = row.get(idx).map(|c| c.trim()).unwrap_or("");
        if cell.is_empty() {
            continue;
        }
        if cell.parse::<f64>().is_err() {
            return false;
        }
        seen_value = true;
    }
    seen_value
}

fn identify_timestamp(normalized: &[String], overrides: &ColumnOverrides) -> Result<TimestampSource> {
    if let Some(column) = find_override(normalized, "datetime", overrides.datetime.as_ref())? {
        return Ok(TimestampSource::Combined { column });
    }

    let date_override = find_override(normalized, "date", overrides.date.as_ref())?;
    let time_override = find_override(normalized, "time", overrides.time.as_ref())?;
    if date_override.is_none() && time_override.is_none() {
        if let Some(column) = find_exact(normalized, &COMBINED_DATETIME_HEADERS) {
            return Ok(TimestampSource::Combined { column });
        }
    }

    let date = date_override.or_else(|| {
        normalized
            .iter()
            .position(|h| h.contains("date") && !h.contains("time"))
    });
    let time = time_override.or_else(|| {
        normalized
            .iter()
            .enumerate()
            .position(|(i, h)| Some(i) != date && h.contains("time") && !h.contains("date"))
    });

    match (date, time) {
        (Some(date), Some(time)) => Ok(TimestampSource::Split { date, time }),
        _ => Err(ImportError::MissingColumns(
            "no datetime column and no date + time column pair".to_string(),
        )
        .into()),
    }
}

/// Identifies the timestamp, activity and axis columns of a file.
///
/// `sample_rows` are only used to find numeric columns when no header names
/// the activity column.
pub fn identify_columns(
    headers: &[String],
    sample_rows: &[Vec<String>],
    overrides: &ColumnOverrides,
) -> Result<ColumnMapping> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

    let timestamp = identify_timestamp(&normalized, overrides)?;
    let timestamp_columns = match timestamp {
        TimestampSource::Combined { column } => vec![column],
        TimestampSource::Split { date, time } => vec![date, time],
    };

    let axis_y = find_override(&normalized, "axis_y", overrides.axis_y.as_ref())?
        .or_else(|| find_exact(&normalized, &["axis1", "axis_y"]));
    let axis_x = find_override(&normalized, "axis_x", overrides.axis_x.as_ref())?
        .or_else(|| find_exact(&normalized, &["axis2", "axis_x"]));
    let axis_z = find_override(&normalized, "axis_z", overrides.axis_z.as_ref())?
        .or_else(|| find_exact(&normalized, &["axis3", "axis_z"]));
    let vector_magnitude =
        find_override(&normalized, "vector_magnitude", overrides.vector_magnitude.as_ref())?
            .or_else(|| find_exact(&normalized, &VECTOR_MAGNITUDE_HEADERS));

    let activity = find_override(&normalized, "activity", overrides.activity.as_ref())?
        .or(vector_magnitude)
        .or_else(|| {
            normalized.iter().enumerate().position(|(i, h)| {
                !timestamp_columns.contains(&i) && ACTIVITY_KEYWORDS.iter().any(|k| h.contains(k))
            })
        })
        .or_else(|| {
            (0..headers.len())
                .rev()
                .find(|i| !timestamp_columns.contains(i) && is_numeric_column(sample_rows, *i))
        })
        .ok_or_else(|| ImportError::MissingColumns("no activity column".to_string()))?;

    let mapping = ColumnMapping {
        timestamp,
        activity,
        axis_y,
        axis_x,
        axis_z,
        vector_magnitude,
    };
    debug!(
        "Identified columns: timestamp {:?}, activity '{}'",
        mapping.timestamp, headers[activity]
    );
    Ok(mapping)
}
