//! Conversion of parsed rows into activity samples, streamed in batches.

use chrono::NaiveDateTime;
use log::warn;

use crate::activity::RawActivitySample;
use crate::import::columns::ColumnMapping;

/// Parses a numeric cell. Empty cells are `Ok(None)`; anything else that
/// is not a number is an error.
fn parse_cell(row: &[String], idx: usize) -> Result<Option<f64>, ()> {
    let cell = row.get(idx).map(|s| s.trim()).unwrap_or("");
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<f64>().map(Some).map_err(|_| ())
}

/// Builds one sample, or `None` when a non-empty numeric cell is unparsable.
pub fn row_to_sample(
    filename: &str,
    participant_key: &str,
    timestamp: NaiveDateTime,
    row: &[String],
    mapping: &ColumnMapping,
) -> Option<RawActivitySample> {
    let value = |idx: Option<usize>| -> Result<Option<f64>, ()> {
        match idx {
            Some(idx) => parse_cell(row, idx),
            None => Ok(None),
        }
    };

    let activity = parse_cell(row, mapping.activity).ok()?;
    let axis_y = value(mapping.axis_y).ok()?;
    let axis_x = value(mapping.axis_x).ok()?;
    let axis_z = value(mapping.axis_z).ok()?;
    let vector_magnitude = value(mapping.vector_magnitude).ok()?;

    let vector_magnitude = match (vector_magnitude, axis_x, axis_y, axis_z) {
        (Some(vm), _, _, _) => Some(vm),
        (None, Some(x), Some(y), Some(z)) => Some((x * x + y * y + z * z).sqrt()),
        _ => None,
    };
    let axis_y = if mapping.axis_y.is_some() { axis_y } else { activity };

    Some(RawActivitySample {
        filename: filename.to_string(),
        participant_key: participant_key.to_string(),
        timestamp,
        axis_y,
        axis_x,
        axis_z,
        vector_magnitude,
    })
}

/// Lazily converts rows into batches of at most `batch_size` samples.
///
/// Rows with unparsable numeric cells are counted in [`SampleBatches::dropped`]
/// and left out.
pub struct SampleBatches<'a> {
    filename: &'a str,
    participant_key: &'a str,
    mapping: &'a ColumnMapping,
    rows: std::iter::Zip<
        std::slice::Iter<'a, NaiveDateTime>,
        std::slice::Iter<'a, Vec<String>>,
    >,
    batch_size: usize,
    dropped: usize,
}

impl<'a> SampleBatches<'a> {
    pub fn new(
        filename: &'a str,
        participant_key: &'a str,
        mapping: &'a ColumnMapping,
        timestamps: &'a [NaiveDateTime],
        rows: &'a [Vec<String>],
        batch_size: usize,
    ) -> Self {
        Self {
            filename,
            participant_key,
            mapping,
            rows: timestamps.iter().zip(rows.iter()),
            batch_size: batch_size.max(1),
            dropped: 0,
        }
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl Iterator for SampleBatches<'_> {
    type Item = Vec<RawActivitySample>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            let Some((timestamp, row)) = self.rows.next() else {
                break;
            };
            match row_to_sample(self.filename, self.participant_key, *timestamp, row, self.mapping) {
                Some(sample) => batch.push(sample),
                None => {
                    self.dropped += 1;
                    warn!(
                        "{}: dropped row at {} with unparsable numeric value",
                        self.filename, timestamp
                    );
                }
            }
        }
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}
