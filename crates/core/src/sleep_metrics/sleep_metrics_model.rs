//! Sleep metrics domain models.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::MAX_SLEEP_PERIODS;
use crate::errors::{Error, ValidationError};
use crate::validation::require_slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkerType {
    MainSleep,
    Nap,
}

impl MarkerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerType::MainSleep => "MAIN_SLEEP",
            MarkerType::Nap => "NAP",
        }
    }
}

impl fmt::Display for MarkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarkerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MAIN_SLEEP" => Ok(MarkerType::MainSleep),
            "NAP" => Ok(MarkerType::Nap),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown marker type '{}'",
                other
            ))
            .into()),
        }
    }
}

/// One sleep marker slot (onset/offset pair).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepPeriod {
    /// Slot position, `1..=MAX_SLEEP_PERIODS`
    pub marker_index: i32,
    pub marker_type: MarkerType,
    pub onset: Option<NaiveDateTime>,
    pub offset: Option<NaiveDateTime>,
}

impl SleepPeriod {
    pub fn is_complete(&self) -> bool {
        self.onset.is_some() && self.offset.is_some()
    }

    pub fn duration_minutes(&self) -> Option<f64> {
        match (self.onset, self.offset) {
            (Some(onset), Some(offset)) => Some((offset - onset).num_seconds() as f64 / 60.0),
            _ => None,
        }
    }
}

/// Every sleep marker slot of one analysis date. Always holds
/// `MAX_SLEEP_PERIODS` slots; unused slots are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySleepMarkers {
    pub analysis_date: NaiveDate,
    pub slots: Vec<Option<SleepPeriod>>,
}

impl DailySleepMarkers {
    pub fn new(analysis_date: NaiveDate) -> Self {
        Self {
            analysis_date,
            slots: vec![None; MAX_SLEEP_PERIODS],
        }
    }

    /// Places a period into its slot, replacing whatever was there.
    pub fn set(&mut self, period: SleepPeriod) -> crate::Result<()> {
        require_slot("marker_index", period.marker_index, MAX_SLEEP_PERIODS)?;
        let idx = (period.marker_index - 1) as usize;
        self.slots[idx] = Some(period);
        Ok(())
    }

    pub fn periods(&self) -> impl Iterator<Item = &SleepPeriod> {
        self.slots.iter().flatten()
    }

    pub fn complete_periods(&self) -> impl Iterator<Item = &SleepPeriod> {
        self.periods().filter(|p| p.is_complete())
    }

    pub fn main_sleep(&self) -> Option<&SleepPeriod> {
        self.complete_periods()
            .find(|p| p.marker_type == MarkerType::MainSleep)
    }
}

/// Summary of one analysis date for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepMetricsRecord {
    pub filename: String,
    pub participant_key: String,
    pub participant_id: String,
    pub participant_group: String,
    pub participant_timepoint: String,
    pub analysis_date: NaiveDate,
    pub onset_timestamp: Option<NaiveDateTime>,
    pub offset_timestamp: Option<NaiveDateTime>,
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
    /// Free-form per-period metrics keyed however the scoring layer likes
    pub period_metrics: serde_json::Value,
    /// Per-period marker rows written alongside the summary by the atomic save
    pub periods: Vec<SleepPeriod>,
    pub updated_at: Option<NaiveDateTime>,
}

impl SleepMetricsRecord {
    /// Creates an empty record for the given file and date.
    pub fn new(
        filename: &str,
        participant: &crate::participant::ParticipantInfo,
        analysis_date: NaiveDate,
    ) -> Self {
        Self {
            filename: filename.to_string(),
            participant_key: participant.key.clone(),
            participant_id: participant.numerical_id.clone(),
            participant_group: participant.group.clone(),
            participant_timepoint: participant.timepoint.clone(),
            analysis_date,
            onset_timestamp: None,
            offset_timestamp: None,
            total_sleep_time: None,
            sleep_efficiency: None,
            total_minutes_in_bed: None,
            waso: None,
            awakenings: None,
            average_awakening_length: None,
            movement_index: None,
            fragmentation_index: None,
            sleep_fragmentation_index: None,
            total_activity: None,
            non_zero_epochs: None,
            sleep_algorithm: None,
            period_metrics: serde_json::Value::Object(serde_json::Map::new()),
            periods: Vec::new(),
            updated_at: None,
        }
    }
}

/// Snapshot of unsaved work for one file and date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveMetrics {
    pub filename: String,
    pub analysis_date: NaiveDate,
    pub payload: serde_json::Value,
    pub saved_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_daily_markers_always_full_size() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut markers = DailySleepMarkers::new(date);
        assert_eq!(markers.slots.len(), MAX_SLEEP_PERIODS);

        markers
            .set(SleepPeriod {
                marker_index: 2,
                marker_type: MarkerType::Nap,
                onset: Some(ts("2024-01-01 13:00:00")),
                offset: None,
            })
            .unwrap();
        assert_eq!(markers.slots.len(), MAX_SLEEP_PERIODS);
        assert_eq!(markers.periods().count(), 1);
        assert_eq!(markers.complete_periods().count(), 0);
    }

    #[test]
    fn test_set_rejects_out_of_range_slot() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut markers = DailySleepMarkers::new(date);
        let result = markers.set(SleepPeriod {
            marker_index: (MAX_SLEEP_PERIODS + 1) as i32,
            marker_type: MarkerType::MainSleep,
            onset: None,
            offset: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_period_duration() {
        let period = SleepPeriod {
            marker_index: 1,
            marker_type: MarkerType::MainSleep,
            onset: Some(ts("2024-01-01 22:30:00")),
            offset: Some(ts("2024-01-02 06:45:00")),
        };
        assert!(period.is_complete());
        assert_eq!(period.duration_minutes(), Some(495.0));
    }
}
