//! Nonwear domain models.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_MANUAL_NONWEAR_SLOTS;
use crate::validation::require_slot;

/// Where a nonwear period came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "name")]
pub enum NonwearSource {
    /// Reported by the device's wear sensor
    Sensor,
    /// Derived by a named detection algorithm
    Algorithm(String),
}

/// An immutable nonwear interval. Replaced wholesale per file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonwearPeriod {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration_minutes: Option<f64>,
    pub start_index: Option<i64>,
    pub end_index: Option<i64>,
    pub source: NonwearSource,
}

impl NonwearPeriod {
    /// Stored duration, or the span between start and end.
    pub fn effective_duration_minutes(&self) -> f64 {
        self.duration_minutes
            .unwrap_or_else(|| (self.end_time - self.start_time).num_seconds() as f64 / 60.0)
    }
}

/// One manually placed nonwear marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualNonwearMarker {
    /// Slot position, `1..=MAX_MANUAL_NONWEAR_SLOTS`
    pub marker_index: i32,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

impl ManualNonwearMarker {
    pub fn is_complete(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_some()
    }
}

/// Every manual nonwear slot for one date. Always holds
/// `MAX_MANUAL_NONWEAR_SLOTS` entries; empty slots are `None`.
///
/// Saving is replace-set: the container passed to a save is the complete
/// desired state for the date, never a delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyNonwearMarkers {
    pub sleep_date: NaiveDate,
    pub slots: Vec<Option<ManualNonwearMarker>>,
}

impl DailyNonwearMarkers {
    pub fn new(sleep_date: NaiveDate) -> Self {
        Self {
            sleep_date,
            slots: vec![None; MAX_MANUAL_NONWEAR_SLOTS],
        }
    }

    pub fn set(&mut self, marker: ManualNonwearMarker) -> crate::Result<()> {
        require_slot("marker_index", marker.marker_index, MAX_MANUAL_NONWEAR_SLOTS)?;
        let idx = (marker.marker_index - 1) as usize;
        self.slots[idx] = Some(marker);
        Ok(())
    }

    pub fn markers(&self) -> impl Iterator<Item = &ManualNonwearMarker> {
        self.slots.iter().flatten()
    }

    pub fn complete_markers(&self) -> impl Iterator<Item = &ManualNonwearMarker> {
        self.markers().filter(|m| m.is_complete())
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}
