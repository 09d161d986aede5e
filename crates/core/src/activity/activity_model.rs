//! Activity domain models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, ValidationError};

/// Canonical value columns of a raw activity sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityColumn {
    /// Vertical axis (ActiGraph Axis1)
    AxisY,
    /// Lateral axis (ActiGraph Axis2)
    AxisX,
    /// Forward axis (ActiGraph Axis3)
    AxisZ,
    VectorMagnitude,
}

impl ActivityColumn {
    pub const ALL: [ActivityColumn; 4] = [
        ActivityColumn::AxisY,
        ActivityColumn::AxisX,
        ActivityColumn::AxisZ,
        ActivityColumn::VectorMagnitude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityColumn::AxisY => "axis_y",
            ActivityColumn::AxisX => "axis_x",
            ActivityColumn::AxisZ => "axis_z",
            ActivityColumn::VectorMagnitude => "vector_magnitude",
        }
    }
}

impl fmt::Display for ActivityColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityColumn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "axis_y" | "axis1" | "y" => Ok(ActivityColumn::AxisY),
            "axis_x" | "axis2" | "x" => Ok(ActivityColumn::AxisX),
            "axis_z" | "axis3" | "z" => Ok(ActivityColumn::AxisZ),
            "vector_magnitude" | "vm" => Ok(ActivityColumn::VectorMagnitude),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown activity column '{}'",
                other
            ))
            .into()),
        }
    }
}

/// One sampling epoch as persisted in `raw_activity_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawActivitySample {
    pub filename: String,
    pub participant_key: String,
    pub timestamp: NaiveDateTime,
    pub axis_y: Option<f64>,
    pub axis_x: Option<f64>,
    pub axis_z: Option<f64>,
    pub vector_magnitude: Option<f64>,
}

/// Parallel timestamp/value sequences for one column, ascending by time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySeries {
    pub timestamps: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
}

impl ActivitySeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// All value columns for a time range, index-aligned with `timestamps`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityColumns {
    pub timestamps: Vec<NaiveDateTime>,
    pub axis_y: Vec<f64>,
    pub axis_x: Vec<f64>,
    pub axis_z: Vec<f64>,
    pub vector_magnitude: Vec<f64>,
}

impl ActivityColumns {
    pub fn column(&self, column: ActivityColumn) -> &[f64] {
        match column {
            ActivityColumn::AxisY => &self.axis_y,
            ActivityColumn::AxisX => &self.axis_x,
            ActivityColumn::AxisZ => &self.axis_z,
            ActivityColumn::VectorMagnitude => &self.vector_magnitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_parse() {
        assert_eq!("Axis1".parse::<ActivityColumn>().unwrap(), ActivityColumn::AxisY);
        assert_eq!("VM".parse::<ActivityColumn>().unwrap(), ActivityColumn::VectorMagnitude);
        assert!("steps".parse::<ActivityColumn>().is_err());
    }

    #[test]
    fn test_storage_names() {
        let names: Vec<&str> = ActivityColumn::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["axis_y", "axis_x", "axis_z", "vector_magnitude"]);
    }
}
