use chrono::NaiveDate;

use crate::errors::Result;
use crate::nonwear::nonwear_model::{DailyNonwearMarkers, NonwearPeriod};

/// Trait for nonwear repository operations.
pub trait NonwearRepositoryTrait: Send + Sync {
    /// Replaces every manual marker of (filename, sleep_date) with the
    /// occupied slots of `markers`. Returns the number of rows written.
    fn save_manual_markers(&self, filename: &str, markers: &DailyNonwearMarkers) -> Result<usize>;

    /// Always returns a full-size container, empty when nothing is stored.
    fn load_manual_markers(&self, filename: &str, sleep_date: NaiveDate)
        -> Result<DailyNonwearMarkers>;

    fn delete_manual_markers(&self, filename: &str, sleep_date: NaiveDate) -> Result<usize>;

    /// Replaces every sensor nonwear period of the file.
    fn save_sensor_periods(&self, filename: &str, periods: &[NonwearPeriod]) -> Result<usize>;

    fn load_sensor_periods(&self, filename: &str) -> Result<Vec<NonwearPeriod>>;

    /// Replaces every period of the file produced by `algorithm`.
    fn save_algorithm_periods(
        &self,
        filename: &str,
        algorithm: &str,
        periods: &[NonwearPeriod],
    ) -> Result<usize>;

    fn load_algorithm_periods(&self, filename: &str, algorithm: &str) -> Result<Vec<NonwearPeriod>>;
}
