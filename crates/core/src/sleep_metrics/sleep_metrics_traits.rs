use chrono::NaiveDate;

use crate::errors::Result;
use crate::sleep_metrics::sleep_metrics_model::{
    AutosaveMetrics, DailySleepMarkers, SleepMetricsRecord,
};

/// Trait for sleep metrics repository operations.
pub trait SleepMetricsRepositoryTrait: Send + Sync {
    /// Replaces the summary row for (filename, analysis_date). Marker rows
    /// are left untouched.
    fn save(&self, record: &SleepMetricsRecord) -> Result<()>;

    /// Replaces the summary row and every marker row for (filename,
    /// analysis_date) in one transaction. Either all of it is stored or
    /// none of it.
    fn save_atomic(&self, record: &SleepMetricsRecord) -> Result<()>;

    /// Loads a record with its marker rows in `periods`.
    fn load(&self, filename: &str, analysis_date: NaiveDate) -> Result<Option<SleepMetricsRecord>>;

    fn load_for_file(&self, filename: &str) -> Result<Vec<SleepMetricsRecord>>;

    fn load_all(&self) -> Result<Vec<SleepMetricsRecord>>;

    /// Removes the summary and marker rows for one date. Returns rows deleted.
    fn delete_for_date(&self, filename: &str, analysis_date: NaiveDate) -> Result<usize>;

    fn load_markers(&self, filename: &str, analysis_date: NaiveDate) -> Result<DailySleepMarkers>;

    fn save_autosave(&self, autosave: &AutosaveMetrics) -> Result<()>;

    fn load_autosave(&self, filename: &str, analysis_date: NaiveDate)
        -> Result<Option<AutosaveMetrics>>;

    fn delete_autosave(&self, filename: &str, analysis_date: NaiveDate) -> Result<usize>;
}
