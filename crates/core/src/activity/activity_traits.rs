use chrono::{NaiveDate, NaiveDateTime};

use crate::activity::activity_model::{ActivityColumns, ActivitySeries};
use crate::errors::Result;

/// Read access to imported activity samples.
///
/// Samples are written exclusively by the import commit in
/// [`crate::file_registry::FileRegistryRepositoryTrait::commit_import`].
pub trait ActivityDataRepositoryTrait: Send + Sync {
    /// Loads one value column as parallel ascending sequences.
    ///
    /// `column` is a storage column or a registered alias; it is validated
    /// against the schema allowlist. Values are clamped at zero and rows with
    /// unparsable timestamps or missing values are skipped.
    fn load_range(
        &self,
        filename: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        column: &str,
    ) -> Result<ActivitySeries>;

    /// Loads every value column at once. Missing values become `0.0`.
    fn load_all_columns(
        &self,
        filename: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<ActivityColumns>;

    /// Distinct calendar dates that have at least one sample.
    fn get_file_dates(&self, filename: &str) -> Result<Vec<NaiveDate>>;

    fn count_rows(&self, filename: &str) -> Result<i64>;
}
