use chrono::NaiveDate;

use crate::diary::diary_model::{DiaryEntry, DiaryFileEntry, DiaryPeriod, DiaryRawRow};
use crate::errors::Result;

/// Trait for diary repository operations.
pub trait DiaryRepositoryTrait: Send + Sync {
    fn register_diary_file(&self, entry: &DiaryFileEntry) -> Result<()>;

    /// Upserts entries keyed by (participant_key, diary_date).
    fn save_entries(&self, entries: &[DiaryEntry]) -> Result<usize>;

    fn load_entry(&self, participant_key: &str, diary_date: NaiveDate) -> Result<Option<DiaryEntry>>;

    fn load_entries(&self, participant_key: &str) -> Result<Vec<DiaryEntry>>;

    /// Replaces every nap period of (filename, diary_date). Durations are
    /// recomputed from the wall-clock times.
    fn save_nap_periods(
        &self,
        filename: &str,
        participant_key: &str,
        diary_date: NaiveDate,
        periods: &[DiaryPeriod],
    ) -> Result<usize>;

    /// Replaces every nonwear period of (filename, diary_date).
    fn save_nonwear_periods(
        &self,
        filename: &str,
        participant_key: &str,
        diary_date: NaiveDate,
        periods: &[DiaryPeriod],
    ) -> Result<usize>;

    fn load_nap_periods(&self, filename: &str, diary_date: NaiveDate) -> Result<Vec<DiaryPeriod>>;

    fn load_nonwear_periods(&self, filename: &str, diary_date: NaiveDate)
        -> Result<Vec<DiaryPeriod>>;

    fn save_raw_rows(&self, rows: &[DiaryRawRow]) -> Result<usize>;

    /// Deletes the diary file and every row that came from it.
    fn delete_diary_file(&self, filename: &str) -> Result<usize>;
}
