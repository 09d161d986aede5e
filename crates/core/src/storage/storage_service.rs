use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info, warn};

use crate::activity::{ActivityColumns, ActivitySeries, RawActivitySample};
use crate::diary::{DiaryEntry, DiaryFileEntry, DiaryPeriod, DiaryRawRow};
use crate::errors::Result;
use crate::file_registry::{
    AvailableFile, CommitSummary, FileDeletionSummary, FileRegistryEntry, ImportCommit,
    ImportStatistics, NewFileRegistration,
};
use crate::nonwear::{DailyNonwearMarkers, NonwearPeriod};
use crate::sleep_metrics::{AutosaveMetrics, DailySleepMarkers, SleepMetricsRecord};
use crate::storage::storage_model::{SchemaReady, SleepExportRow, StorageRepositories};

/// The single storage interface used by the rest of the application.
///
/// Each method delegates to exactly one repository call, except
/// [`StorageService::get_all_sleep_data_for_export`], which joins data from
/// several repositories for reading.
pub struct StorageService {
    schema: SchemaReady,
    repos: StorageRepositories,
}

impl StorageService {
    pub fn new(schema: SchemaReady, repos: StorageRepositories) -> Self {
        debug!(
            "Storage facade ready on {} ({} migrations applied at startup)",
            schema.location(),
            schema.migrations_applied()
        );
        Self { schema, repos }
    }

    pub fn schema(&self) -> &SchemaReady {
        &self.schema
    }

    // --- File registry ---

    pub fn get_available_files(&self) -> Result<Vec<AvailableFile>> {
        Ok(self
            .repos
            .file_registry
            .list_imported()?
            .into_iter()
            .map(AvailableFile::from)
            .collect())
    }

    pub fn find_file(&self, filename: &str) -> Result<Option<FileRegistryEntry>> {
        self.repos.file_registry.find_by_filename(filename)
    }

    pub fn find_file_by_participant(&self, participant_key: &str) -> Result<Option<FileRegistryEntry>> {
        self.repos.file_registry.find_by_participant_key(participant_key)
    }

    pub fn register_importing(&self, registration: &NewFileRegistration) -> Result<()> {
        self.repos.file_registry.register_importing(registration)
    }

    pub fn commit_import(
        &self,
        commit: &ImportCommit,
        batches: &mut dyn Iterator<Item = Vec<RawActivitySample>>,
        on_batch: &mut dyn FnMut(usize),
    ) -> Result<CommitSummary> {
        self.repos.file_registry.commit_import(commit, batches, on_batch)
    }

    pub fn mark_import_error(&self, filename: &str, message: &str) -> Result<()> {
        self.repos.file_registry.mark_error(filename, message)
    }

    pub fn delete_imported_file(&self, filename: &str) -> Result<FileDeletionSummary> {
        let summary = self.repos.file_registry.delete_imported_file(filename)?;
        info!(
            "Deleted imported file {} ({} rows across {} tables)",
            filename,
            summary.total(),
            summary.rows_deleted.len()
        );
        Ok(summary)
    }

    pub fn get_import_statistics(&self) -> Result<ImportStatistics> {
        self.repos.file_registry.get_import_statistics()
    }

    // --- Activity data ---

    pub fn get_file_date_ranges(&self, filename: &str) -> Result<Vec<NaiveDate>> {
        self.repos.activity.get_file_dates(filename)
    }

    pub fn load_activity_data(
        &self,
        filename: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        column: &str,
    ) -> Result<ActivitySeries> {
        self.repos.activity.load_range(filename, start, end, column)
    }

    pub fn load_all_activity_columns(
        &self,
        filename: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<ActivityColumns> {
        self.repos.activity.load_all_columns(filename, start, end)
    }

    pub fn count_activity_rows(&self, filename: &str) -> Result<i64> {
        self.repos.activity.count_rows(filename)
    }

    // --- Sleep metrics ---

    pub fn save_sleep_metrics(&self, record: &SleepMetricsRecord) -> Result<()> {
        self.repos.sleep_metrics.save(record)
    }

    pub fn save_sleep_metrics_atomic(&self, record: &SleepMetricsRecord) -> Result<()> {
        self.repos.sleep_metrics.save_atomic(record)
    }

    pub fn load_sleep_metrics(
        &self,
        filename: &str,
        analysis_date: NaiveDate,
    ) -> Result<Option<SleepMetricsRecord>> {
        self.repos.sleep_metrics.load(filename, analysis_date)
    }

    pub fn load_sleep_metrics_for_file(&self, filename: &str) -> Result<Vec<SleepMetricsRecord>> {
        self.repos.sleep_metrics.load_for_file(filename)
    }

    pub fn delete_sleep_metrics(&self, filename: &str, analysis_date: NaiveDate) -> Result<usize> {
        self.repos.sleep_metrics.delete_for_date(filename, analysis_date)
    }

    pub fn load_sleep_markers(
        &self,
        filename: &str,
        analysis_date: NaiveDate,
    ) -> Result<DailySleepMarkers> {
        self.repos.sleep_metrics.load_markers(filename, analysis_date)
    }

    pub fn save_autosave(&self, autosave: &AutosaveMetrics) -> Result<()> {
        self.repos.sleep_metrics.save_autosave(autosave)
    }

    pub fn load_autosave(
        &self,
        filename: &str,
        analysis_date: NaiveDate,
    ) -> Result<Option<AutosaveMetrics>> {
        self.repos.sleep_metrics.load_autosave(filename, analysis_date)
    }

    pub fn delete_autosave(&self, filename: &str, analysis_date: NaiveDate) -> Result<usize> {
        self.repos.sleep_metrics.delete_autosave(filename, analysis_date)
    }

    // --- Nonwear ---

    pub fn save_manual_nonwear_markers(
        &self,
        filename: &str,
        markers: &DailyNonwearMarkers,
    ) -> Result<usize> {
        self.repos.nonwear.save_manual_markers(filename, markers)
    }

    pub fn load_manual_nonwear_markers(
        &self,
        filename: &str,
        sleep_date: NaiveDate,
    ) -> Result<DailyNonwearMarkers> {
        self.repos.nonwear.load_manual_markers(filename, sleep_date)
    }

    pub fn delete_manual_nonwear_markers(&self, filename: &str, sleep_date: NaiveDate) -> Result<usize> {
        self.repos.nonwear.delete_manual_markers(filename, sleep_date)
    }

    pub fn save_sensor_nonwear_periods(&self, filename: &str, periods: &[NonwearPeriod]) -> Result<usize> {
        self.repos.nonwear.save_sensor_periods(filename, periods)
    }

    pub fn load_sensor_nonwear_periods(&self, filename: &str) -> Result<Vec<NonwearPeriod>> {
        self.repos.nonwear.load_sensor_periods(filename)
    }

    pub fn save_algorithm_nonwear_periods(
        &self,
        filename: &str,
        algorithm: &str,
        periods: &[NonwearPeriod],
    ) -> Result<usize> {
        self.repos
            .nonwear
            .save_algorithm_periods(filename, algorithm, periods)
    }

    pub fn load_algorithm_nonwear_periods(
        &self,
        filename: &str,
        algorithm: &str,
    ) -> Result<Vec<NonwearPeriod>> {
        self.repos.nonwear.load_algorithm_periods(filename, algorithm)
    }

    // --- Diary ---

    pub fn register_diary_file(&self, entry: &DiaryFileEntry) -> Result<()> {
        self.repos.diary.register_diary_file(entry)
    }

    pub fn save_diary_entries(&self, entries: &[DiaryEntry]) -> Result<usize> {
        self.repos.diary.save_entries(entries)
    }

    pub fn load_diary_entry(
        &self,
        participant_key: &str,
        diary_date: NaiveDate,
    ) -> Result<Option<DiaryEntry>> {
        self.repos.diary.load_entry(participant_key, diary_date)
    }

    pub fn load_diary_entries(&self, participant_key: &str) -> Result<Vec<DiaryEntry>> {
        self.repos.diary.load_entries(participant_key)
    }

    pub fn save_diary_nap_periods(
        &self,
        filename: &str,
        participant_key: &str,
        diary_date: NaiveDate,
        periods: &[DiaryPeriod],
    ) -> Result<usize> {
        self.repos
            .diary
            .save_nap_periods(filename, participant_key, diary_date, periods)
    }

    pub fn save_diary_nonwear_periods(
        &self,
        filename: &str,
        participant_key: &str,
        diary_date: NaiveDate,
        periods: &[DiaryPeriod],
    ) -> Result<usize> {
        self.repos
            .diary
            .save_nonwear_periods(filename, participant_key, diary_date, periods)
    }

    pub fn load_diary_nap_periods(&self, filename: &str, diary_date: NaiveDate) -> Result<Vec<DiaryPeriod>> {
        self.repos.diary.load_nap_periods(filename, diary_date)
    }

    pub fn load_diary_nonwear_periods(
        &self,
        filename: &str,
        diary_date: NaiveDate,
    ) -> Result<Vec<DiaryPeriod>> {
        self.repos.diary.load_nonwear_periods(filename, diary_date)
    }

    pub fn save_diary_raw_rows(&self, rows: &[DiaryRawRow]) -> Result<usize> {
        self.repos.diary.save_raw_rows(rows)
    }

    pub fn delete_diary_file(&self, filename: &str) -> Result<usize> {
        self.repos.diary.delete_diary_file(filename)
    }

    // --- Cross-repository reads ---

    /// Every sleep metrics record with its diary entry and manual nonwear
    /// markers attached.
    ///
    /// Best-effort: when a lookup fails for one record, the failure is logged
    /// and that record is left out; the rest of the export continues.
    pub fn get_all_sleep_data_for_export(&self) -> Result<Vec<SleepExportRow>> {
        let records = self.repos.sleep_metrics.load_all()?;
        let total = records.len();
        let mut rows = Vec::with_capacity(total);

        for metrics in records {
            let diary = match self
                .repos
                .diary
                .load_entry(&metrics.participant_key, metrics.analysis_date)
            {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(
                        "Skipping export row {} / {}: diary lookup failed: {}",
                        metrics.filename, metrics.analysis_date, e
                    );
                    continue;
                }
            };

            let manual_nonwear = match self
                .repos
                .nonwear
                .load_manual_markers(&metrics.filename, metrics.analysis_date)
            {
                Ok(markers) => markers.markers().cloned().collect(),
                Err(e) => {
                    warn!(
                        "Skipping export row {} / {}: nonwear lookup failed: {}",
                        metrics.filename, metrics.analysis_date, e
                    );
                    continue;
                }
            };

            rows.push(SleepExportRow {
                metrics,
                diary,
                manual_nonwear,
            });
        }

        debug!("Prepared {} of {} sleep records for export", rows.len(), total);
        Ok(rows)
    }
}
