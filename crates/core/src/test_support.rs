//! In-memory storage ports shared by the core service tests.

use chrono::{NaiveDate, NaiveDateTime};
use std::sync::{Arc, Mutex};

use crate::activity::{
    ActivityColumns, ActivityDataRepositoryTrait, ActivitySeries, RawActivitySample,
};
use crate::diary::{DiaryEntry, DiaryFileEntry, DiaryPeriod, DiaryRawRow, DiaryRepositoryTrait};
use crate::errors::{DatabaseError, Error, ImportError, Result};
use crate::file_registry::{
    CommitSummary, FileDeletionSummary, FileRegistryEntry, FileRegistryRepositoryTrait,
    ImportCommit, ImportStatistics, ImportStatus, NewFileRegistration,
};
use crate::nonwear::{DailyNonwearMarkers, NonwearPeriod, NonwearRepositoryTrait};
use crate::sleep_metrics::{
    AutosaveMetrics, DailySleepMarkers, SleepMetricsRecord, SleepMetricsRepositoryTrait,
};
use crate::storage::{SchemaMigrator, SchemaReady, StorageRepositories, StorageService};

#[derive(Default)]
pub struct InMemoryStore {
    pub registry: Mutex<Vec<FileRegistryEntry>>,
    pub samples: Mutex<Vec<RawActivitySample>>,
    pub metrics: Mutex<Vec<SleepMetricsRecord>>,
    pub diary: Mutex<Vec<DiaryEntry>>,
    pub nonwear: Mutex<Vec<(String, DailyNonwearMarkers)>>,
    /// Participant keys whose diary lookup fails
    pub failing_diary_keys: Mutex<Vec<String>>,
    /// Filenames whose commit fails with a dropped connection
    pub disconnect_on_commit: Mutex<Vec<String>>,
}

/// The in-memory store has no schema to migrate.
struct InMemorySchema;

impl SchemaMigrator for InMemorySchema {
    fn location(&self) -> String {
        ":memory:".to_string()
    }

    fn run_pending(&self) -> Result<usize> {
        Ok(0)
    }
}

impl InMemoryStore {
    pub fn service(self: &Arc<Self>) -> Arc<StorageService> {
        let repos = StorageRepositories {
            activity: self.clone(),
            file_registry: self.clone(),
            sleep_metrics: self.clone(),
            nonwear: self.clone(),
            diary: self.clone(),
        };
        let schema = SchemaReady::establish(&InMemorySchema).unwrap();
        Arc::new(StorageService::new(schema, repos))
    }

    pub fn entry(&self, filename: &str) -> Option<FileRegistryEntry> {
        self.registry
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.filename == filename)
            .cloned()
    }

    pub fn sample_count(&self, filename: &str) -> usize {
        self.samples
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.filename == filename)
            .count()
    }
}

impl ActivityDataRepositoryTrait for InMemoryStore {
    fn load_range(
        &self,
        filename: &str,
        _start: Option<NaiveDateTime>,
        _end: Option<NaiveDateTime>,
        _column: &str,
    ) -> Result<ActivitySeries> {
        let samples = self.samples.lock().unwrap();
        let mut series = ActivitySeries::default();
        for s in samples.iter().filter(|s| s.filename == filename) {
            if let Some(v) = s.axis_y {
                series.timestamps.push(s.timestamp);
                series.values.push(v.max(0.0));
            }
        }
        Ok(series)
    }

    fn load_all_columns(
        &self,
        _filename: &str,
        _start: Option<NaiveDateTime>,
        _end: Option<NaiveDateTime>,
    ) -> Result<ActivityColumns> {
        Ok(ActivityColumns::default())
    }

    fn get_file_dates(&self, filename: &str) -> Result<Vec<NaiveDate>> {
        let mut dates: Vec<NaiveDate> = self
            .samples
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.filename == filename)
            .map(|s| s.timestamp.date())
            .collect();
        dates.sort();
        dates.dedup();
        Ok(dates)
    }

    fn count_rows(&self, filename: &str) -> Result<i64> {
        Ok(self.sample_count(filename) as i64)
    }
}

impl FileRegistryRepositoryTrait for InMemoryStore {
    fn find_by_filename(&self, filename: &str) -> Result<Option<FileRegistryEntry>> {
        Ok(self.entry(filename))
    }

    fn find_by_participant_key(&self, participant_key: &str) -> Result<Option<FileRegistryEntry>> {
        let registry = self.registry.lock().unwrap();
        let mut matching = registry.iter().filter(|e| e.participant_key == participant_key);
        Ok(registry
            .iter()
            .find(|e| e.participant_key == participant_key && e.status == ImportStatus::Imported)
            .or_else(|| matching.next_back())
            .cloned())
    }

    fn list_imported(&self) -> Result<Vec<FileRegistryEntry>> {
        Ok(self
            .registry
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.status == ImportStatus::Imported)
            .cloned()
            .collect())
    }

    fn register_importing(&self, registration: &NewFileRegistration) -> Result<()> {
        let mut registry = self.registry.lock().unwrap();
        if registry
            .iter()
            .any(|e| e.filename == registration.filename && e.status == ImportStatus::Imported)
        {
            return Ok(());
        }
        registry.retain(|e| e.filename != registration.filename);
        let p = &registration.participant;
        registry.push(FileRegistryEntry {
            filename: registration.filename.clone(),
            file_hash: registration.file_hash.clone(),
            participant_key: p.key.clone(),
            participant_id: p.numerical_id.clone(),
            participant_group: p.group.clone(),
            participant_timepoint: p.timepoint.clone(),
            file_size: registration.file_size,
            date_range_start: None,
            date_range_end: None,
            total_records: 0,
            last_modified: registration.last_modified,
            import_date: None,
            status: ImportStatus::Importing,
            error_message: None,
        });
        Ok(())
    }

    fn commit_import(
        &self,
        commit: &ImportCommit,
        batches: &mut dyn Iterator<Item = Vec<RawActivitySample>>,
        on_batch: &mut dyn FnMut(usize),
    ) -> Result<CommitSummary> {
        if self
            .disconnect_on_commit
            .lock()
            .unwrap()
            .contains(&commit.filename)
        {
            return Err(Error::Database(DatabaseError::ConnectionFailed(
                "database is gone".to_string(),
            )));
        }

        let mut staged = Vec::new();
        let mut batches_written = 0;
        for batch in batches {
            staged.extend(batch);
            batches_written += 1;
            on_batch(staged.len());
        }
        if staged.is_empty() {
            return Err(ImportError::Parse("no rows to import".to_string()).into());
        }

        let mut registry = self.registry.lock().unwrap();
        let superseded_files: Vec<String> = registry
            .iter()
            .filter(|e| e.participant_key == commit.participant_key && e.filename != commit.filename)
            .map(|e| e.filename.clone())
            .collect();
        registry.retain(|e| !superseded_files.contains(&e.filename));

        let mut samples = self.samples.lock().unwrap();
        samples.retain(|s| s.filename != commit.filename && !superseded_files.contains(&s.filename));

        let start = staged.iter().map(|s| s.timestamp.date()).min();
        let end = staged.iter().map(|s| s.timestamp.date()).max();
        let rows_written = staged.len();
        samples.extend(staged);

        if let Some(entry) = registry.iter_mut().find(|e| e.filename == commit.filename) {
            entry.status = ImportStatus::Imported;
            entry.file_hash = commit.file_hash.clone();
            entry.file_size = commit.file_size;
            entry.last_modified = commit.last_modified;
            entry.total_records = rows_written as i64;
            entry.date_range_start = start;
            entry.date_range_end = end;
            entry.import_date = Some(commit.import_date);
            entry.error_message = None;
        }

        Ok(CommitSummary {
            rows_written,
            batches_written,
            superseded_files,
            date_range_start: start,
            date_range_end: end,
        })
    }

    fn mark_error(&self, filename: &str, message: &str) -> Result<()> {
        if let Some(entry) = self
            .registry
            .lock()
            .unwrap()
            .iter_mut()
            .find(|e| e.filename == filename && e.status != ImportStatus::Imported)
        {
            entry.status = ImportStatus::Error;
            entry.error_message = Some(message.to_string());
        }
        Ok(())
    }

    fn delete_imported_file(&self, filename: &str) -> Result<FileDeletionSummary> {
        let mut registry = self.registry.lock().unwrap();
        let before = registry.len();
        registry.retain(|e| e.filename != filename);
        let mut samples = self.samples.lock().unwrap();
        let samples_before = samples.len();
        samples.retain(|s| s.filename != filename);
        Ok(FileDeletionSummary {
            filename: filename.to_string(),
            rows_deleted: vec![
                ("raw_activity_data".to_string(), samples_before - samples.len()),
                ("file_registry".to_string(), before - registry.len()),
            ],
        })
    }

    fn get_import_statistics(&self) -> Result<ImportStatistics> {
        Ok(ImportStatistics::default())
    }
}

impl SleepMetricsRepositoryTrait for InMemoryStore {
    fn save(&self, record: &SleepMetricsRecord) -> Result<()> {
        self.metrics.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn save_atomic(&self, record: &SleepMetricsRecord) -> Result<()> {
        self.save(record)
    }

    fn load(&self, filename: &str, analysis_date: NaiveDate) -> Result<Option<SleepMetricsRecord>> {
        Ok(self
            .metrics
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.filename == filename && m.analysis_date == analysis_date)
            .cloned())
    }

    fn load_for_file(&self, filename: &str) -> Result<Vec<SleepMetricsRecord>> {
        Ok(self
            .metrics
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.filename == filename)
            .cloned()
            .collect())
    }

    fn load_all(&self) -> Result<Vec<SleepMetricsRecord>> {
        Ok(self.metrics.lock().unwrap().clone())
    }

    fn delete_for_date(&self, filename: &str, analysis_date: NaiveDate) -> Result<usize> {
        let mut metrics = self.metrics.lock().unwrap();
        let before = metrics.len();
        metrics.retain(|m| !(m.filename == filename && m.analysis_date == analysis_date));
        Ok(before - metrics.len())
    }

    fn load_markers(&self, _filename: &str, analysis_date: NaiveDate) -> Result<DailySleepMarkers> {
        Ok(DailySleepMarkers::new(analysis_date))
    }

    fn save_autosave(&self, _autosave: &AutosaveMetrics) -> Result<()> {
        Ok(())
    }

    fn load_autosave(
        &self,
        _filename: &str,
        _analysis_date: NaiveDate,
    ) -> Result<Option<AutosaveMetrics>> {
        Ok(None)
    }

    fn delete_autosave(&self, _filename: &str, _analysis_date: NaiveDate) -> Result<usize> {
        Ok(0)
    }
}

impl NonwearRepositoryTrait for InMemoryStore {
    fn save_manual_markers(&self, filename: &str, markers: &DailyNonwearMarkers) -> Result<usize> {
        let mut stored = self.nonwear.lock().unwrap();
        stored.retain(|(f, m)| !(f == filename && m.sleep_date == markers.sleep_date));
        stored.push((filename.to_string(), markers.clone()));
        Ok(markers.markers().count())
    }

    fn load_manual_markers(&self, filename: &str, sleep_date: NaiveDate) -> Result<DailyNonwearMarkers> {
        Ok(self
            .nonwear
            .lock()
            .unwrap()
            .iter()
            .find(|(f, m)| f == filename && m.sleep_date == sleep_date)
            .map(|(_, m)| m.clone())
            .unwrap_or_else(|| DailyNonwearMarkers::new(sleep_date)))
    }

    fn delete_manual_markers(&self, filename: &str, sleep_date: NaiveDate) -> Result<usize> {
        let mut stored = self.nonwear.lock().unwrap();
        let before = stored.len();
        stored.retain(|(f, m)| !(f == filename && m.sleep_date == sleep_date));
        Ok(before - stored.len())
    }

    fn save_sensor_periods(&self, _filename: &str, periods: &[NonwearPeriod]) -> Result<usize> {
        Ok(periods.len())
    }

    fn load_sensor_periods(&self, _filename: &str) -> Result<Vec<NonwearPeriod>> {
        Ok(Vec::new())
    }

    fn save_algorithm_periods(
        &self,
        _filename: &str,
        _algorithm: &str,
        periods: &[NonwearPeriod],
    ) -> Result<usize> {
        Ok(periods.len())
    }

    fn load_algorithm_periods(&self, _filename: &str, _algorithm: &str) -> Result<Vec<NonwearPeriod>> {
        Ok(Vec::new())
    }
}

impl DiaryRepositoryTrait for InMemoryStore {
    fn register_diary_file(&self, _entry: &DiaryFileEntry) -> Result<()> {
        Ok(())
    }

    fn save_entries(&self, entries: &[DiaryEntry]) -> Result<usize> {
        self.diary.lock().unwrap().extend_from_slice(entries);
        Ok(entries.len())
    }

    fn load_entry(&self, participant_key: &str, diary_date: NaiveDate) -> Result<Option<DiaryEntry>> {
        if self
            .failing_diary_keys
            .lock()
            .unwrap()
            .iter()
            .any(|k| k == participant_key)
        {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "diary table locked".to_string(),
            )));
        }
        Ok(self
            .diary
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.participant_key == participant_key && e.diary_date == diary_date)
            .cloned())
    }

    fn load_entries(&self, participant_key: &str) -> Result<Vec<DiaryEntry>> {
        Ok(self
            .diary
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.participant_key == participant_key)
            .cloned()
            .collect())
    }

    fn save_nap_periods(
        &self,
        _filename: &str,
        _participant_key: &str,
        _diary_date: NaiveDate,
        periods: &[DiaryPeriod],
    ) -> Result<usize> {
        Ok(periods.len())
    }

    fn save_nonwear_periods(
        &self,
        _filename: &str,
        _participant_key: &str,
        _diary_date: NaiveDate,
        periods: &[DiaryPeriod],
    ) -> Result<usize> {
        Ok(periods.len())
    }

    fn load_nap_periods(&self, _filename: &str, _diary_date: NaiveDate) -> Result<Vec<DiaryPeriod>> {
        Ok(Vec::new())
    }

    fn load_nonwear_periods(&self, _filename: &str, _diary_date: NaiveDate) -> Result<Vec<DiaryPeriod>> {
        Ok(Vec::new())
    }

    fn save_raw_rows(&self, rows: &[DiaryRawRow]) -> Result<usize> {
        Ok(rows.len())
    }

    fn delete_diary_file(&self, _filename: &str) -> Result<usize> {
        Ok(0)
    }
}
