use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel::upsert::excluded;
use diesel::SqliteConnection;
use log::{debug, info, warn};
use std::sync::Arc;

use sleepscope_core::activity::RawActivitySample;
use sleepscope_core::errors::{DatabaseError, ImportError};
use sleepscope_core::file_registry::{
    CommitSummary, FileDeletionSummary, FileRegistryEntry, FileRegistryRepositoryTrait,
    ImportCommit, ImportStatistics, ImportStatus, NewFileRegistration,
};
use sleepscope_core::schema_guard::{tables, SchemaGuard};
use sleepscope_core::validation::{format_date, format_timestamp, require_text};
use sleepscope_core::Result;

use super::model::{
    FileRegistryDB, NewFileRegistryDB, NewRawActivityDB, RAW_ACTIVITY_INSERT_PARAMS,
};
use crate::db::ConnectionScope;
use crate::errors::{IntoCore, StorageError};
use crate::schema::{file_registry, raw_activity_data};
use crate::utils::{chunk_for_sqlite, chunk_rows_for_insert};

/// Tables cleared by a file delete, children before parents.
const FILE_SCOPED_TABLES: &[&str] = &[
    tables::SLEEP_MARKERS_EXTENDED,
    tables::SLEEP_METRICS,
    tables::AUTOSAVE_METRICS,
    tables::NONWEAR_SENSOR_PERIODS,
    tables::MANUAL_NONWEAR_MARKERS,
    tables::ALGORITHM_NONWEAR_PERIODS,
    tables::RAW_ACTIVITY_DATA,
    tables::FILE_REGISTRY,
];

/// Tables created by an optional migration; skipped when absent.
const OPTIONAL_TABLES: &[&str] = &[tables::AUTOSAVE_METRICS];

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

pub struct FileRegistryRepository {
    scope: ConnectionScope,
    guard: Arc<SchemaGuard>,
}

impl FileRegistryRepository {
    pub fn new(scope: ConnectionScope, guard: Arc<SchemaGuard>) -> Self {
        FileRegistryRepository { scope, guard }
    }

    fn table_exists(conn: &mut SqliteConnection, table: &str) -> Result<bool> {
        let row = diesel::sql_query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind::<Text, _>(table)
        .get_result::<CountRow>(conn)
        .into_core()?;
        Ok(row.count > 0)
    }

    /// Removes other filenames registered under the participant key, raw
    /// rows first.
    fn purge_superseded(conn: &mut SqliteConnection, commit: &ImportCommit) -> Result<Vec<String>> {
        let superseded: Vec<String> = file_registry::table
            .filter(file_registry::participant_key.eq(&commit.participant_key))
            .filter(file_registry::filename.ne(&commit.filename))
            .select(file_registry::filename)
            .order(file_registry::filename.asc())
            .load::<String>(conn)
            .map_err(StorageError::from)?;

        for chunk in chunk_for_sqlite(&superseded) {
            let raw_deleted = diesel::delete(
                raw_activity_data::table.filter(raw_activity_data::filename.eq_any(chunk)),
            )
            .execute(conn)
            .map_err(StorageError::from)?;
            diesel::delete(file_registry::table.filter(file_registry::filename.eq_any(chunk)))
                .execute(conn)
                .map_err(StorageError::from)?;
            debug!("Purged {} raw rows of superseded files {:?}", raw_deleted, chunk);
        }

        if !superseded.is_empty() {
            info!(
                "{} supersedes {:?} for participant {}",
                commit.filename, superseded, commit.participant_key
            );
        }
        Ok(superseded)
    }
}

impl FileRegistryRepositoryTrait for FileRegistryRepository {
    fn find_by_filename(&self, filename: &str) -> Result<Option<FileRegistryEntry>> {
        require_text("filename", filename)?;
        self.scope.read(|conn| {
            file_registry::table
                .find(filename)
                .select(FileRegistryDB::as_select())
                .first::<FileRegistryDB>(conn)
                .optional()
                .map_err(StorageError::from)?
                .map(FileRegistryEntry::try_from)
                .transpose()
        })
    }

    fn find_by_participant_key(&self, participant_key: &str) -> Result<Option<FileRegistryEntry>> {
        require_text("participant_key", participant_key)?;
        let rows = self.scope.read(|conn| {
            file_registry::table
                .filter(file_registry::participant_key.eq(participant_key))
                .select(FileRegistryDB::as_select())
                .load::<FileRegistryDB>(conn)
                .into_core()
        })?;

        let mut entries = rows
            .into_iter()
            .map(FileRegistryEntry::try_from)
            .collect::<Result<Vec<_>>>()?;

        // Imported first, then the most recently touched row.
        entries.sort_by(|a, b| {
            let touched = |e: &FileRegistryEntry| -> Option<NaiveDateTime> {
                e.import_date.or(e.last_modified)
            };
            (b.status == ImportStatus::Imported)
                .cmp(&(a.status == ImportStatus::Imported))
                .then_with(|| touched(b).cmp(&touched(a)))
                .then_with(|| a.filename.cmp(&b.filename))
        });
        Ok(entries.into_iter().next())
    }

    fn list_imported(&self) -> Result<Vec<FileRegistryEntry>> {
        let rows = self.scope.read(|conn| {
            file_registry::table
                .filter(file_registry::status.eq(ImportStatus::Imported.as_str()))
                .order((
                    file_registry::participant_key.asc(),
                    file_registry::filename.asc(),
                ))
                .select(FileRegistryDB::as_select())
                .load::<FileRegistryDB>(conn)
                .into_core()
        })?;
        rows.into_iter().map(FileRegistryEntry::try_from).collect()
    }

    fn register_importing(&self, registration: &NewFileRegistration) -> Result<()> {
        require_text("filename", &registration.filename)?;
        require_text("file_hash", &registration.file_hash)?;
        require_text("participant_key", &registration.participant.key)?;

        let row = NewFileRegistryDB::from(registration);
        self.scope.write(|conn| {
            let current = file_registry::table
                .find(&row.filename)
                .select(file_registry::status)
                .first::<String>(conn)
                .optional()
                .map_err(StorageError::from)?;
            if current.as_deref() == Some(ImportStatus::Imported.as_str()) {
                debug!("{} stays imported until the new commit lands", row.filename);
                return Ok(());
            }

            diesel::insert_into(file_registry::table)
                .values(&row)
                .on_conflict(file_registry::filename)
                .do_update()
                .set((
                    file_registry::file_hash.eq(excluded(file_registry::file_hash)),
                    file_registry::participant_key.eq(excluded(file_registry::participant_key)),
                    file_registry::participant_id.eq(excluded(file_registry::participant_id)),
                    file_registry::participant_group.eq(excluded(file_registry::participant_group)),
                    file_registry::participant_timepoint
                        .eq(excluded(file_registry::participant_timepoint)),
                    file_registry::file_size.eq(excluded(file_registry::file_size)),
                    file_registry::last_modified.eq(excluded(file_registry::last_modified)),
                    file_registry::status.eq(ImportStatus::Importing.as_str()),
                    file_registry::error_message.eq(None::<String>),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
            Ok(())
        })?;
        debug!("Registered {}", registration.filename);
        Ok(())
    }

    fn commit_import(
        &self,
        commit: &ImportCommit,
        batches: &mut dyn Iterator<Item = Vec<RawActivitySample>>,
        on_batch: &mut dyn FnMut(usize),
    ) -> Result<CommitSummary> {
        require_text("filename", &commit.filename)?;
        require_text("participant_key", &commit.participant_key)?;

        self.scope.write(|conn| {
            let replaced = diesel::delete(
                raw_activity_data::table.filter(raw_activity_data::filename.eq(&commit.filename)),
            )
            .execute(conn)
            .map_err(StorageError::from)?;
            if replaced > 0 {
                debug!("Replacing {} existing rows of {}", replaced, commit.filename);
            }

            let superseded_files = Self::purge_superseded(conn, commit)?;

            let mut rows_written = 0usize;
            let mut batches_written = 0usize;
            let mut first: Option<NaiveDateTime> = None;
            let mut last: Option<NaiveDateTime> = None;

            for batch in &mut *batches {
                if batch.is_empty() {
                    continue;
                }
                let rows: Vec<NewRawActivityDB> = batch.iter().map(NewRawActivityDB::from).collect();
                for chunk in chunk_rows_for_insert(&rows, RAW_ACTIVITY_INSERT_PARAMS) {
                    diesel::insert_into(raw_activity_data::table)
                        .values(chunk)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                for sample in &batch {
                    first = Some(first.map_or(sample.timestamp, |f| f.min(sample.timestamp)));
                    last = Some(last.map_or(sample.timestamp, |l| l.max(sample.timestamp)));
                }
                rows_written += batch.len();
                batches_written += 1;
                on_batch(rows_written);
            }

            if rows_written == 0 {
                return Err(ImportError::Parse(format!(
                    "{} has no rows with usable values",
                    commit.filename
                ))
                .into());
            }

            let date_range_start = first.map(|ts| format_date(&ts.date()));
            let date_range_end = last.map(|ts| format_date(&ts.date()));
            let updated = diesel::update(file_registry::table.find(&commit.filename))
                .set((
                    file_registry::status.eq(ImportStatus::Imported.as_str()),
                    file_registry::file_hash.eq(&commit.file_hash),
                    file_registry::file_size.eq(commit.file_size),
                    file_registry::last_modified
                        .eq(commit.last_modified.as_ref().map(format_timestamp)),
                    file_registry::date_range_start.eq(&date_range_start),
                    file_registry::date_range_end.eq(&date_range_end),
                    file_registry::total_records.eq(rows_written as i64),
                    file_registry::import_date.eq(Some(format_timestamp(&commit.import_date))),
                    file_registry::error_message.eq(None::<String>),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
            if updated == 0 {
                return Err(DatabaseError::NotFound(format!(
                    "{} is not registered",
                    commit.filename
                ))
                .into());
            }

            Ok(CommitSummary {
                rows_written,
                batches_written,
                superseded_files,
                date_range_start: first.map(|ts| ts.date()),
                date_range_end: last.map(|ts| ts.date()),
            })
        })
    }

    fn mark_error(&self, filename: &str, message: &str) -> Result<()> {
        require_text("filename", filename)?;
        let updated = self.scope.write(|conn| {
            diesel::update(
                file_registry::table
                    .filter(file_registry::filename.eq(filename))
                    .filter(file_registry::status.ne(ImportStatus::Imported.as_str())),
            )
            .set((
                file_registry::status.eq(ImportStatus::Error.as_str()),
                file_registry::error_message.eq(Some(message)),
            ))
            .execute(conn)
            .into_core()
        })?;
        if updated == 0 {
            if self.find_by_filename(filename)?.is_some() {
                warn!("Re-import of {} failed, previous data kept: {}", filename, message);
                return Ok(());
            }
            return Err(DatabaseError::NotFound(format!("{} is not registered", filename)).into());
        }
        warn!("Marked {} as failed: {}", filename, message);
        Ok(())
    }

    fn delete_imported_file(&self, filename: &str) -> Result<FileDeletionSummary> {
        require_text("filename", filename)?;
        let targets = FILE_SCOPED_TABLES
            .iter()
            .map(|t| self.guard.validate_table(t))
            .collect::<Result<Vec<&str>>>()?;

        let summary = self.scope.write(|conn| {
            let mut summary = FileDeletionSummary {
                filename: filename.to_string(),
                rows_deleted: Vec::with_capacity(targets.len()),
            };
            for table in targets {
                if OPTIONAL_TABLES.contains(&table) && !Self::table_exists(conn, table)? {
                    debug!("Skipping missing table {}", table);
                    continue;
                }
                let deleted = diesel::sql_query(format!("DELETE FROM {} WHERE filename = ?", table))
                    .bind::<Text, _>(filename)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                summary.rows_deleted.push((table.to_string(), deleted));
            }
            Ok(summary)
        })?;

        info!(
            "Deleted {} ({} rows across {} tables)",
            filename,
            summary.total(),
            summary.rows_deleted.len()
        );
        Ok(summary)
    }

    fn get_import_statistics(&self) -> Result<ImportStatistics> {
        self.scope.read(|conn| {
            let by_status = file_registry::table
                .group_by(file_registry::status)
                .select((file_registry::status, diesel::dsl::count_star()))
                .load::<(String, i64)>(conn)
                .map_err(StorageError::from)?;
            let total_activity_rows = raw_activity_data::table
                .count()
                .get_result::<i64>(conn)
                .map_err(StorageError::from)?;

            let mut stats = ImportStatistics {
                total_activity_rows,
                ..Default::default()
            };
            for (status, count) in by_status {
                stats.total_files += count;
                match status.parse::<ImportStatus>() {
                    Ok(ImportStatus::Imported) => stats.imported_files += count,
                    Ok(ImportStatus::Importing) => stats.importing_files += count,
                    Ok(ImportStatus::Error) => stats.error_files += count,
                    Err(_) => warn!("Unknown registry status '{}'", status),
                }
            }
            Ok(stats)
        })
    }
}
