use chrono::{Local, NaiveDate};
use diesel::prelude::*;
use diesel::sql_types::Text;
use log::{debug, info};
use std::sync::Arc;

use sleepscope_core::constants::{MAX_DIARY_NAP_PERIODS, MAX_DIARY_NONWEAR_PERIODS};
use sleepscope_core::diary::{
    DiaryEntry, DiaryFileEntry, DiaryPeriod, DiaryRawRow, DiaryRepositoryTrait,
};
use sleepscope_core::schema_guard::{tables, SchemaGuard};
use sleepscope_core::validation::{format_date, require_slot, require_text};
use sleepscope_core::Result;

use super::model::{
    DiaryEntryDB, DiaryFileDB, DiaryNapPeriodDB, DiaryNonwearPeriodDB, NewDiaryEntryDB,
    NewDiaryNapPeriodDB, NewDiaryNonwearPeriodDB, NewDiaryRawDB, DIARY_RAW_INSERT_PARAMS,
};
use crate::db::ConnectionScope;
use crate::errors::IntoCore;
use crate::schema::{
    diary_data, diary_file_registry, diary_nap_periods, diary_nonwear_periods, diary_raw_data,
};
use crate::utils::chunk_rows_for_insert;

/// Tables cleared by a diary file delete, registry last.
const DIARY_SCOPED_TABLES: &[&str] = &[
    tables::DIARY_NAP_PERIODS,
    tables::DIARY_NONWEAR_PERIODS,
    tables::DIARY_RAW_DATA,
    tables::DIARY_DATA,
    tables::DIARY_FILE_REGISTRY,
];

pub struct DiaryRepository {
    scope: ConnectionScope,
    guard: Arc<SchemaGuard>,
}

impl DiaryRepository {
    pub fn new(scope: ConnectionScope, guard: Arc<SchemaGuard>) -> Self {
        DiaryRepository { scope, guard }
    }

    fn require_period_slots(periods: &[DiaryPeriod], max: usize) -> Result<()> {
        for period in periods {
            require_slot("period_index", period.period_index, max)?;
        }
        Ok(())
    }
}

impl DiaryRepositoryTrait for DiaryRepository {
    fn register_diary_file(&self, entry: &DiaryFileEntry) -> Result<()> {
        require_text("filename", &entry.filename)?;
        require_text("file_hash", &entry.file_hash)?;
        let row = DiaryFileDB::from(entry);
        self.scope.write(|conn| {
            diesel::insert_into(diary_file_registry::table)
                .values(&row)
                .on_conflict(diary_file_registry::filename)
                .do_update()
                .set(&row)
                .execute(conn)
                .into_core()
        })?;
        info!("Registered diary file {} ({} entries)", entry.filename, entry.entry_count);
        Ok(())
    }

    fn save_entries(&self, entries: &[DiaryEntry]) -> Result<usize> {
        for entry in entries {
            require_text("participant_key", &entry.participant_key)?;
            require_text("filename", &entry.filename)?;
        }
        let now = Local::now().naive_local();
        let rows: Vec<NewDiaryEntryDB> = entries
            .iter()
            .map(|e| NewDiaryEntryDB::from_entry(e, &now))
            .collect();

        let saved = self.scope.write(|conn| {
            let mut saved = 0;
            for row in &rows {
                saved += diesel::insert_into(diary_data::table)
                    .values(row)
                    .on_conflict((diary_data::participant_key, diary_data::diary_date))
                    .do_update()
                    .set(row)
                    .execute(conn)
                    .into_core()?;
            }
            Ok(saved)
        })?;
        debug!("Saved {} diary entries", saved);
        Ok(saved)
    }

    fn load_entry(&self, participant_key: &str, diary_date: NaiveDate) -> Result<Option<DiaryEntry>> {
        require_text("participant_key", participant_key)?;
        let row = self.scope.read(|conn| {
            diary_data::table
                .filter(diary_data::participant_key.eq(participant_key))
                .filter(diary_data::diary_date.eq(format_date(&diary_date)))
                .select(DiaryEntryDB::as_select())
                .first::<DiaryEntryDB>(conn)
                .optional()
                .into_core()
        })?;
        row.map(DiaryEntry::try_from).transpose()
    }

    fn load_entries(&self, participant_key: &str) -> Result<Vec<DiaryEntry>> {
        require_text("participant_key", participant_key)?;
        self.scope
            .read(|conn| {
                diary_data::table
                    .filter(diary_data::participant_key.eq(participant_key))
                    .order(diary_data::diary_date.asc())
                    .select(DiaryEntryDB::as_select())
                    .load::<DiaryEntryDB>(conn)
                    .into_core()
            })?
            .into_iter()
            .map(DiaryEntry::try_from)
            .collect()
    }

    fn save_nap_periods(
        &self,
        filename: &str,
        participant_key: &str,
        diary_date: NaiveDate,
        periods: &[DiaryPeriod],
    ) -> Result<usize> {
        require_text("filename", filename)?;
        require_text("participant_key", participant_key)?;
        Self::require_period_slots(periods, MAX_DIARY_NAP_PERIODS)?;
        let day = format_date(&diary_date);
        let rows: Vec<NewDiaryNapPeriodDB> = periods
            .iter()
            .map(|p| NewDiaryNapPeriodDB::from_period(filename, participant_key, &day, p))
            .collect();

        self.scope.write(|conn| {
            diesel::delete(
                diary_nap_periods::table
                    .filter(diary_nap_periods::filename.eq(filename))
                    .filter(diary_nap_periods::diary_date.eq(&day)),
            )
            .execute(conn)
            .into_core()?;
            if rows.is_empty() {
                return Ok(0);
            }
            diesel::insert_into(diary_nap_periods::table)
                .values(&rows)
                .execute(conn)
                .into_core()
        })
    }

    fn save_nonwear_periods(
        &self,
        filename: &str,
        participant_key: &str,
        diary_date: NaiveDate,
        periods: &[DiaryPeriod],
    ) -> Result<usize> {
        require_text("filename", filename)?;
        require_text("participant_key", participant_key)?;
        Self::require_period_slots(periods, MAX_DIARY_NONWEAR_PERIODS)?;
        let day = format_date(&diary_date);
        let rows: Vec<NewDiaryNonwearPeriodDB> = periods
            .iter()
            .map(|p| NewDiaryNonwearPeriodDB::from_period(filename, participant_key, &day, p))
            .collect();

        self.scope.write(|conn| {
            diesel::delete(
                diary_nonwear_periods::table
                    .filter(diary_nonwear_periods::filename.eq(filename))
                    .filter(diary_nonwear_periods::diary_date.eq(&day)),
            )
            .execute(conn)
            .into_core()?;
            if rows.is_empty() {
                return Ok(0);
            }
            diesel::insert_into(diary_nonwear_periods::table)
                .values(&rows)
                .execute(conn)
                .into_core()
        })
    }

    fn load_nap_periods(&self, filename: &str, diary_date: NaiveDate) -> Result<Vec<DiaryPeriod>> {
        require_text("filename", filename)?;
        self.scope
            .read(|conn| {
                diary_nap_periods::table
                    .filter(diary_nap_periods::filename.eq(filename))
                    .filter(diary_nap_periods::diary_date.eq(format_date(&diary_date)))
                    .order(diary_nap_periods::period_index.asc())
                    .select(DiaryNapPeriodDB::as_select())
                    .load::<DiaryNapPeriodDB>(conn)
                    .into_core()
            })?
            .into_iter()
            .map(DiaryPeriod::try_from)
            .collect()
    }

    fn load_nonwear_periods(
        &self,
        filename: &str,
        diary_date: NaiveDate,
    ) -> Result<Vec<DiaryPeriod>> {
        require_text("filename", filename)?;
        self.scope
            .read(|conn| {
                diary_nonwear_periods::table
                    .filter(diary_nonwear_periods::filename.eq(filename))
                    .filter(diary_nonwear_periods::diary_date.eq(format_date(&diary_date)))
                    .order(diary_nonwear_periods::period_index.asc())
                    .select(DiaryNonwearPeriodDB::as_select())
                    .load::<DiaryNonwearPeriodDB>(conn)
                    .into_core()
            })?
            .into_iter()
            .map(DiaryPeriod::try_from)
            .collect()
    }

    fn save_raw_rows(&self, rows: &[DiaryRawRow]) -> Result<usize> {
        for row in rows {
            require_text("filename", &row.filename)?;
        }
        let rows: Vec<NewDiaryRawDB> = rows.iter().map(NewDiaryRawDB::from).collect();
        self.scope.write(|conn| {
            let mut written = 0;
            for chunk in chunk_rows_for_insert(&rows, DIARY_RAW_INSERT_PARAMS) {
                written += diesel::insert_into(diary_raw_data::table)
                    .values(chunk)
                    .execute(conn)
                    .into_core()?;
            }
            Ok(written)
        })
    }

    fn delete_diary_file(&self, filename: &str) -> Result<usize> {
        require_text("filename", filename)?;
        let targets = DIARY_SCOPED_TABLES
            .iter()
            .map(|t| self.guard.validate_table(t))
            .collect::<Result<Vec<&str>>>()?;

        let deleted = self.scope.write(|conn| {
            let mut deleted = 0;
            for table in targets {
                deleted += diesel::sql_query(format!("DELETE FROM {} WHERE filename = ?", table))
                    .bind::<Text, _>(filename)
                    .execute(conn)
                    .into_core()?;
            }
            Ok(deleted)
        })?;
        info!("Deleted diary file {} ({} rows)", filename, deleted);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{date, setup, ts};
    use chrono::NaiveTime;
    use serde_json::json;
    use sleepscope_core::errors::Error;

    const DIARY: &str = "diary_2024.csv";
    const KEY: &str = "4002_T1_G1";

    fn repo() -> (DiaryRepository, tempfile::TempDir) {
        let (scope, guard, dir) = setup();
        (DiaryRepository::new(scope, guard), dir)
    }

    fn t(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    fn entry(day: &str) -> DiaryEntry {
        DiaryEntry {
            participant_key: KEY.to_string(),
            diary_date: date(day),
            filename: DIARY.to_string(),
            bed_time: t(22, 15),
            sleep_onset_time: t(22, 40),
            sleep_offset_time: t(6, 30),
            out_of_bed_time: t(6, 50),
            nap_occurred: true,
            nonwear_occurred: false,
            notes: Some("late coffee".to_string()),
        }
    }

    fn register(repo: &DiaryRepository) {
        repo.register_diary_file(&DiaryFileEntry {
            filename: DIARY.to_string(),
            file_hash: "abc".to_string(),
            import_date: ts("2024-02-01 09:00:00"),
            entry_count: 2,
        })
        .unwrap();
    }

    #[test]
    fn test_entries_upsert_by_participant_and_date() {
        let (repo, _dir) = repo();
        register(&repo);
        assert_eq!(repo.save_entries(&[entry("2024-01-02"), entry("2024-01-01")]).unwrap(), 2);

        let mut changed = entry("2024-01-01");
        changed.notes = None;
        changed.bed_time = t(23, 5);
        repo.save_entries(&[changed.clone()]).unwrap();

        let loaded = repo.load_entries(KEY).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], changed);
        assert_eq!(loaded[1].diary_date, date("2024-01-02"));
        assert_eq!(
            repo.load_entry(KEY, date("2024-01-02")).unwrap(),
            Some(entry("2024-01-02"))
        );
        assert!(repo.load_entry(KEY, date("2024-03-01")).unwrap().is_none());
    }

    #[test]
    fn test_nap_periods_recompute_duration_across_midnight() {
        let (repo, _dir) = repo();
        let mut stale = DiaryPeriod::new(1, t(23, 30), t(0, 15));
        stale.duration_minutes = Some(-1.0);
        let periods = vec![stale, DiaryPeriod::new(2, t(14, 0), None)];
        assert_eq!(
            repo.save_nap_periods(DIARY, KEY, date("2024-01-01"), &periods).unwrap(),
            2
        );

        let loaded = repo.load_nap_periods(DIARY, date("2024-01-01")).unwrap();
        assert_eq!(loaded[0].duration_minutes, Some(45.0));
        assert_eq!(loaded[1].duration_minutes, None);
        assert_eq!(loaded[1].start_time, t(14, 0));
    }

    #[test]
    fn test_nonwear_periods_replace_and_keep_reason() {
        let (repo, _dir) = repo();
        let mut swim = DiaryPeriod::new(1, t(7, 0), t(8, 0));
        swim.reason = Some("swimming".to_string());
        repo.save_nonwear_periods(DIARY, KEY, date("2024-01-01"), &[swim.clone()])
            .unwrap();
        let loaded = repo.load_nonwear_periods(DIARY, date("2024-01-01")).unwrap();
        assert_eq!(loaded, vec![swim]);

        repo.save_nonwear_periods(DIARY, KEY, date("2024-01-01"), &[])
            .unwrap();
        assert!(repo
            .load_nonwear_periods(DIARY, date("2024-01-01"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_period_index_out_of_range_is_rejected() {
        let (repo, _dir) = repo();
        let periods = vec![DiaryPeriod::new(4, t(13, 0), t(13, 30))];
        assert!(matches!(
            repo.save_nap_periods(DIARY, KEY, date("2024-01-01"), &periods),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_delete_diary_file_removes_every_row() {
        let (repo, _dir) = repo();
        register(&repo);
        repo.save_entries(&[entry("2024-01-01")]).unwrap();
        repo.save_nap_periods(DIARY, KEY, date("2024-01-01"), &[DiaryPeriod::new(1, t(13, 0), t(13, 30))])
            .unwrap();
        repo.save_raw_rows(&[DiaryRawRow {
            filename: DIARY.to_string(),
            row_index: 0,
            participant_key: Some(KEY.to_string()),
            diary_date: Some(date("2024-01-01")),
            payload: json!({ "bedtime": "22:15" }),
        }])
        .unwrap();

        assert_eq!(repo.delete_diary_file(DIARY).unwrap(), 4);
        assert!(repo.load_entries(KEY).unwrap().is_empty());
        assert_eq!(repo.delete_diary_file(DIARY).unwrap(), 0);
    }
}
