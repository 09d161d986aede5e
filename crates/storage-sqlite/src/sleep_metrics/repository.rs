use chrono::{Local, NaiveDate};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel::SqliteConnection;
use log::{debug, info};
use std::collections::HashMap;

use sleepscope_core::constants::MAX_SLEEP_PERIODS;
use sleepscope_core::sleep_metrics::{
    AutosaveMetrics, DailySleepMarkers, SleepMetricsRecord, SleepMetricsRepositoryTrait,
    SleepPeriod,
};
use sleepscope_core::validation::{format_date, require_slot, require_text};
use sleepscope_core::Result;

use super::model::{
    AutosaveDB, NewAutosaveDB, NewSleepMarkerDB, NewSleepMetricsDB, SleepMarkerDB, SleepMetricsDB,
};
use crate::db::ConnectionScope;
use crate::errors::IntoCore;
use crate::schema::{autosave_metrics, sleep_markers_extended, sleep_metrics};

pub struct SleepMetricsRepository {
    scope: ConnectionScope,
}

impl SleepMetricsRepository {
    pub fn new(scope: ConnectionScope) -> Self {
        SleepMetricsRepository { scope }
    }

    fn validate_record(record: &SleepMetricsRecord) -> Result<()> {
        require_text("filename", &record.filename)?;
        require_text("participant_key", &record.participant_key)?;
        for period in &record.periods {
            require_slot("marker_index", period.marker_index, MAX_SLEEP_PERIODS)?;
        }
        Ok(())
    }

    fn upsert_summary(conn: &mut SqliteConnection, row: &NewSleepMetricsDB) -> Result<usize> {
        diesel::insert_into(sleep_metrics::table)
            .values(row)
            .on_conflict((sleep_metrics::filename, sleep_metrics::analysis_date))
            .do_update()
            .set(row)
            .execute(conn)
            .into_core()
    }

    fn load_periods(
        conn: &mut SqliteConnection,
        filename: &str,
        analysis_date: &str,
    ) -> Result<Vec<SleepPeriod>> {
        sleep_markers_extended::table
            .filter(sleep_markers_extended::filename.eq(filename))
            .filter(sleep_markers_extended::analysis_date.eq(analysis_date))
            .order(sleep_markers_extended::marker_index.asc())
            .select(SleepMarkerDB::as_select())
            .load::<SleepMarkerDB>(conn)
            .into_core()?
            .into_iter()
            .map(SleepPeriod::try_from)
            .collect()
    }

    /// Attaches marker rows to their summaries by `(filename, analysis_date)`.
    fn assemble(
        summaries: Vec<SleepMetricsDB>,
        markers: Vec<SleepMarkerDB>,
    ) -> Result<Vec<SleepMetricsRecord>> {
        let mut grouped: HashMap<(String, String), Vec<SleepPeriod>> = HashMap::new();
        for marker in markers {
            let key = (marker.filename.clone(), marker.analysis_date.clone());
            grouped.entry(key).or_default().push(SleepPeriod::try_from(marker)?);
        }
        summaries
            .into_iter()
            .map(|summary| {
                let key = (summary.filename.clone(), summary.analysis_date.clone());
                let periods = grouped.remove(&key).unwrap_or_default();
                summary.into_record(periods)
            })
            .collect()
    }
}

impl SleepMetricsRepositoryTrait for SleepMetricsRepository {
    fn save(&self, record: &SleepMetricsRecord) -> Result<()> {
        Self::validate_record(record)?;
        let row = NewSleepMetricsDB::from_record(record, &Local::now().naive_local());
        self.scope.write(|conn| Self::upsert_summary(conn, &row))?;
        debug!(
            "Saved sleep metrics for {} on {}",
            record.filename, record.analysis_date
        );
        Ok(())
    }

    fn save_atomic(&self, record: &SleepMetricsRecord) -> Result<()> {
        Self::validate_record(record)?;
        let now = Local::now().naive_local();
        let row = NewSleepMetricsDB::from_record(record, &now);
        let markers: Vec<NewSleepMarkerDB> = record
            .periods
            .iter()
            .map(|p| NewSleepMarkerDB::from_period(&record.filename, &row.analysis_date, p, &now))
            .collect();

        self.scope.write(|conn| {
            diesel::delete(
                sleep_markers_extended::table
                    .filter(sleep_markers_extended::filename.eq(&row.filename))
                    .filter(sleep_markers_extended::analysis_date.eq(&row.analysis_date)),
            )
            .execute(conn)
            .into_core()?;
            diesel::delete(
                sleep_metrics::table
                    .filter(sleep_metrics::filename.eq(&row.filename))
                    .filter(sleep_metrics::analysis_date.eq(&row.analysis_date)),
            )
            .execute(conn)
            .into_core()?;

            diesel::insert_into(sleep_metrics::table)
                .values(&row)
                .execute(conn)
                .into_core()?;
            if !markers.is_empty() {
                diesel::insert_into(sleep_markers_extended::table)
                    .values(&markers)
                    .execute(conn)
                    .into_core()?;
            }
            Ok(())
        })?;

        info!(
            "Saved sleep metrics and {} markers for {} on {}",
            markers.len(),
            record.filename,
            record.analysis_date
        );
        Ok(())
    }

    fn load(&self, filename: &str, analysis_date: NaiveDate) -> Result<Option<SleepMetricsRecord>> {
        require_text("filename", filename)?;
        let day = format_date(&analysis_date);
        self.scope.read(|conn| {
            let summary = sleep_metrics::table
                .filter(sleep_metrics::filename.eq(filename))
                .filter(sleep_metrics::analysis_date.eq(&day))
                .select(SleepMetricsDB::as_select())
                .first::<SleepMetricsDB>(conn)
                .optional()
                .into_core()?;
            match summary {
                Some(summary) => {
                    let periods = Self::load_periods(conn, filename, &day)?;
                    summary.into_record(periods).map(Some)
                }
                None => Ok(None),
            }
        })
    }

    fn load_for_file(&self, filename: &str) -> Result<Vec<SleepMetricsRecord>> {
        require_text("filename", filename)?;
        let (summaries, markers) = self.scope.read(|conn| {
            let summaries = sleep_metrics::table
                .filter(sleep_metrics::filename.eq(filename))
                .order(sleep_metrics::analysis_date.asc())
                .select(SleepMetricsDB::as_select())
                .load::<SleepMetricsDB>(conn)
                .into_core()?;
            let markers = sleep_markers_extended::table
                .filter(sleep_markers_extended::filename.eq(filename))
                .order(sleep_markers_extended::marker_index.asc())
                .select(SleepMarkerDB::as_select())
                .load::<SleepMarkerDB>(conn)
                .into_core()?;
            Ok((summaries, markers))
        })?;
        Self::assemble(summaries, markers)
    }

    fn load_all(&self) -> Result<Vec<SleepMetricsRecord>> {
        let (summaries, markers) = self.scope.read(|conn| {
            let summaries = sleep_metrics::table
                .order((
                    sleep_metrics::participant_key.asc(),
                    sleep_metrics::analysis_date.asc(),
                    sleep_metrics::filename.asc(),
                ))
                .select(SleepMetricsDB::as_select())
                .load::<SleepMetricsDB>(conn)
                .into_core()?;
            let markers = sleep_markers_extended::table
                .order(sleep_markers_extended::marker_index.asc())
                .select(SleepMarkerDB::as_select())
                .load::<SleepMarkerDB>(conn)
                .into_core()?;
            Ok((summaries, markers))
        })?;
        Self::assemble(summaries, markers)
    }

    fn delete_for_date(&self, filename: &str, analysis_date: NaiveDate) -> Result<usize> {
        require_text("filename", filename)?;
        let day = format_date(&analysis_date);
        let deleted = self.scope.write(|conn| {
            let markers = diesel::delete(
                sleep_markers_extended::table
                    .filter(sleep_markers_extended::filename.eq(filename))
                    .filter(sleep_markers_extended::analysis_date.eq(&day)),
            )
            .execute(conn)
            .into_core()?;
            let summaries = diesel::delete(
                sleep_metrics::table
                    .filter(sleep_metrics::filename.eq(filename))
                    .filter(sleep_metrics::analysis_date.eq(&day)),
            )
            .execute(conn)
            .into_core()?;
            Ok(markers + summaries)
        })?;
        debug!("Deleted {} sleep rows for {} on {}", deleted, filename, day);
        Ok(deleted)
    }

    fn load_markers(&self, filename: &str, analysis_date: NaiveDate) -> Result<DailySleepMarkers> {
        require_text("filename", filename)?;
        let day = format_date(&analysis_date);
        let periods = self
            .scope
            .read(|conn| Self::load_periods(conn, filename, &day))?;
        let mut markers = DailySleepMarkers::new(analysis_date);
        for period in periods {
            markers.set(period)?;
        }
        Ok(markers)
    }

    fn save_autosave(&self, autosave: &AutosaveMetrics) -> Result<()> {
        require_text("filename", &autosave.filename)?;
        let row = NewAutosaveDB::from(autosave);
        self.scope.write(|conn| {
            diesel::insert_into(autosave_metrics::table)
                .values(&row)
                .on_conflict((autosave_metrics::filename, autosave_metrics::analysis_date))
                .do_update()
                .set((
                    autosave_metrics::payload.eq(excluded(autosave_metrics::payload)),
                    autosave_metrics::saved_at.eq(excluded(autosave_metrics::saved_at)),
                ))
                .execute(conn)
                .into_core()
        })?;
        Ok(())
    }

    fn load_autosave(
        &self,
        filename: &str,
        analysis_date: NaiveDate,
    ) -> Result<Option<AutosaveMetrics>> {
        require_text("filename", filename)?;
        let row = self.scope.read(|conn| {
            autosave_metrics::table
                .filter(autosave_metrics::filename.eq(filename))
                .filter(autosave_metrics::analysis_date.eq(format_date(&analysis_date)))
                .select(AutosaveDB::as_select())
                .first::<AutosaveDB>(conn)
                .optional()
                .into_core()
        })?;
        row.map(AutosaveMetrics::try_from).transpose()
    }

    fn delete_autosave(&self, filename: &str, analysis_date: NaiveDate) -> Result<usize> {
        require_text("filename", filename)?;
        self.scope.write(|conn| {
            diesel::delete(
                autosave_metrics::table
                    .filter(autosave_metrics::filename.eq(filename))
                    .filter(autosave_metrics::analysis_date.eq(format_date(&analysis_date))),
            )
            .execute(conn)
            .into_core()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{date, setup, ts};
    use serde_json::json;
    use sleepscope_core::errors::{DatabaseError, Error};
    use sleepscope_core::participant::extract_participant_info;
    use sleepscope_core::sleep_metrics::MarkerType;

    const FILE: &str = "4002 T1 G1.csv";

    fn repo() -> (SleepMetricsRepository, tempfile::TempDir) {
        let (scope, _, dir) = setup();
        (SleepMetricsRepository::new(scope), dir)
    }

    fn period(index: i32, kind: MarkerType, onset: &str, offset: &str) -> SleepPeriod {
        SleepPeriod {
            marker_index: index,
            marker_type: kind,
            onset: Some(ts(onset)),
            offset: Some(ts(offset)),
        }
    }

    fn record(day: &str) -> SleepMetricsRecord {
        let mut record =
            SleepMetricsRecord::new(FILE, &extract_participant_info(FILE), date(day));
        record.onset_timestamp = Some(ts(&format!("{} 22:30:00", day)));
        record.total_sleep_time = Some(412.0);
        record.sleep_efficiency = Some(88.5);
        record.awakenings = Some(3);
        record.sleep_algorithm = Some("sadeh_1994".to_string());
        record.period_metrics = json!({ "1": { "tst": 412.0 } });
        record
    }

    #[test]
    fn test_save_upserts_one_row_per_date() {
        let (repo, _dir) = repo();
        let mut first = record("2024-01-01");
        repo.save(&first).unwrap();
        first.total_sleep_time = Some(300.0);
        first.awakenings = None;
        repo.save(&first).unwrap();

        let all = repo.load_for_file(FILE).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].total_sleep_time, Some(300.0));
        assert_eq!(all[0].awakenings, None);
        assert_eq!(all[0].participant_key, "4002_T1_G1");
        assert!(all[0].updated_at.is_some());
    }

    #[test]
    fn test_save_atomic_round_trips_periods() {
        let (repo, _dir) = repo();
        let mut rec = record("2024-01-01");
        rec.periods = vec![
            period(1, MarkerType::MainSleep, "2024-01-01 22:30:00", "2024-01-02 06:45:00"),
            period(2, MarkerType::Nap, "2024-01-01 14:00:00", "2024-01-01 14:40:00"),
        ];
        repo.save_atomic(&rec).unwrap();

        let loaded = repo.load(FILE, date("2024-01-01")).unwrap().unwrap();
        assert_eq!(loaded.periods, rec.periods);
        assert_eq!(loaded.period_metrics, rec.period_metrics);
        assert_eq!(loaded.sleep_algorithm.as_deref(), Some("sadeh_1994"));

        let markers = repo.load_markers(FILE, date("2024-01-01")).unwrap();
        assert_eq!(markers.slots.len(), MAX_SLEEP_PERIODS);
        assert_eq!(markers.main_sleep().unwrap().marker_index, 1);
        assert!(markers.slots[2].is_none());
    }

    #[test]
    fn test_save_atomic_replaces_previous_markers() {
        let (repo, _dir) = repo();
        let mut rec = record("2024-01-01");
        rec.periods = vec![
            period(1, MarkerType::MainSleep, "2024-01-01 22:30:00", "2024-01-02 06:45:00"),
            period(2, MarkerType::Nap, "2024-01-01 14:00:00", "2024-01-01 14:40:00"),
        ];
        repo.save_atomic(&rec).unwrap();

        rec.periods.truncate(1);
        repo.save_atomic(&rec).unwrap();
        let loaded = repo.load(FILE, date("2024-01-01")).unwrap().unwrap();
        assert_eq!(loaded.periods.len(), 1);
    }

    #[test]
    fn test_save_atomic_failure_keeps_previous_state() {
        let (repo, _dir) = repo();
        let mut rec = record("2024-01-01");
        rec.periods = vec![period(
            1,
            MarkerType::MainSleep,
            "2024-01-01 22:30:00",
            "2024-01-02 06:45:00",
        )];
        repo.save_atomic(&rec).unwrap();

        let mut broken = record("2024-01-01");
        broken.total_sleep_time = Some(1.0);
        broken.periods = vec![
            period(2, MarkerType::Nap, "2024-01-01 13:00:00", "2024-01-01 13:30:00"),
            period(2, MarkerType::Nap, "2024-01-01 15:00:00", "2024-01-01 15:30:00"),
        ];
        let err = repo.save_atomic(&broken).unwrap_err();
        assert!(matches!(
            err,
            Error::Database(DatabaseError::IntegrityViolation(_))
        ));

        let loaded = repo.load(FILE, date("2024-01-01")).unwrap().unwrap();
        assert_eq!(loaded.total_sleep_time, Some(412.0));
        assert_eq!(loaded.periods, rec.periods);
    }

    #[test]
    fn test_save_rejects_out_of_range_slot() {
        let (repo, _dir) = repo();
        let mut rec = record("2024-01-01");
        rec.periods = vec![period(
            5,
            MarkerType::Nap,
            "2024-01-01 13:00:00",
            "2024-01-01 13:30:00",
        )];
        assert!(matches!(repo.save_atomic(&rec), Err(Error::Validation(_))));
        assert!(repo.load(FILE, date("2024-01-01")).unwrap().is_none());
    }

    #[test]
    fn test_delete_for_date_removes_summary_and_markers() {
        let (repo, _dir) = repo();
        let mut rec = record("2024-01-01");
        rec.periods = vec![period(
            1,
            MarkerType::MainSleep,
            "2024-01-01 22:30:00",
            "2024-01-02 06:45:00",
        )];
        repo.save_atomic(&rec).unwrap();
        repo.save(&record("2024-01-02")).unwrap();

        assert_eq!(repo.delete_for_date(FILE, date("2024-01-01")).unwrap(), 2);
        assert!(repo.load(FILE, date("2024-01-01")).unwrap().is_none());
        assert_eq!(repo.load_all().unwrap().len(), 1);
        assert_eq!(repo.delete_for_date(FILE, date("2024-01-01")).unwrap(), 0);
    }

    #[test]
    fn test_load_all_orders_by_participant_then_date() {
        let (repo, _dir) = repo();
        let other = "1001 T2 G3.csv";
        repo.save(&record("2024-01-02")).unwrap();
        repo.save(&record("2024-01-01")).unwrap();
        repo.save(&SleepMetricsRecord::new(
            other,
            &extract_participant_info(other),
            date("2024-03-01"),
        ))
        .unwrap();

        let keys: Vec<(String, NaiveDate)> = repo
            .load_all()
            .unwrap()
            .into_iter()
            .map(|r| (r.participant_key, r.analysis_date))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("1001_T2_G3".to_string(), date("2024-03-01")),
                ("4002_T1_G1".to_string(), date("2024-01-01")),
                ("4002_T1_G1".to_string(), date("2024-01-02")),
            ]
        );
    }

    #[test]
    fn test_autosave_upsert_load_delete() {
        let (repo, _dir) = repo();
        let mut autosave = AutosaveMetrics {
            filename: FILE.to_string(),
            analysis_date: date("2024-01-01"),
            payload: json!({ "onset": "22:30" }),
            saved_at: ts("2024-01-05 10:00:00"),
        };
        repo.save_autosave(&autosave).unwrap();
        autosave.payload = json!({ "onset": "23:00" });
        autosave.saved_at = ts("2024-01-05 10:05:00");
        repo.save_autosave(&autosave).unwrap();

        let loaded = repo.load_autosave(FILE, date("2024-01-01")).unwrap().unwrap();
        assert_eq!(loaded, autosave);
        assert_eq!(repo.delete_autosave(FILE, date("2024-01-01")).unwrap(), 1);
        assert!(repo.load_autosave(FILE, date("2024-01-01")).unwrap().is_none());
    }
}
