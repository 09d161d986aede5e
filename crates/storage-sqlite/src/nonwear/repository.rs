use chrono::{Local, NaiveDate};
use diesel::prelude::*;
use log::debug;

use sleepscope_core::constants::MAX_MANUAL_NONWEAR_SLOTS;
use sleepscope_core::errors::ValidationError;
use sleepscope_core::nonwear::{
    DailyNonwearMarkers, ManualNonwearMarker, NonwearPeriod, NonwearRepositoryTrait,
};
use sleepscope_core::validation::{format_date, require_slot, require_text};
use sleepscope_core::Result;

use super::model::{
    AlgorithmNonwearDB, ManualNonwearMarkerDB, NewAlgorithmNonwearDB, NewManualNonwearMarkerDB,
    NewSensorNonwearDB, SensorNonwearDB, ALGORITHM_NONWEAR_INSERT_PARAMS,
    SENSOR_NONWEAR_INSERT_PARAMS,
};
use crate::db::ConnectionScope;
use crate::errors::IntoCore;
use crate::schema::{algorithm_nonwear_periods, manual_nonwear_markers, nonwear_sensor_periods};
use crate::utils::chunk_rows_for_insert;

pub struct NonwearRepository {
    scope: ConnectionScope,
}

impl NonwearRepository {
    pub fn new(scope: ConnectionScope) -> Self {
        NonwearRepository { scope }
    }

    fn require_ordered(periods: &[NonwearPeriod]) -> Result<()> {
        if let Some(bad) = periods.iter().find(|p| p.end_time < p.start_time) {
            return Err(ValidationError::InvalidInput(format!(
                "Nonwear period ends before it starts ({} > {})",
                bad.start_time, bad.end_time
            ))
            .into());
        }
        Ok(())
    }
}

impl NonwearRepositoryTrait for NonwearRepository {
    fn save_manual_markers(&self, filename: &str, markers: &DailyNonwearMarkers) -> Result<usize> {
        require_text("filename", filename)?;
        if markers.slots.len() > MAX_MANUAL_NONWEAR_SLOTS {
            return Err(ValidationError::InvalidInput(format!(
                "At most {} manual nonwear slots, got {}",
                MAX_MANUAL_NONWEAR_SLOTS,
                markers.slots.len()
            ))
            .into());
        }
        for marker in markers.markers() {
            require_slot("marker_index", marker.marker_index, MAX_MANUAL_NONWEAR_SLOTS)?;
        }

        let day = format_date(&markers.sleep_date);
        let now = Local::now().naive_local();
        let rows: Vec<NewManualNonwearMarkerDB> = markers
            .markers()
            .map(|m| NewManualNonwearMarkerDB::from_marker(filename, &day, m, &now))
            .collect();

        let written = self.scope.write(|conn| {
            diesel::delete(
                manual_nonwear_markers::table
                    .filter(manual_nonwear_markers::filename.eq(filename))
                    .filter(manual_nonwear_markers::sleep_date.eq(&day)),
            )
            .execute(conn)
            .into_core()?;
            if rows.is_empty() {
                return Ok(0);
            }
            diesel::insert_into(manual_nonwear_markers::table)
                .values(&rows)
                .execute(conn)
                .into_core()
        })?;
        debug!("Stored {} manual nonwear markers for {} on {}", written, filename, day);
        Ok(written)
    }

    fn load_manual_markers(
        &self,
        filename: &str,
        sleep_date: NaiveDate,
    ) -> Result<DailyNonwearMarkers> {
        require_text("filename", filename)?;
        let rows = self.scope.read(|conn| {
            manual_nonwear_markers::table
                .filter(manual_nonwear_markers::filename.eq(filename))
                .filter(manual_nonwear_markers::sleep_date.eq(format_date(&sleep_date)))
                .order(manual_nonwear_markers::marker_index.asc())
                .select(ManualNonwearMarkerDB::as_select())
                .load::<ManualNonwearMarkerDB>(conn)
                .into_core()
        })?;

        let mut markers = DailyNonwearMarkers::new(sleep_date);
        for row in rows {
            markers.set(ManualNonwearMarker::try_from(row)?)?;
        }
        Ok(markers)
    }

    fn delete_manual_markers(&self, filename: &str, sleep_date: NaiveDate) -> Result<usize> {
        require_text("filename", filename)?;
        self.scope.write(|conn| {
            diesel::delete(
                manual_nonwear_markers::table
                    .filter(manual_nonwear_markers::filename.eq(filename))
                    .filter(manual_nonwear_markers::sleep_date.eq(format_date(&sleep_date))),
            )
            .execute(conn)
            .into_core()
        })
    }

    fn save_sensor_periods(&self, filename: &str, periods: &[NonwearPeriod]) -> Result<usize> {
        require_text("filename", filename)?;
        Self::require_ordered(periods)?;
        let rows: Vec<NewSensorNonwearDB> = periods
            .iter()
            .map(|p| NewSensorNonwearDB::from_period(filename, p))
            .collect();

        self.scope.write(|conn| {
            diesel::delete(
                nonwear_sensor_periods::table.filter(nonwear_sensor_periods::filename.eq(filename)),
            )
            .execute(conn)
            .into_core()?;
            let mut written = 0;
            for chunk in chunk_rows_for_insert(&rows, SENSOR_NONWEAR_INSERT_PARAMS) {
                written += diesel::insert_into(nonwear_sensor_periods::table)
                    .values(chunk)
                    .execute(conn)
                    .into_core()?;
            }
            Ok(written)
        })
    }

    fn load_sensor_periods(&self, filename: &str) -> Result<Vec<NonwearPeriod>> {
        require_text("filename", filename)?;
        self.scope
            .read(|conn| {
                nonwear_sensor_periods::table
                    .filter(nonwear_sensor_periods::filename.eq(filename))
                    .order(nonwear_sensor_periods::start_time.asc())
                    .select(SensorNonwearDB::as_select())
                    .load::<SensorNonwearDB>(conn)
                    .into_core()
            })?
            .into_iter()
            .map(SensorNonwearDB::into_period)
            .collect()
    }

    fn save_algorithm_periods(
        &self,
        filename: &str,
        algorithm: &str,
        periods: &[NonwearPeriod],
    ) -> Result<usize> {
        require_text("filename", filename)?;
        require_text("algorithm", algorithm)?;
        Self::require_ordered(periods)?;
        let rows: Vec<NewAlgorithmNonwearDB> = periods
            .iter()
            .map(|p| NewAlgorithmNonwearDB::from_period(filename, algorithm, p))
            .collect();

        self.scope.write(|conn| {
            diesel::delete(
                algorithm_nonwear_periods::table
                    .filter(algorithm_nonwear_periods::filename.eq(filename))
                    .filter(algorithm_nonwear_periods::algorithm_name.eq(algorithm)),
            )
            .execute(conn)
            .into_core()?;
            let mut written = 0;
            for chunk in chunk_rows_for_insert(&rows, ALGORITHM_NONWEAR_INSERT_PARAMS) {
                written += diesel::insert_into(algorithm_nonwear_periods::table)
                    .values(chunk)
                    .execute(conn)
                    .into_core()?;
            }
            Ok(written)
        })
    }

    fn load_algorithm_periods(&self, filename: &str, algorithm: &str) -> Result<Vec<NonwearPeriod>> {
        require_text("filename", filename)?;
        require_text("algorithm", algorithm)?;
        self.scope
            .read(|conn| {
                algorithm_nonwear_periods::table
                    .filter(algorithm_nonwear_periods::filename.eq(filename))
                    .filter(algorithm_nonwear_periods::algorithm_name.eq(algorithm))
                    .order(algorithm_nonwear_periods::start_time.asc())
                    .select(AlgorithmNonwearDB::as_select())
                    .load::<AlgorithmNonwearDB>(conn)
                    .into_core()
            })?
            .into_iter()
            .map(AlgorithmNonwearDB::into_period)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{date, setup, ts};
    use sleepscope_core::errors::Error;
    use sleepscope_core::nonwear::NonwearSource;

    const FILE: &str = "4002 T1 G1.csv";

    fn repo() -> (NonwearRepository, tempfile::TempDir) {
        let (scope, _, dir) = setup();
        (NonwearRepository::new(scope), dir)
    }

    fn marker(index: i32, start: &str, end: Option<&str>) -> ManualNonwearMarker {
        ManualNonwearMarker {
            marker_index: index,
            start_time: Some(ts(start)),
            end_time: end.map(ts),
        }
    }

    fn period(start: &str, end: &str, source: NonwearSource) -> NonwearPeriod {
        NonwearPeriod {
            start_time: ts(start),
            end_time: ts(end),
            duration_minutes: None,
            start_index: Some(0),
            end_index: Some(30),
            source,
        }
    }

    #[test]
    fn test_manual_markers_are_replace_set() {
        let (repo, _dir) = repo();
        let mut markers = DailyNonwearMarkers::new(date("2024-01-01"));
        markers.set(marker(1, "2024-01-01 08:00:00", Some("2024-01-01 09:00:00"))).unwrap();
        markers.set(marker(3, "2024-01-01 12:00:00", None)).unwrap();
        assert_eq!(repo.save_manual_markers(FILE, &markers).unwrap(), 2);

        let mut replacement = DailyNonwearMarkers::new(date("2024-01-01"));
        replacement
            .set(marker(2, "2024-01-01 15:00:00", Some("2024-01-01 15:30:00")))
            .unwrap();
        assert_eq!(repo.save_manual_markers(FILE, &replacement).unwrap(), 1);

        let loaded = repo.load_manual_markers(FILE, date("2024-01-01")).unwrap();
        assert_eq!(loaded, replacement);
        assert_eq!(loaded.slots.len(), MAX_MANUAL_NONWEAR_SLOTS);
    }

    #[test]
    fn test_saving_empty_container_clears_date() {
        let (repo, _dir) = repo();
        let mut markers = DailyNonwearMarkers::new(date("2024-01-01"));
        markers.set(marker(1, "2024-01-01 08:00:00", Some("2024-01-01 09:00:00"))).unwrap();
        repo.save_manual_markers(FILE, &markers).unwrap();

        let empty = DailyNonwearMarkers::new(date("2024-01-01"));
        assert_eq!(repo.save_manual_markers(FILE, &empty).unwrap(), 0);
        assert!(repo
            .load_manual_markers(FILE, date("2024-01-01"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_load_missing_date_returns_full_empty_container() {
        let (repo, _dir) = repo();
        let loaded = repo.load_manual_markers(FILE, date("2024-02-02")).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.slots.len(), MAX_MANUAL_NONWEAR_SLOTS);
        assert_eq!(repo.delete_manual_markers(FILE, date("2024-02-02")).unwrap(), 0);
    }

    #[test]
    fn test_out_of_range_slot_is_rejected() {
        let (repo, _dir) = repo();
        let mut markers = DailyNonwearMarkers::new(date("2024-01-01"));
        markers.slots.push(Some(marker(11, "2024-01-01 08:00:00", None)));
        assert!(matches!(
            repo.save_manual_markers(FILE, &markers),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_sensor_periods_replace_per_file() {
        let (repo, _dir) = repo();
        let first = vec![
            period("2024-01-01 10:00:00", "2024-01-01 10:30:00", NonwearSource::Sensor),
            period("2024-01-01 02:00:00", "2024-01-01 03:00:00", NonwearSource::Sensor),
        ];
        assert_eq!(repo.save_sensor_periods(FILE, &first).unwrap(), 2);
        repo.save_sensor_periods("other.csv", &first[..1]).unwrap();

        let loaded = repo.load_sensor_periods(FILE).unwrap();
        assert_eq!(loaded[0].start_time, ts("2024-01-01 02:00:00"));
        assert_eq!(loaded[1].effective_duration_minutes(), 30.0);

        assert_eq!(repo.save_sensor_periods(FILE, &[]).unwrap(), 0);
        assert!(repo.load_sensor_periods(FILE).unwrap().is_empty());
        assert_eq!(repo.load_sensor_periods("other.csv").unwrap().len(), 1);
    }

    #[test]
    fn test_algorithm_periods_are_scoped_by_algorithm() {
        let (repo, _dir) = repo();
        let choi = NonwearSource::Algorithm("choi".to_string());
        let vanhees = NonwearSource::Algorithm("van_hees".to_string());
        repo.save_algorithm_periods(
            FILE,
            "choi",
            &[period("2024-01-01 10:00:00", "2024-01-01 11:30:00", choi.clone())],
        )
        .unwrap();
        repo.save_algorithm_periods(
            FILE,
            "van_hees",
            &[period("2024-01-01 12:00:00", "2024-01-01 13:00:00", vanhees)],
        )
        .unwrap();

        let loaded = repo.load_algorithm_periods(FILE, "choi").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].source, choi);
        assert!(repo.load_algorithm_periods(FILE, "unknown").unwrap().is_empty());
    }

    #[test]
    fn test_reversed_period_is_rejected() {
        let (repo, _dir) = repo();
        let reversed = period("2024-01-01 11:00:00", "2024-01-01 10:00:00", NonwearSource::Sensor);
        assert!(matches!(
            repo.save_sensor_periods(FILE, &[reversed]),
            Err(Error::Validation(_))
        ));
    }
}
