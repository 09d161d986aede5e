use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use log::{debug, warn};
use std::sync::Arc;

use sleepscope_core::activity::{
    ActivityColumn, ActivityColumns, ActivityDataRepositoryTrait, ActivitySeries,
};
use sleepscope_core::errors::ValidationError;
use sleepscope_core::schema_guard::{tables, SchemaGuard};
use sleepscope_core::validation::{
    format_timestamp, parse_stored_date, parse_stored_timestamp, require_text,
};
use sleepscope_core::Result;

use super::model::{ColumnValueRow, DayRow, RawActivityDB};
use crate::db::ConnectionScope;
use crate::errors::IntoCore;
use crate::schema::raw_activity_data;

pub struct ActivityDataRepository {
    scope: ConnectionScope,
    guard: Arc<SchemaGuard>,
}

impl ActivityDataRepository {
    pub fn new(scope: ConnectionScope, guard: Arc<SchemaGuard>) -> Self {
        ActivityDataRepository { scope, guard }
    }

    /// Maps a caller-facing column name onto one of the stored value columns.
    fn resolve_value_column(&self, column: &str) -> Result<&'static str> {
        let storage_column = self.guard.resolve_column(column)?;
        ActivityColumn::ALL
            .iter()
            .map(|c| c.as_str())
            .find(|c| *c == storage_column)
            .ok_or_else(|| {
                ValidationError::InvalidInput(format!(
                    "'{}' is not an activity value column",
                    column
                ))
                .into()
            })
    }
}

impl ActivityDataRepositoryTrait for ActivityDataRepository {
    fn load_range(
        &self,
        filename: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        column: &str,
    ) -> Result<ActivitySeries> {
        require_text("filename", filename)?;
        require_text("column", column)?;
        let value_column = self.resolve_value_column(column)?;
        let table = self.guard.validate_table(tables::RAW_ACTIVITY_DATA)?;

        let mut sql = format!(
            "SELECT timestamp AS ts, {} AS value FROM {} WHERE filename = ?",
            value_column, table
        );
        if start.is_some() {
            sql.push_str(" AND timestamp >= ?");
        }
        if end.is_some() {
            sql.push_str(" AND timestamp < ?");
        }
        sql.push_str(" ORDER BY timestamp");

        let mut query = sql_query(sql)
            .into_boxed::<Sqlite>()
            .bind::<Text, _>(filename.to_string());
        if let Some(start) = start {
            query = query.bind::<Text, _>(format_timestamp(&start));
        }
        if let Some(end) = end {
            query = query.bind::<Text, _>(format_timestamp(&end));
        }

        let rows = self
            .scope
            .read(|conn| query.load::<ColumnValueRow>(conn).into_core())?;

        let mut series = ActivitySeries::default();
        let mut skipped = 0usize;
        for row in rows {
            match (parse_stored_timestamp(&row.ts), row.value) {
                (Ok(ts), Some(value)) => {
                    series.timestamps.push(ts);
                    series.values.push(value.max(0.0));
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(
                "Skipped {} rows of {} with unreadable timestamps or missing {}",
                skipped, filename, value_column
            );
        }
        debug!("Loaded {} {} values from {}", series.len(), value_column, filename);
        Ok(series)
    }

    fn load_all_columns(
        &self,
        filename: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<ActivityColumns> {
        require_text("filename", filename)?;
        let rows = self.scope.read(|conn| {
            let mut query = raw_activity_data::table
                .filter(raw_activity_data::filename.eq(filename))
                .into_boxed();
            if let Some(start) = start {
                query = query.filter(raw_activity_data::timestamp.ge(format_timestamp(&start)));
            }
            if let Some(end) = end {
                query = query.filter(raw_activity_data::timestamp.lt(format_timestamp(&end)));
            }
            query
                .order(raw_activity_data::timestamp.asc())
                .select(RawActivityDB::as_select())
                .load::<RawActivityDB>(conn)
                .into_core()
        })?;

        let mut columns = ActivityColumns::default();
        let mut skipped = 0usize;
        for row in rows {
            let Ok(ts) = parse_stored_timestamp(&row.timestamp) else {
                skipped += 1;
                continue;
            };
            columns.timestamps.push(ts);
            columns.axis_y.push(row.axis_y.unwrap_or(0.0));
            columns.axis_x.push(row.axis_x.unwrap_or(0.0));
            columns.axis_z.push(row.axis_z.unwrap_or(0.0));
            columns
                .vector_magnitude
                .push(row.vector_magnitude.unwrap_or(0.0));
        }
        if skipped > 0 {
            warn!("Skipped {} rows of {} with unreadable timestamps", skipped, filename);
        }
        Ok(columns)
    }

    fn get_file_dates(&self, filename: &str) -> Result<Vec<NaiveDate>> {
        require_text("filename", filename)?;
        let table = self.guard.validate_table(tables::RAW_ACTIVITY_DATA)?;
        let rows = self.scope.read(|conn| {
            sql_query(format!(
                "SELECT DISTINCT substr(timestamp, 1, 10) AS day FROM {} \
                 WHERE filename = ? ORDER BY day",
                table
            ))
            .bind::<Text, _>(filename)
            .load::<DayRow>(conn)
            .into_core()
        })?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match parse_stored_date(&row.day) {
                Ok(day) => Some(day),
                Err(_) => {
                    warn!("Ignoring unreadable date '{}' in {}", row.day, filename);
                    None
                }
            })
            .collect())
    }

    fn count_rows(&self, filename: &str) -> Result<i64> {
        require_text("filename", filename)?;
        self.scope.read(|conn| {
            raw_activity_data::table
                .filter(raw_activity_data::filename.eq(filename))
                .count()
                .get_result::<i64>(conn)
                .into_core()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_registry::FileRegistryRepository;
    use crate::test_support::{date, import_samples, sample, setup, ts};
    use diesel::connection::SimpleConnection;
    use sleepscope_core::errors::{Error, SecurityError};
    use sleepscope_core::schema_guard::{ColumnDataType, ColumnRegistration};

    const FILE: &str = "4002 T1 G1.csv";

    fn seeded() -> (ActivityDataRepository, ConnectionScope, tempfile::TempDir) {
        let (scope, guard, dir) = setup();
        let registry = FileRegistryRepository::new(scope.clone(), guard.clone());
        import_samples(
            &registry,
            FILE,
            "h1",
            vec![
                sample(FILE, "2024-01-01 23:58:00", Some(4.0)),
                sample(FILE, "2024-01-01 23:59:00", None),
                sample(FILE, "2024-01-02 00:00:00", Some(-3.0)),
                sample(FILE, "2024-01-02 00:01:00", Some(8.0)),
            ],
        );
        (ActivityDataRepository::new(scope.clone(), guard), scope, dir)
    }

    #[test]
    fn test_load_range_skips_missing_and_clamps_negative() {
        let (repo, _, _dir) = seeded();
        let series = repo.load_range(FILE, None, None, "vector_magnitude").unwrap();
        assert_eq!(
            series.timestamps,
            vec![
                ts("2024-01-01 23:58:00"),
                ts("2024-01-02 00:00:00"),
                ts("2024-01-02 00:01:00")
            ]
        );
        assert_eq!(series.values, vec![4.0, 0.0, 8.0]);
    }

    #[test]
    fn test_load_range_window_is_half_open() {
        let (repo, _, _dir) = seeded();
        let series = repo
            .load_range(
                FILE,
                Some(ts("2024-01-02 00:00:00")),
                Some(ts("2024-01-02 00:01:00")),
                "vector_magnitude",
            )
            .unwrap();
        assert_eq!(series.timestamps, vec![ts("2024-01-02 00:00:00")]);
    }

    #[test]
    fn test_load_range_skips_unparsable_timestamps() {
        let (repo, scope, _dir) = seeded();
        scope
            .write(|conn| {
                conn.batch_execute(
                    "INSERT INTO raw_activity_data (filename, participant_key, timestamp, vector_magnitude) \
                     VALUES ('4002 T1 G1.csv', '4002_T1_G1', 'garbage', 5.0)",
                )
                .into_core()
            })
            .unwrap();
        let series = repo.load_range(FILE, None, None, "vector_magnitude").unwrap();
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_load_range_rejects_unknown_column() {
        let (repo, _, _dir) = seeded();
        let err = repo
            .load_range(FILE, None, None, "vector_magnitude; DROP TABLE file_registry")
            .unwrap_err();
        assert!(matches!(err, Error::Security(SecurityError::InvalidIdentifier(_))));

        // Allowed identifier, but not a value column.
        assert!(matches!(
            repo.load_range(FILE, None, None, "filename"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_load_range_resolves_registered_alias() {
        let (scope, _, _dir) = setup();
        let mut guard = SchemaGuard::new();
        guard
            .register_column(ColumnRegistration {
                name: "counts_vm".to_string(),
                storage_column: "vector_magnitude".to_string(),
                data_type: ColumnDataType::Real,
            })
            .unwrap();
        let guard = Arc::new(guard);
        let registry = FileRegistryRepository::new(scope.clone(), guard.clone());
        import_samples(
            &registry,
            FILE,
            "h1",
            vec![sample(FILE, "2024-01-01 00:00:00", Some(2.5))],
        );

        let repo = ActivityDataRepository::new(scope, guard);
        let series = repo.load_range(FILE, None, None, "Counts_VM").unwrap();
        assert_eq!(series.values, vec![2.5]);
    }

    #[test]
    fn test_load_all_columns_fills_missing_with_zero() {
        let (repo, _, _dir) = seeded();
        let columns = repo.load_all_columns(FILE, None, None).unwrap();
        assert_eq!(columns.timestamps.len(), 4);
        assert_eq!(columns.vector_magnitude, vec![4.0, 0.0, -3.0, 8.0]);
        assert_eq!(columns.axis_x, vec![0.0; 4]);
        assert_eq!(columns.column(ActivityColumn::AxisY)[0], 2.0);
    }

    #[test]
    fn test_file_dates_and_count() {
        let (repo, _, _dir) = seeded();
        assert_eq!(
            repo.get_file_dates(FILE).unwrap(),
            vec![date("2024-01-01"), date("2024-01-02")]
        );
        assert_eq!(repo.count_rows(FILE).unwrap(), 4);
        assert_eq!(repo.count_rows("other.csv").unwrap(), 0);
    }
}
