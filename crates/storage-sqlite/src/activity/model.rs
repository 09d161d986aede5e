//! Database models for reading `raw_activity_data`.

use diesel::prelude::*;
use diesel::sql_types::{Nullable, Text};

/// Full row of `raw_activity_data`
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::raw_activity_data)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RawActivityDB {
    pub id: i32,
    pub filename: String,
    pub participant_key: String,
    pub timestamp: String,
    pub axis_y: Option<f64>,
    pub axis_x: Option<f64>,
    pub axis_z: Option<f64>,
    pub vector_magnitude: Option<f64>,
}

/// One column of a range query whose column name is chosen at runtime.
#[derive(QueryableByName, Debug)]
pub(crate) struct ColumnValueRow {
    #[diesel(sql_type = Text)]
    pub ts: String,
    #[diesel(sql_type = Nullable<diesel::sql_types::Double>)]
    pub value: Option<f64>,
}

#[derive(QueryableByName, Debug)]
pub(crate) struct DayRow {
    #[diesel(sql_type = Text)]
    pub day: String,
}
