//! Scoped access to pooled connections.

use std::sync::Arc;

use diesel::sqlite::SqliteConnection;
use sleepscope_core::errors::{Error, Result};

use super::{get_connection, DbPool};
use crate::errors::StorageError;

/// Hands out one pooled connection per call.
///
/// The connection is checked out for the duration of the closure only and
/// goes back to the pool on every exit path, including panics.
#[derive(Clone)]
pub struct ConnectionScope {
    pool: Arc<DbPool>,
}

impl ConnectionScope {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Arc<DbPool> {
        &self.pool
    }

    /// Runs `f` on a connection without opening a transaction.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T>,
    {
        let mut conn = get_connection(&self.pool)?;
        f(&mut *conn)
    }

    /// Runs `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back on `Err`. Core errors raised
    /// by `f` come back unchanged; Diesel errors are classified.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T>,
    {
        let mut conn = get_connection(&self.pool)?;
        conn.immediate_transaction::<_, StorageError, _>(|tx| f(tx).map_err(StorageError::from))
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations};
    use diesel::prelude::*;
    use diesel::sql_types::Text;
    use sleepscope_core::errors::{DatabaseError, ValidationError};
    use tempfile::tempdir;

    fn setup() -> (ConnectionScope, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("scope.db").to_string_lossy().to_string();
        let pool = create_pool(&db_path).unwrap();
        run_migrations(&pool).unwrap();
        (ConnectionScope::new(pool), dir)
    }

    fn insert_diary_file(conn: &mut SqliteConnection, name: &str) -> Result<usize> {
        diesel::sql_query(
            "INSERT INTO diary_file_registry (filename, file_hash, import_date, entry_count) \
             VALUES (?, 'h', '2024-01-01 00:00:00', 0)",
        )
        .bind::<Text, _>(name)
        .execute(conn)
        .map_err(|e| StorageError::from(e).into())
    }

    fn count_diary_files(scope: &ConnectionScope) -> i64 {
        use crate::schema::diary_file_registry::dsl::*;
        scope
            .read(|conn| {
                diary_file_registry
                    .count()
                    .get_result::<i64>(conn)
                    .map_err(|e| StorageError::from(e).into())
            })
            .unwrap()
    }

    #[test]
    fn test_write_commits_on_ok() {
        let (scope, _dir) = setup();
        scope.write(|conn| insert_diary_file(conn, "a.csv")).unwrap();
        assert_eq!(count_diary_files(&scope), 1);
    }

    #[test]
    fn test_write_rolls_back_on_core_error() {
        let (scope, _dir) = setup();
        let result: Result<()> = scope.write(|conn| {
            insert_diary_file(conn, "a.csv")?;
            Err(ValidationError::InvalidInput("stop".to_string()).into())
        });
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(count_diary_files(&scope), 0);
    }

    #[test]
    fn test_write_classifies_constraint_failures() {
        let (scope, _dir) = setup();
        let result = scope.write(|conn| {
            insert_diary_file(conn, "a.csv")?;
            insert_diary_file(conn, "a.csv")
        });
        assert!(matches!(
            result,
            Err(Error::Database(DatabaseError::IntegrityViolation(_)))
        ));
        assert_eq!(count_diary_files(&scope), 0);
    }

    #[test]
    fn test_connections_return_to_pool() {
        let (scope, _dir) = setup();
        for _ in 0..(scope.pool().max_size() * 3) {
            scope.read(|_| Ok(())).unwrap();
            let _ = scope.write(|_| -> Result<()> {
                Err(ValidationError::InvalidInput("x".to_string()).into())
            });
        }
        let state = scope.pool().state();
        assert_eq!(state.connections, state.idle_connections);
    }
}
