//! Storage-specific error types for SQLite operations.
//!
//! Diesel and r2d2 failures are wrapped in [`StorageError`] inside this crate
//! and classified into the database-agnostic `sleepscope_core` errors before
//! they leave it.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use sleepscope_core::errors::{DatabaseError, Error};
use thiserror::Error;

/// Storage-specific errors that wrap Diesel and r2d2 types.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Query execution failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A core error raised inside a transaction closure, kept as-is so the
    /// caller sees the original variant after rollback.
    #[error(transparent)]
    Core(Error),
}

impl From<Error> for StorageError {
    fn from(err: Error) -> Self {
        StorageError::Core(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConnectionFailed(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::PoolError(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::QueryFailed(e) => Error::Database(classify_diesel_error(e)),
            StorageError::MigrationFailed(e) => Error::Database(DatabaseError::MigrationFailed(e)),
            StorageError::SerializationError(e) => Error::Database(DatabaseError::Internal(e)),
            StorageError::Core(e) => e,
        }
    }
}

fn classify_diesel_error(err: DieselError) -> DatabaseError {
    match err {
        DieselError::NotFound => DatabaseError::NotFound("Record not found".to_string()),
        DieselError::DatabaseError(kind, info) => {
            let message = info.message().to_string();
            match kind {
                DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::NotNullViolation
                | DatabaseErrorKind::CheckViolation => DatabaseError::IntegrityViolation(message),
                DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand => {
                    DatabaseError::ConnectionFailed(message)
                }
                _ => DatabaseError::QueryFailed(message),
            }
        }
        DieselError::BrokenTransactionManager => {
            DatabaseError::ConnectionFailed(DieselError::BrokenTransactionManager.to_string())
        }
        other => DatabaseError::QueryFailed(other.to_string()),
    }
}

/// Extension trait for converting Diesel and r2d2 results to core results.
///
/// `From<DieselError> for Error` is not possible under the orphan rules, so
/// the conversion goes through [`StorageError`].
pub trait IntoCore<T> {
    fn into_core(self) -> sleepscope_core::Result<T>;
}

impl<T> IntoCore<T> for std::result::Result<T, DieselError> {
    fn into_core(self) -> sleepscope_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

impl<T> IntoCore<T> for std::result::Result<T, r2d2::Error> {
    fn into_core(self) -> sleepscope_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleepscope_core::errors::ImportError;

    fn db_error(kind: DatabaseErrorKind, message: &str) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(message.to_string()))
    }

    #[test]
    fn test_constraint_violations_are_integrity_errors() {
        for kind in [
            DatabaseErrorKind::UniqueViolation,
            DatabaseErrorKind::ForeignKeyViolation,
            DatabaseErrorKind::NotNullViolation,
            DatabaseErrorKind::CheckViolation,
        ] {
            let err: Error = StorageError::from(db_error(kind, "constraint failed")).into();
            assert!(err.is_integrity_violation(), "{:?}", err);
        }
    }

    #[test]
    fn test_closed_connection_is_infrastructure() {
        let err: Error =
            StorageError::from(db_error(DatabaseErrorKind::ClosedConnection, "closed")).into();
        assert!(err.is_infrastructure());
    }

    #[test]
    fn test_other_failures_are_query_errors() {
        let err: Error =
            StorageError::from(db_error(DatabaseErrorKind::Unknown, "database is locked")).into();
        assert!(matches!(
            err,
            Error::Database(DatabaseError::QueryFailed(ref m)) if m == "database is locked"
        ));

        let err: Error = StorageError::from(DieselError::NotFound).into();
        assert!(matches!(err, Error::Database(DatabaseError::NotFound(_))));
    }

    #[test]
    fn test_core_errors_pass_through_unchanged() {
        let original = Error::from(ImportError::Parse("no rows".to_string()));
        let err: Error = StorageError::from(original).into();
        assert!(matches!(err, Error::Import(ImportError::Parse(ref m)) if m == "no rows"));
    }
}
