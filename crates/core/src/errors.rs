//! Core error types for the SleepScope application.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, r2d2) are converted to these types by the storage layer.

use chrono::ParseError as ChronoParseError;
use std::num::ParseFloatError;
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the application.
///
/// Database-specific errors are wrapped in string form to keep this type
/// database-agnostic.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Security check failed: {0}")]
    Security(#[from] SecurityError),

    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Returns true for failures of the storage infrastructure itself.
    ///
    /// A bulk operation must stop at the first infrastructure failure instead
    /// of recording it against a single file and moving on.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Error::Database(DatabaseError::ConnectionFailed(_))
                | Error::Database(DatabaseError::PoolCreationFailed(_))
        )
    }

    /// Returns true when the error came from a violated storage constraint.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Error::Database(DatabaseError::IntegrityViolation(_)))
    }
}

/// Database-agnostic error type for storage operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish or keep a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A unique, foreign key, not-null or check constraint was violated.
    #[error("Integrity constraint violated: {0}")]
    IntegrityViolation(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Validation errors for user input. Raised before storage is touched.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Field '{field}' exceeds the maximum length of {max} characters")]
    TooLong { field: String, max: usize },

    #[error("Failed to parse number: {0}")]
    NumberParse(#[from] ParseFloatError),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

/// Trust-boundary violations. These are never retried.
#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("Identifier '{0}' is not an allowed table or column name")]
    InvalidIdentifier(String),

    #[error("Path '{0}' escapes the allowed directory")]
    PathTraversal(String),

    #[error("Value '{0}' contains a disallowed SQL pattern")]
    InjectionPattern(String),
}

/// Per-file import failures. The bulk importer records these against the file
/// and continues with the next one.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("File is {size} bytes, larger than the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Required columns missing: {0}")]
    MissingColumns(String),

    #[error("Could not parse timestamps: {0}")]
    TimestampParse(String),

    #[error("Could not compute file hash: {0}")]
    HashFailed(String),

    #[error("Could not parse file contents: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

// === From implementations for common error types ===

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Import(ImportError::Io(err.to_string()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Import(ImportError::Parse(err.to_string()))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failures_are_infrastructure() {
        let err = Error::from(DatabaseError::ConnectionFailed("disk gone".to_string()));
        assert!(err.is_infrastructure());

        let err = Error::from(DatabaseError::PoolCreationFailed("timeout".to_string()));
        assert!(err.is_infrastructure());
    }

    #[test]
    fn test_data_level_failures_are_not_infrastructure() {
        let integrity = Error::from(DatabaseError::IntegrityViolation("unique".to_string()));
        assert!(!integrity.is_infrastructure());
        assert!(integrity.is_integrity_violation());

        let import = Error::from(ImportError::MissingColumns("activity".to_string()));
        assert!(!import.is_infrastructure());

        let security = Error::from(SecurityError::InvalidIdentifier("users".to_string()));
        assert!(!security.is_infrastructure());
    }

    #[test]
    fn test_file_too_large_message() {
        let err = Error::from(ImportError::FileTooLarge {
            size: 200,
            limit: 100,
        });
        assert_eq!(
            err.to_string(),
            "Import failed: File is 200 bytes, larger than the 100 byte limit"
        );
    }
}
