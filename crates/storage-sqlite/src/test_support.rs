//! Fixtures shared by the repository tests.

use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tempfile::TempDir;

use sleepscope_core::activity::RawActivitySample;
use sleepscope_core::file_registry::{
    FileRegistryRepositoryTrait, ImportCommit, NewFileRegistration,
};
use sleepscope_core::participant::extract_participant_info;
use sleepscope_core::schema_guard::SchemaGuard;

use crate::db::{create_pool, run_migrations, ConnectionScope};
use crate::file_registry::FileRegistryRepository;

/// A migrated database in a temp dir. Keep the `TempDir` alive for the test.
pub fn setup() -> (ConnectionScope, Arc<SchemaGuard>, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db").to_string_lossy().to_string();
    let pool = create_pool(&db_path).expect("Failed to create pool");
    run_migrations(&pool).expect("Failed to run migrations");
    (ConnectionScope::new(pool), Arc::new(SchemaGuard::new()), dir)
}

pub fn ts(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").expect("valid timestamp")
}

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
}

pub fn registration(filename: &str, file_hash: &str) -> NewFileRegistration {
    NewFileRegistration {
        filename: filename.to_string(),
        file_hash: file_hash.to_string(),
        participant: extract_participant_info(filename),
        file_size: 100,
        last_modified: None,
    }
}

pub fn sample(filename: &str, timestamp: &str, vm: Option<f64>) -> RawActivitySample {
    RawActivitySample {
        filename: filename.to_string(),
        participant_key: extract_participant_info(filename).key,
        timestamp: ts(timestamp),
        axis_y: vm.map(|v| v / 2.0),
        axis_x: None,
        axis_z: None,
        vector_magnitude: vm,
    }
}

/// Registers and commits `samples` for `filename` as one batch.
pub fn import_samples(
    registry: &FileRegistryRepository,
    filename: &str,
    file_hash: &str,
    samples: Vec<RawActivitySample>,
) {
    let registration = registration(filename, file_hash);
    registry
        .register_importing(&registration)
        .expect("register");
    let commit = ImportCommit::new(&registration, ts("2024-02-01 12:00:00"));
    registry
        .commit_import(&commit, &mut std::iter::once(samples), &mut |_| {})
        .expect("commit");
}
