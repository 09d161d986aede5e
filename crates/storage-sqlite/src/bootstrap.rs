//! One-time schema initialization and repository wiring.

use log::info;
use std::sync::Arc;

use sleepscope_core::schema_guard::SchemaGuard;
use sleepscope_core::storage::{
    SchemaMigrator, SchemaReady, StorageRepositories, StorageService,
};
use sleepscope_core::Result;

use crate::activity::ActivityDataRepository;
use crate::db::{self, ConnectionScope, DbPool};
use crate::diary::DiaryRepository;
use crate::file_registry::FileRegistryRepository;
use crate::nonwear::NonwearRepository;
use crate::sleep_metrics::SleepMetricsRepository;

/// An initialized database: pool, migrated schema and column allowlist.
///
/// Holding one is the only way to obtain a [`SchemaReady`], so the facade
/// can never be built over an unmigrated file.
pub struct SqliteStorage {
    pool: Arc<DbPool>,
    guard: Arc<SchemaGuard>,
    schema: SchemaReady,
}

/// Embedded migrations run against one pool.
struct EmbeddedMigrations<'a> {
    db_path: &'a str,
    pool: &'a DbPool,
}

impl SchemaMigrator for EmbeddedMigrations<'_> {
    fn location(&self) -> String {
        self.db_path.to_string()
    }

    fn run_pending(&self) -> Result<usize> {
        db::run_migrations(self.pool)
    }
}

/// Creates the database directory, opens the pool and applies pending
/// migrations. Call once per process.
pub fn bootstrap(db_path: &str, guard: SchemaGuard) -> Result<SqliteStorage> {
    let db_path = db::init(db_path)?;
    let pool = db::create_pool(&db_path)?;
    let schema = SchemaReady::establish(&EmbeddedMigrations {
        db_path: &db_path,
        pool: &pool,
    })?;
    info!(
        "Storage ready at {} ({} migrations applied)",
        schema.location(),
        schema.migrations_applied()
    );
    Ok(SqliteStorage {
        pool,
        guard: Arc::new(guard),
        schema,
    })
}

impl SqliteStorage {
    pub fn pool(&self) -> &Arc<DbPool> {
        &self.pool
    }

    pub fn guard(&self) -> &Arc<SchemaGuard> {
        &self.guard
    }

    pub fn schema(&self) -> &SchemaReady {
        &self.schema
    }

    pub fn scope(&self) -> ConnectionScope {
        ConnectionScope::new(self.pool.clone())
    }

    pub fn repositories(&self) -> StorageRepositories {
        let scope = self.scope();
        StorageRepositories {
            activity: Arc::new(ActivityDataRepository::new(scope.clone(), self.guard.clone())),
            file_registry: Arc::new(FileRegistryRepository::new(
                scope.clone(),
                self.guard.clone(),
            )),
            sleep_metrics: Arc::new(SleepMetricsRepository::new(scope.clone())),
            nonwear: Arc::new(NonwearRepository::new(scope.clone())),
            diary: Arc::new(DiaryRepository::new(scope, self.guard.clone())),
        }
    }

    pub fn service(&self) -> Arc<StorageService> {
        Arc::new(StorageService::new(self.schema.clone(), self.repositories()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_bootstrap_migrates_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("sleep.db");
        let path = path.to_string_lossy().to_string();

        let first = bootstrap(&path, SchemaGuard::new()).unwrap();
        assert_eq!(first.schema().migrations_applied(), 2);
        assert_eq!(first.schema().location(), path);
        drop(first);

        let second = bootstrap(&path, SchemaGuard::new()).unwrap();
        assert_eq!(second.schema().migrations_applied(), 0);
        let service = second.service();
        assert!(service.get_available_files().unwrap().is_empty());
    }

    #[test]
    fn test_bootstrap_rejects_empty_path() {
        assert!(matches!(
            bootstrap("  ", SchemaGuard::new()),
            Err(sleepscope_core::Error::Validation(_))
        ));
    }
}
