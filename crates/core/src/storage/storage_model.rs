//! Models owned by the storage facade.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::activity::ActivityDataRepositoryTrait;
use crate::diary::{DiaryEntry, DiaryRepositoryTrait};
use crate::errors::Result;
use crate::file_registry::FileRegistryRepositoryTrait;
use crate::nonwear::{ManualNonwearMarker, NonwearRepositoryTrait};
use crate::sleep_metrics::{SleepMetricsRecord, SleepMetricsRepositoryTrait};

/// Proof that the persisted schema has been initialized for this process.
///
/// Issued by the storage bootstrap after migrations ran; the facade cannot be
/// built without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReady {
    location: String,
    migrations_applied: usize,
}

/// Applies a backend's pending schema migrations.
pub trait SchemaMigrator {
    /// Where the schema lives (e.g. the database path).
    fn location(&self) -> String;

    /// Applies pending migrations and returns how many ran.
    fn run_pending(&self) -> Result<usize>;
}

impl SchemaReady {
    /// Runs `migrator` and issues the proof once it succeeds. There is no
    /// other constructor.
    pub fn establish(migrator: &dyn SchemaMigrator) -> Result<Self> {
        let migrations_applied = migrator.run_pending()?;
        Ok(Self {
            location: migrator.location(),
            migrations_applied,
        })
    }

    /// Where the schema lives (e.g. the database path).
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Migrations applied by this process's bootstrap (0 when up to date).
    pub fn migrations_applied(&self) -> usize {
        self.migrations_applied
    }
}

/// The five storage ports the facade delegates to.
#[derive(Clone)]
pub struct StorageRepositories {
    pub activity: Arc<dyn ActivityDataRepositoryTrait>,
    pub file_registry: Arc<dyn FileRegistryRepositoryTrait>,
    pub sleep_metrics: Arc<dyn SleepMetricsRepositoryTrait>,
    pub nonwear: Arc<dyn NonwearRepositoryTrait>,
    pub diary: Arc<dyn DiaryRepositoryTrait>,
}

/// A sleep metrics record enriched for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepExportRow {
    pub metrics: SleepMetricsRecord,
    pub diary: Option<DiaryEntry>,
    pub manual_nonwear: Vec<ManualNonwearMarker>,
}
