use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use sleepscope_core::import::ImportService;
use sleepscope_core::schema_guard::{ColumnRegistration, SchemaGuard};
use sleepscope_core::storage::StorageService;
use sleepscope_storage_sqlite::{bootstrap, SqliteStorage};

use crate::config::LogFormat;

pub struct AppState {
    /// Keeps the pool alive for the services below.
    #[allow(dead_code)]
    pub storage: SqliteStorage,
    pub storage_service: Arc<StorageService>,
    pub import_service: Arc<ImportService>,
}

pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false).with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

pub fn build_state(db_path: &str, aliases: &[ColumnRegistration]) -> anyhow::Result<AppState> {
    let mut guard = SchemaGuard::new();
    for alias in aliases {
        guard
            .register_column(alias.clone())
            .with_context(|| format!("Invalid column alias '{}'", alias.name))?;
    }

    let storage = bootstrap(db_path, guard)
        .with_context(|| format!("Failed to open database at {}", db_path))?;
    tracing::info!("Database path in use: {}", storage.schema().location());

    let storage_service = storage.service();
    let import_service = Arc::new(ImportService::new(storage_service.clone()));
    Ok(AppState {
        storage,
        storage_service,
        import_service,
    })
}
