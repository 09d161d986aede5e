//! Storage facade - the one interface the application talks to.

mod storage_model;
mod storage_service;


pub use storage_model::{SchemaMigrator, SchemaReady, SleepExportRow, StorageRepositories};
pub use storage_service::StorageService;
