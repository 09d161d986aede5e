//! SleepScope Core - Domain models, storage ports and the import pipeline.
//!
//! This crate is database-agnostic. The traits it defines are implemented
//! by the `storage-sqlite` crate.

pub mod activity;
pub mod constants;
pub mod diary;
pub mod errors;
pub mod file_registry;
pub mod import;
pub mod nonwear;
pub mod participant;
pub mod schema_guard;
pub mod sleep_metrics;
pub mod storage;
pub mod validation;

// Re-export error types
pub use errors::Error;
pub use errors::Result;

#[cfg(test)]
mod test_support;
