//! SQLite storage implementation for SleepScope.
//!
//! Implements the repository traits defined in `sleepscope-core` with Diesel
//! over SQLite:
//! - connection pooling with per-connection pragmas
//! - embedded Diesel migrations
//! - one repository per entity family
//! - database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! ```text
//!   core (domain, ports, import pipeline)
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```
//!
//! Start with [`bootstrap`], which migrates the schema and hands out the
//! repositories and the [`StorageService`](sleepscope_core::storage::StorageService) facade.

pub mod bootstrap;
pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod activity;
pub mod diary;
pub mod file_registry;
pub mod nonwear;
pub mod sleep_metrics;

#[cfg(test)]
mod test_support;

pub use bootstrap::{bootstrap, SqliteStorage};

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, ConnectionScope, DbConnection, DbPool,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from sleepscope-core for convenience
pub use sleepscope_core::errors::{DatabaseError, Error, Result};
