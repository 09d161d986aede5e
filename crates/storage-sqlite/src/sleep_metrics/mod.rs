//! SQLite storage for sleep metrics, sleep markers and autosave snapshots.

mod model;
mod repository;

pub use model::{AutosaveDB, NewAutosaveDB, NewSleepMarkerDB, NewSleepMetricsDB, SleepMarkerDB, SleepMetricsDB};
pub use repository::SleepMetricsRepository;
