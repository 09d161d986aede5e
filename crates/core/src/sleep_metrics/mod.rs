//! Sleep metrics - scoring summaries, sleep markers and autosave snapshots.

mod sleep_metrics_model;
mod sleep_metrics_traits;

pub use sleep_metrics_model::{
    AutosaveMetrics, DailySleepMarkers, MarkerType, SleepMetricsRecord, SleepPeriod,
};
pub use sleep_metrics_traits::SleepMetricsRepositoryTrait;
