//! Raw activity samples - domain models and storage port.

mod activity_model;
mod activity_traits;

pub use activity_model::{ActivityColumn, ActivityColumns, ActivitySeries, RawActivitySample};
pub use activity_traits::ActivityDataRepositoryTrait;
