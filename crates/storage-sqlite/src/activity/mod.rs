//! SQLite read access to raw activity samples.

mod model;
mod repository;

pub use model::RawActivityDB;
pub use repository::ActivityDataRepository;
