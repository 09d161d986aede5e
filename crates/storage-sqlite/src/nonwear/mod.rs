//! SQLite storage for manual nonwear markers and detected nonwear periods.

mod model;
mod repository;

pub use model::{AlgorithmNonwearDB, ManualNonwearMarkerDB, SensorNonwearDB};
pub use repository::NonwearRepository;
