//! Nonwear periods - sensor, algorithm and manual markers.

mod nonwear_model;
mod nonwear_traits;

pub use nonwear_model::{DailyNonwearMarkers, ManualNonwearMarker, NonwearPeriod, NonwearSource};
pub use nonwear_traits::NonwearRepositoryTrait;
