//! SQLite storage for sleep diary files, entries and reported periods.

mod model;
mod repository;

pub use model::{DiaryEntryDB, DiaryFileDB, DiaryNapPeriodDB, DiaryNonwearPeriodDB};
pub use repository::DiaryRepository;
