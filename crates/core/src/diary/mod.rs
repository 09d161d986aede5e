//! Sleep diary storage - entries, nap/nonwear periods, file registry.
//!
//! Mapping diary spreadsheet columns onto these models happens upstream.

mod diary_model;
mod diary_traits;

pub use diary_model::{
    wall_clock_duration_minutes, DiaryEntry, DiaryFileEntry, DiaryPeriod, DiaryRawRow,
};
pub use diary_traits::DiaryRepositoryTrait;
