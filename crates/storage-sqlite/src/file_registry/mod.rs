//! SQLite storage for the file registry and the import commit.

mod model;
mod repository;

pub use model::{FileRegistryDB, NewFileRegistryDB, NewRawActivityDB};
pub use repository::FileRegistryRepository;
