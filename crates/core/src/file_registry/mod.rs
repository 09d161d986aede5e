//! File registry - import lifecycle models and storage port.

mod file_registry_model;
mod file_registry_traits;

pub use file_registry_model::{
    AvailableFile, CommitSummary, FileDeletionSummary, FileRegistryEntry, ImportCommit,
    ImportStatistics, ImportStatus, NewFileRegistration,
};
pub use file_registry_traits::FileRegistryRepositoryTrait;
