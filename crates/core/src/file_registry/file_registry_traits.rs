use crate::activity::RawActivitySample;
use crate::errors::Result;
use crate::file_registry::file_registry_model::{
    CommitSummary, FileDeletionSummary, FileRegistryEntry, ImportCommit, ImportStatistics,
    NewFileRegistration,
};

/// Trait for file registry operations, including the import commit itself.
pub trait FileRegistryRepositoryTrait: Send + Sync {
    fn find_by_filename(&self, filename: &str) -> Result<Option<FileRegistryEntry>>;

    /// Returns the imported entry for the key if there is one, otherwise the
    /// most recently touched entry.
    fn find_by_participant_key(&self, participant_key: &str) -> Result<Option<FileRegistryEntry>>;

    fn list_imported(&self) -> Result<Vec<FileRegistryEntry>>;

    /// Upserts the registry row with status `importing` in its own
    /// short transaction. A row that is already `imported` is left as is
    /// until [`commit_import`](Self::commit_import) replaces it.
    fn register_importing(&self, registration: &NewFileRegistration) -> Result<()>;

    /// Writes every batch and finalizes the registry row in one transaction.
    ///
    /// Prior samples of the same filename and every other file registered
    /// under the same participant key are purged first. `on_batch` receives
    /// the running row count after each batch. If anything fails, nothing of
    /// this call is visible afterwards.
    fn commit_import(
        &self,
        commit: &ImportCommit,
        batches: &mut dyn Iterator<Item = Vec<RawActivitySample>>,
        on_batch: &mut dyn FnMut(usize),
    ) -> Result<CommitSummary>;

    /// Flags a failed import. An `imported` row keeps its status and
    /// fingerprint since its samples are still stored.
    fn mark_error(&self, filename: &str, message: &str) -> Result<()>;

    /// Removes the file and everything derived from it, all-or-nothing.
    fn delete_imported_file(&self, filename: &str) -> Result<FileDeletionSummary>;

    fn get_import_statistics(&self) -> Result<ImportStatistics>;
}
