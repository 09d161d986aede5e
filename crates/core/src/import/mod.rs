//! Import pipeline - turns device exports into registered activity samples.

mod columns;
mod fingerprint;
mod import_model;
mod import_service;
mod reader;
mod samples;
mod timestamps;


pub use columns::{identify_columns, ColumnMapping, TimestampSource};
pub use fingerprint::compute_file_hash;
pub use import_model::{
    BulkImportResult, ChangeDecision, ColumnOverrides, FileImportFailure, FileImportResult,
    ImportOptions, ImportProgress, ImportReason, ImportStage, NoopProgress, ProgressSink,
};
pub use import_service::{decide_change, ImportService};
pub use reader::{read_delimited, DelimitedTable, ReadConfig};
pub use samples::{row_to_sample, SampleBatches};
pub use timestamps::{check_epoch, parse_timestamps, TimestampedRows};
