/// Canonical storage format for timestamps (naive wall-clock time)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical storage format for dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonical storage format for diary wall-clock times
pub const CLOCK_TIME_FORMAT: &str = "%H:%M";

/// Metadata lines written by devices above the header row
pub const DEFAULT_SKIP_ROWS: usize = 10;

/// Rows written per insert batch during import
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Largest accepted import file (100 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Expected sampling epoch in seconds
pub const DEFAULT_EPOCH_SECONDS: i64 = 60;

/// Allowed deviation of the first sampling interval from the epoch, in seconds
pub const EPOCH_TOLERANCE_SECONDS: i64 = 1;

/// Chunk size used when hashing file contents
pub const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// File extensions accepted by the importer
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "txt", "tsv", "dat"];

/// Maximum length of any identifier-like string argument
pub const MAX_TEXT_INPUT_LENGTH: usize = 255;

/// Sleep period slots per analysis date
pub const MAX_SLEEP_PERIODS: usize = 4;

/// Manual nonwear marker slots per date
pub const MAX_MANUAL_NONWEAR_SLOTS: usize = 10;

/// Diary nap slots per date
pub const MAX_DIARY_NAP_PERIODS: usize = 3;

/// Diary nonwear slots per date
pub const MAX_DIARY_NONWEAR_PERIODS: usize = 3;

/// Placeholder for participant fields that could not be derived
pub const UNKNOWN_PARTICIPANT_FIELD: &str = "UNKNOWN";
