//! Allowlist for every identifier that is ever interpolated into query text.
//!
//! Values are always bound as parameters; table and column names cannot be,
//! so any name assembled into SQL must pass through [`SchemaGuard`] first.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SecurityError, ValidationError};

/// Table names of the persisted schema.
pub mod tables {
    pub const FILE_REGISTRY: &str = "file_registry";
    pub const RAW_ACTIVITY_DATA: &str = "raw_activity_data";
    pub const SLEEP_METRICS: &str = "sleep_metrics";
    pub const SLEEP_MARKERS_EXTENDED: &str = "sleep_markers_extended";
    pub const AUTOSAVE_METRICS: &str = "autosave_metrics";
    pub const MANUAL_NONWEAR_MARKERS: &str = "manual_nonwear_markers";
    pub const NONWEAR_SENSOR_PERIODS: &str = "nonwear_sensor_periods";
    pub const ALGORITHM_NONWEAR_PERIODS: &str = "algorithm_nonwear_periods";
    pub const DIARY_DATA: &str = "diary_data";
    pub const DIARY_FILE_REGISTRY: &str = "diary_file_registry";
    pub const DIARY_RAW_DATA: &str = "diary_raw_data";
    pub const DIARY_NAP_PERIODS: &str = "diary_nap_periods";
    pub const DIARY_NONWEAR_PERIODS: &str = "diary_nonwear_periods";

    pub const ALL: &[&str] = &[
        FILE_REGISTRY,
        RAW_ACTIVITY_DATA,
        SLEEP_METRICS,
        SLEEP_MARKERS_EXTENDED,
        AUTOSAVE_METRICS,
        MANUAL_NONWEAR_MARKERS,
        NONWEAR_SENSOR_PERIODS,
        ALGORITHM_NONWEAR_PERIODS,
        DIARY_DATA,
        DIARY_FILE_REGISTRY,
        DIARY_RAW_DATA,
        DIARY_NAP_PERIODS,
        DIARY_NONWEAR_PERIODS,
    ];
}

const STATIC_COLUMNS: &[&str] = &[
    "id",
    "filename",
    "file_hash",
    "participant_key",
    "participant_id",
    "participant_group",
    "participant_timepoint",
    "file_size",
    "date_range_start",
    "date_range_end",
    "total_records",
    "last_modified",
    "import_date",
    "status",
    "error_message",
    "timestamp",
    "axis_y",
    "axis_x",
    "axis_z",
    "vector_magnitude",
    "analysis_date",
    "onset_timestamp",
    "offset_timestamp",
    "total_sleep_time",
    "sleep_efficiency",
    "total_minutes_in_bed",
    "waso",
    "awakenings",
    "average_awakening_length",
    "movement_index",
    "fragmentation_index",
    "sleep_fragmentation_index",
    "total_activity",
    "non_zero_epochs",
    "sleep_algorithm",
    "period_metrics",
    "updated_at",
    "marker_index",
    "marker_type",
    "start_timestamp",
    "end_timestamp",
    "created_at",
    "payload",
    "saved_at",
    "sleep_date",
    "start_time",
    "end_time",
    "duration_minutes",
    "start_index",
    "end_index",
    "algorithm_name",
    "diary_date",
    "bed_time",
    "sleep_onset_time",
    "sleep_offset_time",
    "out_of_bed_time",
    "nap_occurred",
    "nonwear_occurred",
    "notes",
    "entry_count",
    "row_index",
    "period_index",
    "reason",
];

const INJECTION_PATTERNS: &[&str] = &[";", "--", "/*", "*/", "'", "\"", "`", "\\"];

/// Storage type of a registered column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnDataType {
    Text,
    Integer,
    Real,
}

/// A column contributed at startup, e.g. an extra device channel mapped onto
/// an existing storage column under a new name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRegistration {
    /// Name callers use to refer to the column
    pub name: String,
    /// Physical column name in storage
    pub storage_column: String,
    pub data_type: ColumnDataType,
}

/// Identifier allowlist. Built and extended once during bootstrap, then shared
/// read-only (typically behind an `Arc`).
#[derive(Debug, Clone)]
pub struct SchemaGuard {
    tables: HashSet<String>,
    columns: HashSet<String>,
    aliases: HashMap<String, ColumnRegistration>,
}

impl Default for SchemaGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaGuard {
    /// Creates a guard that knows every static table and column.
    pub fn new() -> Self {
        Self {
            tables: tables::ALL.iter().map(|t| t.to_string()).collect(),
            columns: STATIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
            aliases: HashMap::new(),
        }
    }

    /// Adds a runtime column to the allowlist.
    ///
    /// Both names must be plain identifiers (ASCII letter first, then letters,
    /// digits or underscores). Re-registering the same name replaces the
    /// previous mapping.
    pub fn register_column(&mut self, registration: ColumnRegistration) -> Result<()> {
        ensure_plain_identifier(&registration.name)?;
        ensure_plain_identifier(&registration.storage_column)?;

        log::debug!(
            "Registering column '{}' -> '{}' ({:?})",
            registration.name,
            registration.storage_column,
            registration.data_type
        );
        self.columns.insert(registration.storage_column.clone());
        self.aliases
            .insert(registration.name.to_ascii_lowercase(), registration);
        Ok(())
    }

    pub fn registered_columns(&self) -> Vec<&ColumnRegistration> {
        self.aliases.values().collect()
    }

    /// Returns `name` unchanged when it is an allowed table name.
    pub fn validate_table<'a>(&self, name: &'a str) -> Result<&'a str> {
        if self.tables.contains(name) {
            Ok(name)
        } else {
            Err(SecurityError::InvalidIdentifier(name.to_string()).into())
        }
    }

    /// Returns `name` unchanged when it is an allowed column name.
    pub fn validate_column<'a>(&self, name: &'a str) -> Result<&'a str> {
        if self.columns.contains(name) {
            Ok(name)
        } else {
            Err(SecurityError::InvalidIdentifier(name.to_string()).into())
        }
    }

    /// Resolves a caller-facing column name to its storage column.
    ///
    /// Static columns resolve to themselves; registered names resolve to their
    /// storage column. Anything else is rejected.
    pub fn resolve_column(&self, name: &str) -> Result<String> {
        if let Some(registration) = self.aliases.get(&name.to_ascii_lowercase()) {
            return Ok(registration.storage_column.clone());
        }
        self.validate_column(name).map(str::to_string)
    }
}

/// Rejects values containing SQL comment, terminator or quoting sequences.
pub fn ensure_no_injection(value: &str) -> Result<()> {
    if INJECTION_PATTERNS.iter().any(|p| value.contains(p)) {
        return Err(SecurityError::InjectionPattern(value.to_string()).into());
    }
    Ok(())
}

fn ensure_plain_identifier(value: &str) -> Result<()> {
    ensure_no_injection(value)?;
    let mut chars = value.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid || value.len() > 64 {
        return Err(ValidationError::InvalidInput(format!(
            "'{}' is not a valid column identifier",
            value
        ))
        .into());
    }
    Ok(())
}

/// Resolves `candidate` against `base` and rejects results outside `base`.
///
/// Resolution is lexical so it also works for files that do not exist yet.
pub fn validate_import_path(base: &Path, candidate: &Path) -> Result<PathBuf> {
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                if !resolved.pop() {
                    return Err(SecurityError::PathTraversal(
                        candidate.display().to_string(),
                    )
                    .into());
                }
            }
            Component::CurDir => {}
            other => resolved.push(other.as_os_str()),
        }
    }

    if !resolved.starts_with(base) {
        return Err(SecurityError::PathTraversal(candidate.display().to_string()).into());
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    #[test]
    fn test_static_identifiers_pass_unchanged() {
        let guard = SchemaGuard::new();
        assert_eq!(guard.validate_table("raw_activity_data").unwrap(), "raw_activity_data");
        assert_eq!(guard.validate_column("vector_magnitude").unwrap(), "vector_magnitude");
    }

    #[test]
    fn test_unknown_identifiers_are_rejected() {
        let guard = SchemaGuard::new();
        let err = guard.validate_table("sqlite_master").unwrap_err();
        assert!(matches!(
            err,
            Error::Security(SecurityError::InvalidIdentifier(ref name)) if name == "sqlite_master"
        ));
        assert!(guard.validate_column("axis_y; DROP TABLE file_registry").is_err());
    }

    #[test]
    fn test_registered_column_resolves_to_storage_column() {
        let mut guard = SchemaGuard::new();
        guard
            .register_column(ColumnRegistration {
                name: "Counts_VM".to_string(),
                storage_column: "vector_magnitude".to_string(),
                data_type: ColumnDataType::Real,
            })
            .unwrap();

        assert_eq!(guard.resolve_column("counts_vm").unwrap(), "vector_magnitude");
        assert_eq!(guard.resolve_column("axis_x").unwrap(), "axis_x");
        assert!(guard.resolve_column("steps").is_err());
    }

    #[test]
    fn test_registration_adds_new_storage_column() {
        let mut guard = SchemaGuard::new();
        assert!(guard.validate_column("lux").is_err());
        guard
            .register_column(ColumnRegistration {
                name: "light".to_string(),
                storage_column: "lux".to_string(),
                data_type: ColumnDataType::Real,
            })
            .unwrap();
        assert!(guard.validate_column("lux").is_ok());
    }

    #[test]
    fn test_registration_rejects_injection() {
        let mut guard = SchemaGuard::new();
        let result = guard.register_column(ColumnRegistration {
            name: "x".to_string(),
            storage_column: "axis_x -- comment".to_string(),
            data_type: ColumnDataType::Real,
        });
        assert!(matches!(
            result,
            Err(Error::Security(SecurityError::InjectionPattern(_)))
        ));

        let result = guard.register_column(ColumnRegistration {
            name: "1abc".to_string(),
            storage_column: "axis_x".to_string(),
            data_type: ColumnDataType::Real,
        });
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_path_traversal_is_rejected() {
        let base = Path::new("/data/imports");
        assert_eq!(
            validate_import_path(base, Path::new("visit1/4002.csv")).unwrap(),
            PathBuf::from("/data/imports/visit1/4002.csv")
        );
        assert!(matches!(
            validate_import_path(base, Path::new("../secrets.csv")),
            Err(Error::Security(SecurityError::PathTraversal(_)))
        ));
        assert!(validate_import_path(base, Path::new("/etc/passwd")).is_err());
    }
}
