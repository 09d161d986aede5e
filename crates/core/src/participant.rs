//! Participant identity derived from device export filenames.
//!
//! Exports for the same participant are often renamed between visits
//! (`4002 T1 G1 (2024-01-01)60sec.csv`, `4002_T1_G1.csv`, ...), so imports are
//! correlated through a composite key rather than the filename.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::UNKNOWN_PARTICIPANT_FIELD;

lazy_static! {
    static ref PARENTHESIZED: Regex = Regex::new(r"\([^)]*\)").expect("valid regex");
    static ref DATE_LIKE: Regex =
        Regex::new(r"\d{4}-\d{2}-\d{2}|\d{1,2}[./]\d{1,2}[./]\d{2,4}").expect("valid regex");
    static ref EPOCH_SUFFIX: Regex = Regex::new(r"(?i)\d+\s*sec\b").expect("valid regex");
    static ref PARTICIPANT_ID: Regex = Regex::new(r"^[A-Za-z]{0,2}(\d{3,8})$").expect("valid regex");
    static ref TIMEPOINT: Regex = Regex::new(r"(?i)^(T\d{1,2}|BO|B0|P\d|FU\d?)$").expect("valid regex");
    static ref GROUP: Regex = Regex::new(r"(?i)^G\d{1,2}$").expect("valid regex");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub numerical_id: String,
    pub timepoint: String,
    pub group: String,
    /// `<id>_<timepoint>_<group>`, or the normalized filename stem when no id
    /// could be found
    pub key: String,
}

impl ParticipantInfo {
    pub fn new(numerical_id: &str, timepoint: &str, group: &str) -> Self {
        Self {
            numerical_id: numerical_id.to_string(),
            timepoint: timepoint.to_string(),
            group: group.to_string(),
            key: format!("{}_{}_{}", numerical_id, timepoint, group),
        }
    }
}

/// Extracts participant id, timepoint and group from a filename.
///
/// Missing timepoint defaults to `T1` and missing group to `G1`. When no
/// numeric id is present the key falls back to the lowercased stem so that
/// unrelated files never collide under a shared placeholder key.
pub fn extract_participant_info(filename: &str) -> ParticipantInfo {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.to_string());

    let cleaned = PARENTHESIZED.replace_all(&stem, " ");
    let cleaned = DATE_LIKE.replace_all(&cleaned, " ");
    let cleaned = EPOCH_SUFFIX.replace_all(&cleaned, " ");

    let mut id = None;
    let mut timepoint = None;
    let mut group = None;

    for token in cleaned
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|t| !t.is_empty())
    {
        if id.is_none() {
            if let Some(caps) = PARTICIPANT_ID.captures(token) {
                id = Some(caps[1].to_string());
                continue;
            }
        }
        if timepoint.is_none() && TIMEPOINT.is_match(token) {
            timepoint = Some(token.to_ascii_uppercase());
            continue;
        }
        if group.is_none() && GROUP.is_match(token) {
            group = Some(token.to_ascii_uppercase());
        }
    }

    match id {
        Some(id) => ParticipantInfo::new(
            &id,
            timepoint.as_deref().unwrap_or("T1"),
            group.as_deref().unwrap_or("G1"),
        ),
        None => {
            let fallback: String = stem
                .trim()
                .to_lowercase()
                .chars()
                .map(|c| if c.is_alphanumeric() { c } else { '_' })
                .collect();
            ParticipantInfo {
                numerical_id: UNKNOWN_PARTICIPANT_FIELD.to_string(),
                timepoint: timepoint.unwrap_or_else(|| UNKNOWN_PARTICIPANT_FIELD.to_string()),
                group: group.unwrap_or_else(|| UNKNOWN_PARTICIPANT_FIELD.to_string()),
                key: fallback,
            }
        }
    }
}
