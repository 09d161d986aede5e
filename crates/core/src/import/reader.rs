//! Delimited text reading for device exports.
//!
//! Handles the metadata block devices write above the header row, delimiter
//! auto-detection and non-UTF-8 encodings.

use chardetng::EncodingDetector;
use csv::{ReaderBuilder, Terminator};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::ImportError;
use crate::Result;

const CANDIDATE_DELIMITERS: [char; 3] = [',', ';', '\t'];

/// Lines sampled when scoring delimiters
const DELIMITER_SAMPLE_LINES: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadConfig {
    /// Lines above the header row to discard
    pub skip_rows: usize,
    /// `None` means auto-detect
    pub delimiter: Option<char>,
}

/// Header and rows of a decoded file. Every row has exactly
/// `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelimitedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub delimiter: char,
    /// Name of the encoding the content was decoded with
    pub encoding: String,
    /// Non-fatal problems (malformed records, lossy decoding, ragged rows)
    pub warnings: Vec<String>,
}

/// Reads `content` into a header row plus data rows.
pub fn read_delimited(content: &[u8], config: &ReadConfig) -> Result<DelimitedTable> {
    let mut warnings = Vec::new();
    let (text, encoding) = decode_content(content, &mut warnings);

    let body = skip_lines(&text, config.skip_rows);
    if body.trim().is_empty() {
        return Err(ImportError::Parse(format!(
            "No content after skipping {} metadata rows",
            config.skip_rows
        ))
        .into());
    }

    let delimiter = config.delimiter.unwrap_or_else(|| detect_delimiter(body));
    debug!("Reading delimited content ({}, delimiter {:?})", encoding, delimiter);

    let (headers, rows) = parse_records(body, delimiter, &mut warnings)?;

    Ok(DelimitedTable {
        headers,
        rows,
        delimiter,
        encoding,
        warnings,
    })
}

/// Decodes bytes to text. UTF-8 (with or without BOM) is taken as is;
/// anything else goes through encoding detection.
fn decode_content(content: &[u8], warnings: &mut Vec<String>) -> (String, String) {
    let without_bom = content.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(content);

    if let Ok(s) = std::str::from_utf8(without_bom) {
        return (s.to_string(), encoding_rs::UTF_8.name().to_string());
    }

    let mut detector = EncodingDetector::new();
    detector.feed(content, true);
    let guessed = detector.guess(None, true);
    let (decoded, used, had_errors) = guessed.decode(content);
    if had_errors {
        warn!("Lossy decode using {}", used.name());
        warnings.push(format!(
            "Content is not valid {}; some characters were replaced",
            used.name()
        ));
    }
    (decoded.into_owned(), used.name().to_string())
}

fn skip_lines(text: &str, count: usize) -> &str {
    let mut rest = text;
    for _ in 0..count {
        match rest.find('\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return "",
        }
    }
    rest
}

/// Picks the candidate delimiter that splits the first lines most
/// consistently.
fn detect_delimiter(content: &str) -> char {
    let mut best = ',';
    let mut best_score = 0usize;

    for delimiter in CANDIDATE_DELIMITERS {
        let score = score_delimiter(content, delimiter);
        if score > best_score {
            best_score = score;
            best = delimiter;
        }
    }

    best
}

fn score_delimiter(content: &str, delimiter: char) -> usize {
    let counts: Vec<usize> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(DELIMITER_SAMPLE_LINES)
        .map(|line| line.matches(delimiter).count())
        .collect();

    match counts.first() {
        None | Some(0) => 0,
        Some(&first) => first * counts.iter().filter(|&&c| c == first).count(),
    }
}

fn parse_records(
    content: &str,
    delimiter: char,
    warnings: &mut Vec<String>,
) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let delimiter_byte = u8::try_from(delimiter).map_err(|_| {
        ImportError::Parse(format!("Delimiter {:?} is not a single-byte character", delimiter))
    })?;

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter_byte)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .terminator(Terminator::Any(b'\n'))
        .from_reader(content.as_bytes());

    let mut records: Vec<Vec<String>> = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        match result {
            Ok(record) => {
                let row: Vec<String> = record
                    .iter()
                    .map(|s| s.trim_end_matches('\r').to_string())
                    .collect();
                if row.iter().all(|cell| cell.is_empty()) {
                    continue;
                }
                records.push(row);
            }
            Err(e) => warnings.push(format!("Skipped malformed record {}: {}", idx + 1, e)),
        }
    }

    let mut records = records.into_iter();
    let headers: Vec<String> = records
        .next()
        .ok_or_else(|| ImportError::Parse("File has no header row".to_string()))?;
    let header_count = headers.len();

    let rows = records
        .enumerate()
        .map(|(idx, mut row)| {
            if row.len() > header_count {
                warnings.push(format!(
                    "Row {} has {} columns, expected {}. Extra columns ignored.",
                    idx + 1,
                    row.len(),
                    header_count
                ));
            }
            row.resize(header_count, String::new());
            row
        })
        .collect();

    Ok((headers, rows))
}
