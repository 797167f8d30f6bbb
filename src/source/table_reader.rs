//! Encoding and delimiter detection for arbitrary CSV exports.

use std::path::Path;

use tracing::debug;

use super::RawTable;
use crate::config::ReaderConfig;
use crate::constants::reader::ENCODINGS;
use crate::errors::PipelineError;
use crate::heuristics::{best_guess, score_candidates};
use crate::transport::fs::read_input_bytes;

/// Text encodings the reader knows how to decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextEncoding {
    /// Strict UTF-8.
    Utf8,
    /// Strict UTF-8 with a leading byte-order mark removed.
    Utf8Sig,
    /// Windows-1252; fails on its five undefined bytes.
    Cp1252,
    /// ISO-8859-1; every byte maps to a code point.
    Latin1,
}

/// Code points for cp1252 bytes `0x80..=0x9F` (`None` = undefined).
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

impl TextEncoding {
    /// The reader's fallback order, as listed in [`ENCODINGS`].
    pub fn default_order() -> Vec<Self> {
        ENCODINGS.iter().filter_map(|name| Self::from_name(name)).collect()
    }

    /// Look up an encoding by its conventional label.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "utf-8-sig" | "utf8-sig" => Some(Self::Utf8Sig),
            "cp1252" | "windows-1252" => Some(Self::Cp1252),
            "latin-1" | "latin1" | "iso-8859-1" => Some(Self::Latin1),
            _ => None,
        }
    }

    /// Conventional encoding label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf8Sig => "utf-8-sig",
            Self::Cp1252 => "cp1252",
            Self::Latin1 => "latin-1",
        }
    }

    /// Decode the whole buffer, or `None` when any byte sequence is invalid.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            Self::Utf8Sig => {
                let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(str::to_string)
            }
            Self::Cp1252 => bytes
                .iter()
                .map(|&byte| match byte {
                    0x80..=0x9F => CP1252_HIGH[usize::from(byte - 0x80)],
                    _ => Some(char::from(byte)),
                })
                .collect(),
            Self::Latin1 => Some(bytes.iter().map(|&byte| char::from(byte)).collect()),
        }
    }
}

/// Decode with the first encoding that accepts every byte.
pub fn decode_with_fallback(
    bytes: &[u8],
    encodings: &[TextEncoding],
) -> Option<(TextEncoding, String)> {
    encodings
        .iter()
        .find_map(|encoding| encoding.decode(bytes).map(|text| (*encoding, text)))
}

/// Read a CSV of unknown encoding and delimiter into a `RawTable`.
pub fn read_table(path: &Path, config: &ReaderConfig) -> Result<RawTable, PipelineError> {
    let bytes = read_input_bytes(path)?;
    let (encoding, text) = decode_with_fallback(&bytes, &config.encodings).ok_or_else(|| {
        PipelineError::Undecodable {
            path: path.to_path_buf(),
            tried: config
                .encodings
                .iter()
                .map(|encoding| encoding.name().to_string())
                .collect(),
        }
    })?;
    let delimiter = guess_delimiter(&text, config);
    let (table, skipped) = parse_delimited(&text, delimiter).map_err(|reason| {
        PipelineError::Unreadable {
            path: path.to_path_buf(),
            reason,
        }
    })?;
    debug!(
        "[ecb_tone:reader] {} encoding={} delimiter={:?} rows={} skipped_lines={}",
        path.display(),
        encoding.name(),
        char::from(delimiter),
        table.len(),
        skipped
    );
    Ok(table)
}

/// Sniff the delimiter, falling back to the most frequent candidate.
pub fn guess_delimiter(text: &str, config: &ReaderConfig) -> u8 {
    let sample: String = text.chars().take(config.sniff_sample_chars).collect();
    let truncated = sample.len() < text.len();
    sniff_delimiter(&sample, truncated, config)
        .unwrap_or_else(|| most_frequent_delimiter(&sample, &config.delimiters))
}

/// Pick the candidate whose per-record count is most consistent across the sample.
///
/// Counting ignores delimiters inside double quotes, and records end at
/// unquoted newlines, so multi-line quoted cells count as one record. When the
/// sample was cut short the trailing partial record is ignored.
pub fn sniff_delimiter(sample: &str, truncated: bool, config: &ReaderConfig) -> Option<u8> {
    let mut records = record_delimiter_counts(sample, &config.delimiters);
    if truncated && records.len() > 1 {
        records.pop();
    }
    records.truncate(config.sniff_max_lines);
    if records.is_empty() {
        return None;
    }

    let guesses = score_candidates(0..config.delimiters.len(), |&slot| {
        let counts: Vec<usize> = records.iter().map(|counts| counts[slot]).collect();
        let (mode, agreeing) = mode_with_frequency(&counts);
        if mode == 0 {
            return 0.0;
        }
        agreeing as f64 / counts.len() as f64
    });
    let floor = (config.min_consistency - f64::EPSILON).max(0.0);
    best_guess(guesses, floor).map(|guess| config.delimiters[guess.candidate])
}

/// Candidate with the highest raw occurrence count; the first wins ties.
pub fn most_frequent_delimiter(sample: &str, delimiters: &[u8]) -> u8 {
    let mut best = delimiters.first().copied().unwrap_or(b',');
    let mut best_count = 0usize;
    for &delimiter in delimiters {
        let count = sample.bytes().filter(|&byte| byte == delimiter).count();
        if count > best_count {
            best = delimiter;
            best_count = count;
        }
    }
    best
}

fn record_delimiter_counts(sample: &str, delimiters: &[u8]) -> Vec<Vec<usize>> {
    let mut records = Vec::new();
    let mut current = vec![0usize; delimiters.len()];
    let mut in_quotes = false;
    let mut has_content = false;
    for byte in sample.bytes() {
        match byte {
            b'"' => {
                in_quotes = !in_quotes;
                has_content = true;
            }
            b'\n' if !in_quotes => {
                if has_content {
                    records.push(std::mem::replace(&mut current, vec![0; delimiters.len()]));
                }
                has_content = false;
            }
            b'\r' => {}
            _ => {
                has_content = true;
                if !in_quotes
                    && let Some(slot) = delimiters.iter().position(|&d| d == byte)
                {
                    current[slot] += 1;
                }
            }
        }
    }
    if has_content {
        records.push(current);
    }
    records
}

fn mode_with_frequency(values: &[usize]) -> (usize, usize) {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mut best = (0usize, 0usize);
    let mut idx = 0;
    while idx < sorted.len() {
        let value = sorted[idx];
        let run = sorted[idx..].iter().take_while(|&&v| v == value).count();
        if run > best.1 || (run == best.1 && value > best.0) {
            best = (value, run);
        }
        idx += run;
    }
    best
}

/// Parse delimited text, skipping malformed and over-long lines.
///
/// Returns the table and the number of skipped lines. Short lines are padded
/// with empty (missing) cells.
pub fn parse_delimited(text: &str, delimiter: u8) -> Result<(RawTable, usize), String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = loop {
        match records.next() {
            Some(Ok(record)) => {
                break record
                    .iter()
                    .map(|name| name.trim_start_matches('\u{feff}').trim().to_string())
                    .collect();
            }
            Some(Err(_)) => continue,
            None => return Err("no header row".to_string()),
        }
    };

    let width = headers.len();
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in records {
        let Ok(record) = record else {
            skipped += 1;
            continue;
        };
        if record.len() > width {
            skipped += 1;
            continue;
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(width, String::new());
        rows.push(row);
    }
    Ok((RawTable::new(headers, rows), skipped))
}
