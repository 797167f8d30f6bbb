//! Merged-texts pipelines: synonym-header merge, strict merge, and corpus conversion.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::MergeConfig;
use crate::constants::merge::{
    MERGED_COLUMNS, REQUIRED_COLUMNS, SOURCE_PRESS_CONF, SOURCE_PRESSER, SOURCE_SPEECH,
    STRICT_MERGED_COLUMNS, SYNONYMS,
};
use crate::data::MergedRow;
use crate::errors::PipelineError;
use crate::heuristics::{best_guess, score_candidates};
use crate::ingestion::read_corpus;
use crate::source::RawTable;
use crate::source::date_helpers::{at_midnight, format_timestamp_column, parse_timestamp};
use crate::source::table_reader::parse_delimited;
use crate::transport::fs::{file_name_of, read_input_bytes, write_csv};
use crate::utils::clean_text_basic;

/// Lowercase and trim headers, then map the first present synonym onto each canonical name.
pub fn normalize_headers(table: &mut RawTable) {
    table.rename_headers(|name| Some(name.trim().to_lowercase()));
    for (canonical, alternatives) in SYNONYMS {
        let present = alternatives
            .iter()
            .find(|alt| table.column_index(alt).is_some());
        if let Some(alt) = present
            && *alt != canonical
        {
            table.rename_headers(|name| (name == *alt).then(|| canonical.to_string()));
        }
    }
}

fn required_present(table: &RawTable) -> usize {
    REQUIRED_COLUMNS
        .iter()
        .filter(|column| table.column_index(column).is_some())
        .count()
}

/// Read a CSV trying every encoding and delimiter pair until the canonical columns appear.
///
/// When no pair yields all of `date, title, link, text`, the pair covering the
/// most of them is used and the rest are added as empty columns.
pub fn smart_read_table(path: &Path, config: &MergeConfig) -> Result<RawTable, PipelineError> {
    let bytes = read_input_bytes(path)?;
    let mut attempts: Vec<RawTable> = Vec::new();
    let mut tried = Vec::new();
    for encoding in &config.encodings {
        let Some(text) = encoding.decode(&bytes) else {
            debug!("[ecb_tone:merge] {}: {} failed", path.display(), encoding.name());
            continue;
        };
        for &delimiter in &config.delimiters {
            tried.push(format!("{}/{:?}", encoding.name(), char::from(delimiter)));
            let mut table = match parse_delimited(&text, delimiter) {
                Ok((table, _)) => table,
                Err(reason) => {
                    debug!("[ecb_tone:merge] {}: {reason}", path.display());
                    continue;
                }
            };
            normalize_headers(&mut table);
            if required_present(&table) == REQUIRED_COLUMNS.len() {
                debug!(
                    "[ecb_tone:merge] {}: encoding={} delimiter={:?} columns={:?}",
                    path.display(),
                    encoding.name(),
                    char::from(delimiter),
                    table.headers()
                );
                return Ok(table);
            }
            attempts.push(table);
        }
    }

    let guesses = score_candidates(0..attempts.len(), |&slot| required_present(&attempts[slot]) as f64);
    let Some(best) = best_guess(guesses, 0.0) else {
        return Err(PipelineError::Unreadable {
            path: path.to_path_buf(),
            reason: format!("no canonical columns found (tried {})", tried.join(", ")),
        });
    };
    let mut table = attempts.swap_remove(best.candidate);
    for column in REQUIRED_COLUMNS {
        if table.column_index(column).is_none() {
            warn!("[ecb_tone:merge] {}: no '{column}' column; filling empty", path.display());
            table.push_empty_column(column);
        }
    }
    Ok(table)
}

/// Parse dates, lightly clean text, and drop undated rows.
pub fn prepare_block(table: &RawTable, source_type: &str, day_first: bool) -> Vec<MergedRow> {
    let column = |name: &str| table.column_index(name);
    let (date, title, link, text) = (column("date"), column("title"), column("link"), column("text"));
    let cell = |row: usize, col: Option<usize>| col.and_then(|col| table.cell(row, col));

    (0..table.len())
        .filter_map(|row| {
            let date = cell(row, date).and_then(|value| parse_timestamp(value, day_first))?;
            Some(MergedRow {
                date,
                title: cell(row, title).unwrap_or_default().to_string(),
                link: cell(row, link).unwrap_or_default().to_string(),
                text: clean_text_basic(cell(row, text)),
                source_type: source_type.to_string(),
            })
        })
        .collect()
}

/// Write merged rows with the canonical column order.
pub fn write_merged(path: &Path, rows: &[MergedRow]) -> Result<(), PipelineError> {
    let dates = format_timestamp_column(rows.iter().map(|row| Some(&row.date)));
    write_csv(
        path,
        &MERGED_COLUMNS,
        rows.iter().zip(dates).map(|(row, date)| {
            [
                date,
                row.title.clone(),
                row.link.clone(),
                row.text.clone(),
                row.source_type.clone(),
            ]
        }),
    )
}

/// Merge speeches and press conferences into one date-sorted table.
pub fn merge_texts(
    speeches: &Path,
    pressers: &Path,
    config: &MergeConfig,
) -> Result<Vec<MergedRow>, PipelineError> {
    let speech_table = smart_read_table(speeches, config)?;
    let presser_table = smart_read_table(pressers, config)?;
    debug!("[ecb_tone:merge] speeches columns: {:?}", speech_table.headers());
    debug!("[ecb_tone:merge] pressers columns: {:?}", presser_table.headers());

    let mut merged = prepare_block(&speech_table, SOURCE_SPEECH, config.day_first);
    merged.extend(prepare_block(&presser_table, SOURCE_PRESS_CONF, config.day_first));
    merged.sort_by_key(|row| row.date);
    Ok(merged)
}

/// Map a corpus channel onto the merged `source_type`.
pub fn source_type_for_channel(channel: &str) -> &'static str {
    if channel.to_lowercase().contains("speech") {
        SOURCE_SPEECH
    } else {
        SOURCE_PRESS_CONF
    }
}

/// Convert a normalized corpus into merged rows, keeping corpus order.
///
/// Rows whose `date_time` cannot be read are skipped.
pub fn corpus_to_merged(corpus: &Path) -> Result<Vec<MergedRow>, PipelineError> {
    let rows = read_corpus(corpus)?;
    let total = rows.len();
    let merged: Vec<MergedRow> = rows
        .into_iter()
        .filter_map(|row| {
            let date = at_midnight(row.date_time?.date());
            Some(MergedRow {
                date,
                title: row.title,
                link: row.url,
                text: row.text_clean,
                source_type: source_type_for_channel(&row.channel).to_string(),
            })
        })
        .collect();
    if merged.len() < total {
        debug!(
            "[ecb_tone:merge] skipped {} corpus rows without a date",
            total - merged.len()
        );
    }
    Ok(merged)
}

/// Row of the strict merge.
#[derive(Clone, Debug, PartialEq)]
pub struct StrictMergedRow {
    /// Publication date.
    pub date: NaiveDate,
    /// Title.
    pub title: String,
    /// Source url.
    pub link: String,
    /// Text, never blank.
    pub text: String,
    /// `speech` or `presser`.
    pub source: String,
    /// Position in the pre-sort concatenation.
    pub doc_id: String,
}

fn strict_block(path: &Path, source_label: &str) -> Result<Vec<StrictMergedRow>, PipelineError> {
    let text = String::from_utf8_lossy(&read_input_bytes(path)?).into_owned();
    let (mut table, _) = parse_delimited(&text, b',').map_err(|reason| PipelineError::Unreadable {
        path: path.to_path_buf(),
        reason,
    })?;
    table.rename_headers(|name| Some(name.trim().to_lowercase()));
    let mut columns = Vec::with_capacity(REQUIRED_COLUMNS.len());
    for column in REQUIRED_COLUMNS {
        columns.push(table.column_index(column).ok_or_else(|| PipelineError::MissingColumn {
            column: column.to_string(),
            source_label: source_label.to_string(),
        })?);
    }
    let [date, title, link, body] = [columns[0], columns[1], columns[2], columns[3]];

    let mut seen: HashSet<(NaiveDate, String)> = HashSet::new();
    Ok((0..table.len())
        .filter_map(|row| {
            let date = table
                .cell(row, date)
                .and_then(|value| parse_timestamp(value, false))?
                .date();
            let text = table.cell(row, body)?.to_string();
            let title = table.cell(row, title).unwrap_or_default().to_string();
            if !seen.insert((date, title.clone())) {
                return None;
            }
            Some(StrictMergedRow {
                date,
                title,
                link: table.cell(row, link).unwrap_or_default().to_string(),
                text,
                source: source_label.to_string(),
                doc_id: String::new(),
            })
        })
        .collect())
}

/// Strict merge: exact `date,title,link,text` headers, labels `speech` and `presser`.
///
/// Rows without a date or text are dropped, duplicates on `(date, title)` within
/// a source keep the first, and `doc_id` is the row's position before sorting.
pub fn merge_sources(speeches: &Path, pressers: &Path) -> Result<Vec<StrictMergedRow>, PipelineError> {
    let mut merged = strict_block(speeches, SOURCE_SPEECH)?;
    merged.extend(strict_block(pressers, SOURCE_PRESSER)?);
    for (idx, row) in merged.iter_mut().enumerate() {
        row.doc_id = idx.to_string();
    }
    merged.sort_by_key(|row| row.date);
    Ok(merged)
}

/// Write strict-merge rows.
pub fn save_merged(path: &Path, rows: &[StrictMergedRow]) -> Result<(), PipelineError> {
    write_csv(
        path,
        &STRICT_MERGED_COLUMNS,
        rows.iter().map(|row| {
            [
                row.date.format("%Y-%m-%d").to_string(),
                row.title.clone(),
                row.link.clone(),
                row.text.clone(),
                row.source.clone(),
                row.doc_id.clone(),
            ]
        }),
    )
}

/// Full merge run: read both inputs and write the merged CSV.
pub fn run_merge(
    speeches: &Path,
    pressers: &Path,
    out: &Path,
    config: &MergeConfig,
) -> Result<usize, PipelineError> {
    let merged = merge_texts(speeches, pressers, config)?;
    write_merged(out, &merged)?;
    info!(
        "[ecb_tone:merge] merged {} rows ({} + {}) -> {}",
        merged.len(),
        file_name_of(speeches),
        file_name_of(pressers),
        out.display()
    );
    Ok(merged.len())
}

/// Full corpus conversion run.
pub fn run_corpus_to_merged(corpus: &Path, out: &Path) -> Result<usize, PipelineError> {
    let merged = corpus_to_merged(corpus)?;
    write_merged(out, &merged)?;
    info!("[ecb_tone:merge] wrote {} rows -> {}", merged.len(), out.display());
    Ok(merged.len())
}
