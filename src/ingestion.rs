//! Raw CSV exports to the normalized corpus plus its QA summary.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::NormalizeConfig;
use crate::constants::ingest::CORPUS_COLUMNS;
use crate::data::{Channel, NormalizedDocument};
use crate::errors::PipelineError;
use crate::hash::stable_doc_id;
use crate::heuristics::percent_2dp;
use crate::metrics::{median, value_counts};
use crate::source::RawTable;
use crate::source::date_helpers::{format_timestamp, format_timestamp_column, parse_timestamp};
use crate::source::inference::{ColumnPicks, ColumnRoles, infer_dates};
use crate::source::table_reader::read_table;
use crate::transport::fs::{CsvFrame, csv_writer, file_name_of, write_json_pretty};
use crate::utils::{clean_text, whitespace_token_count};

/// Row counts dropped at each filtering step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Rows read from the file.
    pub rows_in: usize,
    /// Rows dropped for empty text.
    pub dropped_empty_text: usize,
    /// Rows dropped without a date.
    pub dropped_undated: usize,
    /// Rows dropped as duplicates.
    pub dropped_duplicates: usize,
}

/// Documents from one input, with the columns that produced them.
#[derive(Clone, Debug)]
pub struct NormalizedSource {
    /// Documents in input order.
    pub documents: Vec<NormalizedDocument>,
    /// Columns used.
    pub picks: ColumnPicks,
    /// Row counts per filter.
    pub stats: NormalizeStats,
}

/// Normalize one raw table.
///
/// Ids are computed on every row before filtering; rows with empty text or no
/// date are dropped, then duplicates by id keep their first occurrence.
pub fn normalize_table(
    table: &RawTable,
    source_name: &str,
    fallback_channel: &str,
    config: &NormalizeConfig,
) -> NormalizedSource {
    let roles = ColumnRoles::infer(table, &config.needles);
    let dates = infer_dates(table, roles.url, &config.dates);
    let channel = Channel::guess_from_file_name(source_name, fallback_channel);
    let picks = ColumnPicks::describe(table, &roles, &dates, channel.as_str(), source_name);
    debug!("[ecb_tone:ingest] {source_name}: picked {picks:?} (dates from {:?})", dates.source);

    let field = |row: usize, column: Option<usize>| -> String {
        column
            .and_then(|column| table.cell(row, column))
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    };

    let mut stats = NormalizeStats {
        rows_in: table.len(),
        ..NormalizeStats::default()
    };
    let mut seen: HashSet<String> = HashSet::new();
    let mut documents = Vec::new();
    for (row, date_time) in dates.values.iter().enumerate() {
        let title = field(row, roles.title);
        let speaker = field(row, roles.speaker);
        let url = field(row, roles.url);
        let text_clean = clean_text(roles.text.and_then(|column| table.cell(row, column)));
        let rendered_date = date_time.as_ref().map(format_timestamp).unwrap_or_default();
        let doc_id = stable_doc_id(source_name, &title, &rendered_date, &speaker, &text_clean);

        if text_clean.is_empty() {
            stats.dropped_empty_text += 1;
            continue;
        }
        let Some(date_time) = *date_time else {
            stats.dropped_undated += 1;
            continue;
        };
        if !seen.insert(doc_id.clone()) {
            stats.dropped_duplicates += 1;
            continue;
        }

        documents.push(NormalizedDocument {
            doc_id,
            date_time,
            channel: channel.clone(),
            title,
            speaker,
            role: String::new(),
            language: String::new(),
            url,
            n_chars: text_clean.chars().count(),
            n_tokens_ws: whitespace_token_count(&text_clean),
            text_clean,
            source_file: source_name.to_string(),
        });
    }

    debug!("[ecb_tone:ingest] {source_name}: {stats:?}");
    NormalizedSource {
        documents,
        picks,
        stats,
    }
}

/// Read and normalize one input file.
pub fn normalize_file(
    path: &Path,
    fallback_channel: &str,
    config: &NormalizeConfig,
) -> Result<NormalizedSource, PipelineError> {
    let table = read_table(path, &config.reader)?;
    let source_name = file_name_of(path);
    let normalized = normalize_table(&table, &source_name, fallback_channel, config);
    info!(
        "[ecb_tone:ingest] {}: kept {} of {} rows (channel={})",
        source_name,
        normalized.documents.len(),
        normalized.stats.rows_in,
        normalized.picks.channel
    );
    Ok(normalized)
}

/// Concatenated corpus plus per-input column picks.
#[derive(Clone, Debug)]
pub struct IngestOutcome {
    /// Deduplicated, sorted corpus.
    pub documents: Vec<NormalizedDocument>,
    /// Columns used for the first input.
    pub picks_a: ColumnPicks,
    /// Columns used for the second input.
    pub picks_b: ColumnPicks,
}

/// Normalize two inputs, concatenate A then B, and stably sort by date.
pub fn ingest_sources(
    csv_a: (&Path, &str),
    csv_b: (&Path, &str),
    config: &NormalizeConfig,
) -> Result<IngestOutcome, PipelineError> {
    let a = normalize_file(csv_a.0, csv_a.1, config)?;
    let b = normalize_file(csv_b.0, csv_b.1, config)?;

    let mut seen = HashSet::new();
    let mut documents: Vec<NormalizedDocument> = a
        .documents
        .into_iter()
        .chain(b.documents)
        .filter(|doc| seen.insert(doc.doc_id.clone()))
        .collect();
    documents.sort_by_key(|doc| doc.date_time);

    Ok(IngestOutcome {
        documents,
        picks_a: a.picks,
        picks_b: b.picks,
    })
}

/// Earliest and latest `date_time` in the corpus.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TimeRange {
    /// Earliest timestamp.
    pub min: Option<String>,
    /// Latest timestamp.
    pub max: Option<String>,
}

/// Column picks for both inputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PicksByInput {
    /// Picks for the first input.
    #[serde(rename = "A")]
    pub a: ColumnPicks,
    /// Picks for the second input.
    #[serde(rename = "B")]
    pub b: ColumnPicks,
}

/// QA summary written next to the corpus.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QaSummary {
    /// Documents in the corpus.
    pub rows_total: usize,
    /// Earliest and latest timestamps.
    pub time_range: TimeRange,
    /// Documents per channel, largest first.
    pub by_channel: IndexMap<String, usize>,
    /// Percentage of documents without a title.
    #[serde(rename = "missing_title_%")]
    pub missing_title_pct: f64,
    /// Percentage of documents without a speaker.
    #[serde(rename = "missing_speaker_%")]
    pub missing_speaker_pct: f64,
    /// Median `n_chars`.
    pub median_chars: usize,
    /// Median `n_tokens_ws`.
    pub median_tokens_ws: usize,
    /// Columns picked per input.
    pub columns_picked: PicksByInput,
}

impl QaSummary {
    /// Summarize a corpus; percentages are `0.0` for an empty corpus.
    pub fn from_corpus(documents: &[NormalizedDocument], picks_a: ColumnPicks, picks_b: ColumnPicks) -> Self {
        let total = documents.len();
        let min = documents.iter().map(|doc| doc.date_time).min();
        let max = documents.iter().map(|doc| doc.date_time).max();
        let by_channel = value_counts(documents.iter().map(|doc| doc.channel.as_str()))
            .into_iter()
            .map(|share| (share.channel, share.count))
            .collect();
        let missing_title = documents.iter().filter(|doc| doc.title.trim().is_empty()).count();
        let missing_speaker = documents
            .iter()
            .filter(|doc| doc.speaker.trim().is_empty())
            .count();
        let chars: Vec<f64> = documents.iter().map(|doc| doc.n_chars as f64).collect();
        let tokens: Vec<f64> = documents.iter().map(|doc| doc.n_tokens_ws as f64).collect();

        Self {
            rows_total: total,
            time_range: TimeRange {
                min: min.as_ref().map(format_timestamp),
                max: max.as_ref().map(format_timestamp),
            },
            by_channel,
            missing_title_pct: percent_2dp(missing_title, total),
            missing_speaker_pct: percent_2dp(missing_speaker, total),
            median_chars: median(&chars).map(|m| m as usize).unwrap_or(0),
            median_tokens_ws: median(&tokens).map(|m| m as usize).unwrap_or(0),
            columns_picked: PicksByInput {
                a: picks_a,
                b: picks_b,
            },
        }
    }
}

/// Write the corpus CSV in canonical column order.
///
/// `date_time` is written as a bare date when every value is at midnight.
pub fn write_corpus(path: &Path, documents: &[NormalizedDocument]) -> Result<(), PipelineError> {
    let dates = format_timestamp_column(documents.iter().map(|doc| Some(&doc.date_time)));
    let mut writer = csv_writer(path, &CORPUS_COLUMNS)?;
    for (doc, date) in documents.iter().zip(dates) {
        writer.write_record([
            doc.doc_id.as_str(),
            date.as_str(),
            doc.channel.as_str(),
            doc.title.as_str(),
            doc.speaker.as_str(),
            doc.role.as_str(),
            doc.language.as_str(),
            doc.url.as_str(),
            doc.text_clean.as_str(),
            doc.source_file.as_str(),
            doc.n_chars.to_string().as_str(),
            doc.n_tokens_ws.to_string().as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the QA summary as pretty JSON.
pub fn write_qa(path: &Path, qa: &QaSummary) -> Result<(), PipelineError> {
    write_json_pretty(path, qa)
}

/// Corpus row read back with tolerant column access.
///
/// Missing columns become empty strings; rows without a parsable date keep
/// `date_time = None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CorpusRow {
    /// Document id.
    pub doc_id: String,
    /// Parsed timestamp.
    pub date_time: Option<NaiveDateTime>,
    /// Channel label.
    pub channel: String,
    /// Title.
    pub title: String,
    /// Speaker.
    pub speaker: String,
    /// Url.
    pub url: String,
    /// Cleaned text.
    pub text_clean: String,
    /// Raw export file name.
    pub source_file: String,
}

/// Read a corpus CSV; only `doc_id` is required.
pub fn read_corpus(path: &Path) -> Result<Vec<CorpusRow>, PipelineError> {
    let frame = CsvFrame::read(path)?;
    let label = file_name_of(path);
    let doc_id = frame.require_column("doc_id", &label)?;
    let date_time = frame.column_index("date_time");
    let channel = frame.column_index("channel");
    let title = frame.column_index("title");
    let speaker = frame.column_index("speaker");
    let url = frame.column_index("url");
    let text_clean = frame.column_index("text_clean");
    let source_file = frame.column_index("source_file");

    Ok((0..frame.len())
        .map(|row| CorpusRow {
            doc_id: frame.get(row, Some(doc_id)).to_string(),
            date_time: frame
                .value(row, date_time)
                .and_then(|value| parse_timestamp(value, false)),
            channel: frame.get(row, channel).to_string(),
            title: frame.get(row, title).to_string(),
            speaker: frame.get(row, speaker).to_string(),
            url: frame.get(row, url).to_string(),
            text_clean: frame.get(row, text_clean).to_string(),
            source_file: frame.get(row, source_file).to_string(),
        })
        .collect())
}

/// Full ingestion run: normalize both inputs and write corpus plus QA.
pub fn run_ingestion(
    csv_a: (&Path, &str),
    csv_b: (&Path, &str),
    corpus_path: &Path,
    qa_path: &Path,
    config: &NormalizeConfig,
) -> Result<QaSummary, PipelineError> {
    let outcome = ingest_sources(csv_a, csv_b, config)?;
    write_corpus(corpus_path, &outcome.documents)?;
    let qa = QaSummary::from_corpus(&outcome.documents, outcome.picks_a, outcome.picks_b);
    write_qa(qa_path, &qa)?;
    info!(
        "[ecb_tone:ingest] wrote {} rows to {} (range {:?} .. {:?})",
        qa.rows_total,
        corpus_path.display(),
        qa.time_range.min,
        qa.time_range.max
    );
    info!("[ecb_tone:ingest] by_channel: {:?}", qa.by_channel);
    Ok(qa)
}
