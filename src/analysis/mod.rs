//! Feature analysis: join with corpus metadata, per-channel z-scores, labels, and exports.
//!
//! Ownership model:
//! - `labels` turns scores into per-channel z-scores and tone labels.
//! - `plots` renders PNG summaries with `plotters`.
//! - this module joins inputs and writes every CSV export.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::config::{AnalysisColumns, AnalysisConfig, LabelPolicy};
use crate::constants::analysis::{
    CHANNEL_STATS_FILE, EXCERPT_CHARS, FEATURES_READY_FILE, HISTOGRAM_BINS, MONTHLY_SERIES_FILE,
    PLOT_BY_CHANNEL_FILE, PLOT_HIST_FILE, PLOT_MONTHLY_FILE, PREVIEW_ROWS,
    READING_PACK_DOVISH_FILE, READING_PACK_HAWKISH_FILE, READING_PACK_ROWS, UNKNOWN_CHANNEL,
};
use crate::data::ToneLabel;
use crate::errors::PipelineError;
use crate::ingestion::{CorpusRow, read_corpus};
use crate::metrics::{ChannelStats, channel_stats, mean};
use crate::scoring::FeatureTable;
use crate::source::date_helpers::format_timestamp_column;
use crate::transport::fs::write_csv;
use crate::types::DocId;
use crate::utils::excerpt;

/// Per-channel standardization and labeling.
pub mod labels;
/// PNG plots of the analysed scores.
pub mod plots;

use labels::{group_indices, label_within, standardize_within};

/// One feature record joined with its document metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisRow {
    /// Corpus document id.
    pub doc_id: DocId,
    /// Publication timestamp, when the metadata has one.
    pub date_time: Option<NaiveDateTime>,
    /// Channel label; `unknown` without metadata.
    pub channel: String,
    /// Document title.
    pub title: String,
    /// Speaker name.
    pub speaker: String,
    /// Source url.
    pub url: String,
    /// Raw export the document came from.
    pub source_file: String,
    /// Cleaned document text.
    pub text_clean: String,
    /// Raw score.
    pub score: f64,
    /// Corpus-wide z-score of `score`.
    pub score_z: f64,
    /// Z-score of `score` within the channel.
    pub channel_z: f64,
    /// Label derived from `channel_z`.
    pub label: ToneLabel,
}

impl AnalysisRow {
    fn from_feature(doc_id: DocId, score: f64, score_z: f64) -> Self {
        Self {
            doc_id,
            date_time: None,
            channel: UNKNOWN_CHANNEL.to_string(),
            title: String::new(),
            speaker: String::new(),
            url: String::new(),
            source_file: String::new(),
            text_clean: String::new(),
            score,
            score_z,
            channel_z: 0.0,
            label: ToneLabel::Neutral,
        }
    }
}

/// Joined, standardized, and labeled rows.
#[derive(Clone, Debug)]
pub struct AnalysisTable {
    /// Output column names.
    pub columns: AnalysisColumns,
    /// False when features were analysed without corpus metadata.
    pub has_metadata: bool,
    /// Rows in metadata order.
    pub rows: Vec<AnalysisRow>,
}

/// Inner join in metadata order; without metadata every row is `unknown`.
pub fn join_features(features: &FeatureTable, metadata: Option<Vec<CorpusRow>>) -> Vec<AnalysisRow> {
    let Some(metadata) = metadata else {
        return features
            .records
            .iter()
            .map(|record| AnalysisRow::from_feature(record.doc_id.clone(), record.score, record.score_z))
            .collect();
    };

    let mut by_id: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, record) in features.records.iter().enumerate() {
        by_id.entry(record.doc_id.as_str()).or_default().push(idx);
    }
    let mut rows = Vec::new();
    for meta in metadata {
        let Some(matches) = by_id.get(meta.doc_id.as_str()) else {
            continue;
        };
        for &idx in matches {
            let record = &features.records[idx];
            let channel = if meta.channel.trim().is_empty() {
                UNKNOWN_CHANNEL.to_string()
            } else {
                meta.channel.clone()
            };
            rows.push(AnalysisRow {
                doc_id: meta.doc_id.clone(),
                date_time: meta.date_time,
                channel,
                title: meta.title.clone(),
                speaker: meta.speaker.clone(),
                url: meta.url.clone(),
                source_file: meta.source_file.clone(),
                text_clean: meta.text_clean.clone(),
                score: record.score,
                score_z: record.score_z,
                channel_z: 0.0,
                label: ToneLabel::Neutral,
            });
        }
    }
    rows
}

/// Fill per-channel z-scores and labels in place.
pub fn standardize_and_label(rows: &mut [AnalysisRow], policy: LabelPolicy) {
    let channels: Vec<String> = rows.iter().map(|row| row.channel.clone()).collect();
    let groups = group_indices(channels.iter().map(String::as_str));
    let scores: Vec<f64> = rows.iter().map(|row| row.score).collect();
    let z = standardize_within(&groups, &scores);
    let labels = label_within(&groups, &z, policy);
    for ((row, z), label) in rows.iter_mut().zip(z).zip(labels) {
        row.channel_z = z;
        row.label = label;
    }
}

/// Load features (and metadata when present) and label them.
pub fn load_table(config: &AnalysisConfig) -> Result<AnalysisTable, PipelineError> {
    let features = FeatureTable::read(&config.features_path, &config.columns.score)?;
    let metadata = if config.meta_path.is_file() {
        let meta = read_corpus(&config.meta_path)?;
        info!(
            "[ecb_tone:analysis] joining {} features with {} metadata rows from {}",
            features.len(),
            meta.len(),
            config.meta_path.display()
        );
        Some(meta)
    } else {
        info!(
            "[ecb_tone:analysis] no metadata at {}; channel is '{UNKNOWN_CHANNEL}'",
            config.meta_path.display()
        );
        None
    };
    let has_metadata = metadata.is_some();
    let mut rows = join_features(&features, metadata);
    standardize_and_label(&mut rows, config.policy);
    Ok(AnalysisTable {
        columns: config.columns.clone(),
        has_metadata,
        rows,
    })
}

/// Rows sorted by per-channel z (stable), most hawkish first unless `ascending`.
pub fn ranked(rows: &[AnalysisRow], ascending: bool, limit: usize) -> Vec<&AnalysisRow> {
    let mut sorted: Vec<&AnalysisRow> = rows.iter().collect();
    if ascending {
        sorted.sort_by(|a, b| a.channel_z.total_cmp(&b.channel_z));
    } else {
        sorted.sort_by(|a, b| b.channel_z.total_cmp(&a.channel_z));
    }
    sorted.truncate(limit);
    sorted
}

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

/// Mean per-channel z per calendar month, from the first to the last dated row.
///
/// Months without documents carry `None`.
pub fn monthly_series(rows: &[AnalysisRow]) -> Vec<(NaiveDate, Option<f64>)> {
    let mut buckets: HashMap<NaiveDate, Vec<f64>> = HashMap::new();
    for row in rows {
        if let Some(date_time) = row.date_time {
            buckets
                .entry(month_end(date_time.date()))
                .or_default()
                .push(row.channel_z);
        }
    }
    let (Some(first), Some(last)) = (buckets.keys().min().copied(), buckets.keys().max().copied())
    else {
        return Vec::new();
    };
    let mut series = Vec::new();
    let mut month = first;
    while month <= last {
        series.push((month, buckets.get(&month).and_then(|values| mean(values))));
        let Some(next) = month.succ_opt() else {
            break;
        };
        month = month_end(next);
    }
    series
}

/// Stats of per-channel z per channel, channels sorted.
pub fn stats_by_channel(rows: &[AnalysisRow]) -> Vec<ChannelStats> {
    let groups = group_indices(rows.iter().map(|row| row.channel.as_str()));
    groups
        .iter()
        .map(|(channel, indices)| {
            let values: Vec<f64> = indices.iter().map(|&idx| rows[idx].channel_z).collect();
            channel_stats(channel, &values)
        })
        .collect()
}

fn row_headers(table: &AnalysisTable, include_text: bool) -> Vec<String> {
    let mut headers: Vec<String> = if table.has_metadata {
        ["doc_id", "date_time", "channel", "title", "speaker", "url", "source_file"]
            .iter()
            .map(|name| name.to_string())
            .collect()
    } else {
        vec!["doc_id".to_string(), "channel".to_string()]
    };
    if include_text && table.has_metadata {
        headers.push("text_clean".to_string());
    }
    headers.extend([
        table.columns.score.clone(),
        table.columns.score_z.clone(),
        table.columns.channel_z.clone(),
        table.columns.label.clone(),
    ]);
    headers
}

fn row_cells(table: &AnalysisTable, row: &AnalysisRow, date: String, include_text: bool) -> Vec<String> {
    let mut cells = if table.has_metadata {
        vec![
            row.doc_id.clone(),
            date,
            row.channel.clone(),
            row.title.clone(),
            row.speaker.clone(),
            row.url.clone(),
            row.source_file.clone(),
        ]
    } else {
        vec![row.doc_id.clone(), row.channel.clone()]
    };
    if include_text && table.has_metadata {
        cells.push(row.text_clean.clone());
    }
    cells.extend([
        row.score.to_string(),
        row.score_z.to_string(),
        row.channel_z.to_string(),
        row.label.to_string(),
    ]);
    cells
}

/// Write `rows` with the full analysis layout.
pub fn write_rows(
    path: &Path,
    table: &AnalysisTable,
    rows: &[&AnalysisRow],
    include_text: bool,
) -> Result<(), PipelineError> {
    let dates = format_timestamp_column(rows.iter().map(|row| row.date_time.as_ref()));
    write_csv(
        path,
        &row_headers(table, include_text),
        rows.iter()
            .zip(dates)
            .map(|(row, date)| row_cells(table, row, date, include_text)),
    )
}

/// Write `date_time,mean_z` with empty means for gap months.
pub fn write_monthly_series(path: &Path, series: &[(NaiveDate, Option<f64>)]) -> Result<(), PipelineError> {
    write_csv(
        path,
        &["date_time", "mean_z"],
        series.iter().map(|(month, value)| {
            [
                month.format("%Y-%m-%d").to_string(),
                value.map(|v| v.to_string()).unwrap_or_default(),
            ]
        }),
    )
}

/// Write `channel,mean,median,std,count`.
pub fn write_channel_stats(path: &Path, stats: &[ChannelStats]) -> Result<(), PipelineError> {
    write_csv(
        path,
        &["channel", "mean", "median", "std", "count"],
        stats.iter().map(|stat| {
            [
                stat.channel.clone(),
                stat.mean.to_string(),
                stat.median.to_string(),
                stat.std.map(|std| std.to_string()).unwrap_or_default(),
                stat.count.to_string(),
            ]
        }),
    )
}

/// Write a reading pack: metadata, per-channel z, and a short excerpt.
pub fn write_reading_pack(
    path: &Path,
    columns: &AnalysisColumns,
    rows: &[&AnalysisRow],
) -> Result<(), PipelineError> {
    let dates = format_timestamp_column(rows.iter().map(|row| row.date_time.as_ref()));
    let headers = [
        "date_time",
        "channel",
        "speaker",
        "title",
        "url",
        columns.channel_z.as_str(),
        "excerpt",
    ];
    write_csv(
        path,
        &headers,
        rows.iter().zip(dates).map(|(row, date)| {
            [
                date,
                row.channel.clone(),
                row.speaker.clone(),
                row.title.clone(),
                row.url.clone(),
                row.channel_z.to_string(),
                excerpt(&row.text_clean, EXCERPT_CHARS),
            ]
        }),
    )
}

/// Console preview of the first rows.
pub fn preview_lines(table: &AnalysisTable, limit: usize) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<19}  {:<16}  {:<20}  {:<40}  {:>10}  {:>8}  {}",
        "date_time", "channel", "speaker", "title", "score", "z_ch", "label"
    )];
    for row in table.rows.iter().take(limit) {
        let date = row
            .date_time
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let title: String = row.title.chars().take(40).collect();
        let speaker: String = row.speaker.chars().take(20).collect();
        lines.push(format!(
            "{:<19}  {:<16}  {:<20}  {:<40}  {:>10.4}  {:>8.3}  {}",
            date, row.channel, speaker, title, row.score, row.channel_z, row.label
        ));
    }
    lines
}

/// Render the PNG summaries; an empty table logs a warning and draws nothing.
fn write_plots(
    table: &AnalysisTable,
    series: &[(NaiveDate, Option<f64>)],
    out_dir: &Path,
) -> Result<Vec<PathBuf>, PipelineError> {
    let out = |name: &str| out_dir.join(name);
    let z: Vec<f64> = table
        .rows
        .iter()
        .map(|row| row.channel_z)
        .filter(|z| z.is_finite())
        .collect();
    if z.is_empty() {
        warn!("[ecb_tone:analysis] no scored rows to plot; skipping plots");
        return Ok(Vec::new());
    }

    let mut written = Vec::new();
    let path = out(PLOT_HIST_FILE);
    plots::plot_histogram(&path, &z, HISTOGRAM_BINS)?;
    written.push(path);

    let groups: Vec<(String, Vec<f64>)> = group_indices(table.rows.iter().map(|row| row.channel.as_str()))
        .into_iter()
        .map(|(channel, indices)| {
            (
                channel.to_string(),
                indices
                    .iter()
                    .map(|&idx| table.rows[idx].channel_z)
                    .filter(|z| z.is_finite())
                    .collect(),
            )
        })
        .collect();
    let path = out(PLOT_BY_CHANNEL_FILE);
    plots::plot_by_channel(&path, &groups)?;
    written.push(path);

    if series.iter().any(|(_, value)| value.is_some()) {
        let path = out(PLOT_MONTHLY_FILE);
        plots::plot_monthly(&path, series)?;
        written.push(path);
    }
    Ok(written)
}

/// Outcome of a full analysis run.
#[derive(Clone, Debug)]
pub struct AnalysisSummary {
    /// Number of joined rows.
    pub rows: usize,
    /// Whether corpus metadata was joined.
    pub has_metadata: bool,
    /// Every file written, in write order.
    pub written: Vec<PathBuf>,
    /// Header plus the first preview rows.
    pub preview: Vec<String>,
}

/// Run the configured analysis and write every export into `config.out_dir`.
pub fn run_analysis(config: &AnalysisConfig) -> Result<AnalysisSummary, PipelineError> {
    let table = load_table(config)?;
    let out = |name: &str| config.out_dir.join(name);
    let mut written = Vec::new();

    let all: Vec<&AnalysisRow> = table.rows.iter().collect();
    let path = out(FEATURES_READY_FILE);
    write_rows(&path, &table, &all, config.reading_packs)?;
    written.push(path);

    let path = out(&config.top_file);
    write_rows(&path, &table, &ranked(&table.rows, false, config.top_n), config.reading_packs)?;
    written.push(path);
    let path = out(&config.bottom_file);
    write_rows(&path, &table, &ranked(&table.rows, true, config.top_n), config.reading_packs)?;
    written.push(path);

    let series = monthly_series(&table.rows);
    if table.has_metadata {
        let path = out(MONTHLY_SERIES_FILE);
        write_monthly_series(&path, &series)?;
        written.push(path);
    }

    let stats = stats_by_channel(&table.rows);
    let path = out(CHANNEL_STATS_FILE);
    write_channel_stats(&path, &stats)?;
    written.push(path);

    if config.reading_packs && table.has_metadata {
        for (name, ascending) in [(READING_PACK_HAWKISH_FILE, false), (READING_PACK_DOVISH_FILE, true)] {
            let path = out(name);
            write_reading_pack(&path, &table.columns, &ranked(&table.rows, ascending, READING_PACK_ROWS))?;
            written.push(path);
        }
    }

    if config.plots {
        written.extend(write_plots(&table, &series, &config.out_dir)?);
    }

    info!(
        "[ecb_tone:analysis] {} rows analysed; wrote {} files to {}",
        table.rows.len(),
        written.len(),
        config.out_dir.display()
    );
    Ok(AnalysisSummary {
        rows: table.rows.len(),
        has_metadata: table.has_metadata,
        written,
        preview: preview_lines(&table, PREVIEW_ROWS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureRecord;

    fn features(ids: &[&str], scores: &[f64]) -> FeatureTable {
        FeatureTable::from_scores(
            "tfidf_hawk_minus_dove",
            ids.iter().map(|id| id.to_string()).collect(),
            scores.to_vec(),
        )
    }

    fn meta(doc_id: &str, date: &str, channel: &str) -> CorpusRow {
        CorpusRow {
            doc_id: doc_id.to_string(),
            date_time: NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            channel: channel.to_string(),
            ..CorpusRow::default()
        }
    }

    #[test]
    fn inner_join_follows_metadata_order_and_drops_unmatched() {
        let table = features(&["a", "b", "c"], &[1.0, 2.0, 3.0]);
        let rows = join_features(
            &table,
            Some(vec![meta("c", "2020-01-01", "qna"), meta("x", "2020-01-01", "qna"), meta("a", "2020-02-01", "")]),
        );
        let ids: Vec<_> = rows.iter().map(|row| row.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(rows[1].channel, UNKNOWN_CHANNEL);
    }

    #[test]
    fn without_metadata_everything_is_unknown() {
        let table = FeatureTable {
            score_column: "s".into(),
            records: vec![FeatureRecord {
                doc_id: "a".into(),
                score: 1.0,
                score_z: 0.0,
            }],
        };
        let rows = join_features(&table, None);
        assert_eq!(rows[0].channel, "unknown");
        assert_eq!(rows[0].date_time, None);
    }

    #[test]
    fn month_end_handles_december_and_leap_years() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(month_end(d(2020, 2, 10)), d(2020, 2, 29));
        assert_eq!(month_end(d(2021, 12, 1)), d(2021, 12, 31));
    }

    #[test]
    fn monthly_series_fills_gap_months() {
        let table = features(&["a", "b", "c"], &[1.0, 2.0, 3.0]);
        let mut rows = join_features(
            &table,
            Some(vec![
                meta("a", "2020-01-05", "speech"),
                meta("b", "2020-01-20", "speech"),
                meta("c", "2020-03-02", "speech"),
            ]),
        );
        standardize_and_label(&mut rows, LabelPolicy::fixed_threshold());
        let series = monthly_series(&rows);
        let months: Vec<String> = series.iter().map(|(m, _)| m.to_string()).collect();
        assert_eq!(months, vec!["2020-01-31", "2020-02-29", "2020-03-31"]);
        assert!(series[1].1.is_none());
        let jan = series[0].1.unwrap();
        assert!((jan - (rows[0].channel_z + rows[1].channel_z) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn rankings_are_stable_for_ties() {
        let table = features(&["a", "b", "c"], &[1.0, 1.0, 0.0]);
        let mut rows = join_features(&table, None);
        standardize_and_label(&mut rows, LabelPolicy::fixed_threshold());
        let top: Vec<_> = ranked(&rows, false, 2).iter().map(|r| r.doc_id.clone()).collect();
        assert_eq!(top, vec!["a", "b"]);
        let bottom: Vec<_> = ranked(&rows, true, 1).iter().map(|r| r.doc_id.clone()).collect();
        assert_eq!(bottom, vec!["c"]);
    }
}
