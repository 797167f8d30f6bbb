//! Per-document hawkish-minus-dovish scores.
//!
//! - `tfidf` scores documents lexically from seed-term weights.
//! - `tone` scores documents with a sentiment classifier over text chunks.
//!
//! Both write the same feature layout: `doc_id, <score>, <score>_z`.

use std::path::Path;

use tracing::warn;

use crate::constants::scoring::Z_SUFFIX;
use crate::data::FeatureRecord;
use crate::errors::PipelineError;
use crate::transport::fs::{CsvFrame, csv_writer, file_name_of};
use crate::types::DocId;

pub use crate::metrics::standardize;

/// Lexical TF-IDF scorer.
pub mod tfidf;
/// Chunked classifier tone scorer.
pub mod tone;

/// Name of the corpus-wide z column for `score_column`.
pub fn z_column(score_column: &str) -> String {
    format!("{score_column}{Z_SUFFIX}")
}

/// Scores for one column, keyed by `doc_id`, in corpus order.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureTable {
    /// Name of the score column.
    pub score_column: String,
    /// Scores in corpus order.
    pub records: Vec<FeatureRecord>,
}

impl FeatureTable {
    /// Pair ids with raw scores and standardize across the whole table.
    pub fn from_scores(score_column: &str, doc_ids: Vec<DocId>, scores: Vec<f64>) -> Self {
        let z = standardize(&scores);
        let records = doc_ids
            .into_iter()
            .zip(scores)
            .zip(z)
            .map(|((doc_id, score), score_z)| FeatureRecord {
                doc_id,
                score,
                score_z,
            })
            .collect();
        Self {
            score_column: score_column.to_string(),
            records,
        }
    }

    /// Number of scored documents.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no document was scored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write `doc_id, <score>, <score>_z`.
    pub fn write(&self, path: &Path) -> Result<(), PipelineError> {
        let headers = [
            "doc_id".to_string(),
            self.score_column.clone(),
            z_column(&self.score_column),
        ];
        let mut writer = csv_writer(path, &headers)?;
        for record in &self.records {
            writer.write_record([
                record.doc_id.clone(),
                record.score.to_string(),
                record.score_z.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a feature CSV, computing the z column when it is absent.
    ///
    /// Rows whose score does not parse as a number are skipped.
    pub fn read(path: &Path, score_column: &str) -> Result<Self, PipelineError> {
        let frame = CsvFrame::read(path)?;
        let label = file_name_of(path);
        let doc_id = frame.require_column("doc_id", &label)?;
        let score = frame.require_column(score_column, &label)?;
        let score_z = frame.column_index(&z_column(score_column));

        let mut doc_ids = Vec::with_capacity(frame.len());
        let mut scores = Vec::with_capacity(frame.len());
        let mut stored_z = Vec::with_capacity(frame.len());
        let mut skipped = 0usize;
        for row in 0..frame.len() {
            let Some(value) = parse_number(frame.get(row, Some(score))) else {
                skipped += 1;
                continue;
            };
            doc_ids.push(frame.get(row, Some(doc_id)).to_string());
            scores.push(value);
            stored_z.push(parse_number(frame.get(row, score_z)));
        }
        if skipped > 0 {
            warn!("[ecb_tone:features] {label}: skipped {skipped} rows with a non-numeric {score_column}");
        }

        if score_z.is_some() && stored_z.iter().all(Option::is_some) {
            let records = doc_ids
                .into_iter()
                .zip(scores)
                .zip(stored_z.into_iter().flatten())
                .map(|((doc_id, score), score_z)| FeatureRecord {
                    doc_id,
                    score,
                    score_z,
                })
                .collect();
            return Ok(Self {
                score_column: score_column.to_string(),
                records,
            });
        }
        Ok(Self::from_scores(score_column, doc_ids, scores))
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|value| !value.is_nan())
}
