use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::ColumnName;

/// Error type for table reading, normalization, scoring, and export failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An input path does not exist.
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),
    /// No configured encoding decodes the file.
    #[error("cannot decode {} with encodings {tried:?}", path.display())]
    Undecodable { path: PathBuf, tried: Vec<String> },
    /// The file decodes but yields no usable table.
    #[error("cannot read a table from {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },
    /// A required column is absent.
    #[error("missing required column '{column}' in source '{source_label}'")]
    MissingColumn {
        /// Expected column name.
        column: ColumnName,
        /// Input the column was expected in.
        source_label: String,
    },
    /// Document-frequency pruning removed every term.
    #[error("after pruning, no terms remain (min_df={min_df}, max_df={max_df})")]
    EmptyVocabulary { min_df: usize, max_df: f64 },
    /// The tone model failed to load or run.
    #[error("tone model failure: {0}")]
    Model(String),
    /// A plot could not be rendered.
    #[error("plot rendering failed: {0}")]
    Plot(String),
    /// A configuration value is out of range.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// CSV read or write failure.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// JSON serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}
