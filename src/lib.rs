#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Feature analysis: per-channel labels, rankings, series, and plots.
pub mod analysis;
/// Command-line runners shared by the binaries.
pub mod apps;
/// Pipeline configuration types.
pub mod config;
/// Centralized constants used across readers, scorers, and exports.
pub mod constants;
/// Document, feature, and label types.
pub mod data;
mod errors;
mod hash;
/// Column-guessing heuristics.
pub mod heuristics;
/// Corpus normalization, deduplication, and QA.
pub mod ingestion;
/// Merged-texts pipelines.
pub mod merge;
/// Aggregate statistics helpers.
pub mod metrics;
/// Lexical and model-based document scorers.
pub mod scoring;
/// Raw tables, encoding/delimiter detection, and column inference.
pub mod source;
/// Filesystem input and output helpers.
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Text normalization helpers.
pub mod utils;

pub use analysis::{AnalysisRow, AnalysisSummary, AnalysisTable, run_analysis};
pub use config::{
    AnalysisColumns, AnalysisConfig, LabelPolicy, MergeConfig, NormalizeConfig, ReaderConfig,
    TfidfConfig, ToneConfig,
};
pub use data::{Channel, FeatureRecord, MergedRow, NormalizedDocument, ToneLabel};
pub use errors::PipelineError;
pub use hash::stable_doc_id;
pub use ingestion::{QaSummary, read_corpus, run_ingestion};
pub use merge::{merge_sources, run_corpus_to_merged, run_merge};
pub use scoring::FeatureTable;
pub use source::RawTable;
pub use types::{CellValue, ColumnName, DocId, ScoreColumn, SourceFileName, Term};
