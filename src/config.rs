use std::path::PathBuf;

use crate::constants::analysis::{
    LABEL_HIGH_QUANTILE, LABEL_LOW_QUANTILE, LABEL_Z_THRESHOLD, TFIDF_CHANNEL_Z_COLUMN,
    TFIDF_LABEL_COLUMN,
};
use crate::constants::ingest::{
    DATE_NEEDLES, SPEAKER_NEEDLES, TEXT_NEEDLES, TITLE_NEEDLES, URL_DATE_MARKER, URL_NEEDLES,
};
use crate::constants::merge::DELIMITERS as MERGE_DELIMITERS;
use crate::constants::reader::{DELIMITERS, SNIFF_MAX_LINES, SNIFF_SAMPLE_CHARS};
use crate::constants::scoring::{
    DEFAULT_TFIDF_MAX_DF, DEFAULT_TFIDF_MIN_DF, DOVISH_SEEDS, HAWKISH_SEEDS, TFIDF_SCORE_COLUMN,
    TONE_MAX_CHARS, TONE_MAX_TOKENS, Z_SUFFIX,
};
use crate::errors::PipelineError;
use crate::source::table_reader::TextEncoding;
use crate::types::{ScoreColumn, Term};

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Controls encoding and delimiter detection in the table reader.
#[derive(Clone, Debug)]
pub struct ReaderConfig {
    /// Encodings tried in order until one decodes the file.
    pub encodings: Vec<TextEncoding>,
    /// Candidate delimiters, in preference order for ties.
    pub delimiters: Vec<u8>,
    /// Leading characters inspected by the sniffer.
    pub sniff_sample_chars: usize,
    /// Max records inspected by the consistency sniffer.
    pub sniff_max_lines: usize,
    /// Minimum share of sampled records that must agree on a delimiter count.
    pub min_consistency: f64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            encodings: TextEncoding::default_order(),
            delimiters: DELIMITERS.to_vec(),
            sniff_sample_chars: SNIFF_SAMPLE_CHARS,
            sniff_max_lines: SNIFF_MAX_LINES,
            min_consistency: 0.9,
        }
    }
}

/// Date column scoring and url fallback settings.
#[derive(Clone, Debug)]
pub struct DateInferenceConfig {
    /// Header substrings that make a column a date candidate.
    pub needles: Vec<String>,
    /// A candidate must parse more than this share of rows to be used.
    pub min_parse_fraction: f64,
    /// Read ambiguous numeric dates (`03/04/2020`) as day first.
    pub day_first: bool,
    /// Marker preceding an 8-digit `YYYYMMDD` token in urls.
    pub url_marker: String,
}

impl Default for DateInferenceConfig {
    fn default() -> Self {
        Self {
            needles: owned(DATE_NEEDLES),
            min_parse_fraction: 0.0,
            day_first: true,
            url_marker: URL_DATE_MARKER.to_string(),
        }
    }
}

/// Candidate header substrings per logical field.
#[derive(Clone, Debug)]
pub struct ColumnNeedles {
    /// Header substrings for the title column.
    pub title: Vec<String>,
    /// Header substrings for the text column.
    pub text: Vec<String>,
    /// Header substrings for the speaker column.
    pub speaker: Vec<String>,
    /// Header substrings for the url column.
    pub url: Vec<String>,
}

impl Default for ColumnNeedles {
    fn default() -> Self {
        Self {
            title: owned(TITLE_NEEDLES),
            text: owned(TEXT_NEEDLES),
            speaker: owned(SPEAKER_NEEDLES),
            url: owned(URL_NEEDLES),
        }
    }
}

/// Top-level normalization configuration.
#[derive(Clone, Debug, Default)]
pub struct NormalizeConfig {
    /// Table reader settings.
    pub reader: ReaderConfig,
    /// Column-name guessing policy.
    pub needles: ColumnNeedles,
    /// Date column scoring policy.
    pub dates: DateInferenceConfig,
}

impl NormalizeConfig {
    /// Override the reader settings.
    pub fn with_reader(mut self, reader: ReaderConfig) -> Self {
        self.reader = reader;
        self
    }

    /// Override the column needles.
    pub fn with_needles(mut self, needles: ColumnNeedles) -> Self {
        self.needles = needles;
        self
    }

    /// Override date inference.
    pub fn with_dates(mut self, dates: DateInferenceConfig) -> Self {
        self.dates = dates;
        self
    }
}

/// Synonym reader settings for the merged-texts pipeline.
#[derive(Clone, Debug)]
pub struct MergeConfig {
    /// Encodings tried in the outer loop.
    pub encodings: Vec<TextEncoding>,
    /// Delimiters tried for each encoding.
    pub delimiters: Vec<u8>,
    /// Read ambiguous numeric dates as day first.
    pub day_first: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            encodings: vec![
                TextEncoding::Utf8Sig,
                TextEncoding::Utf8,
                TextEncoding::Cp1252,
                TextEncoding::Latin1,
            ],
            delimiters: MERGE_DELIMITERS.to_vec(),
            day_first: true,
        }
    }
}

/// TF-IDF vectorizer and seed lexicon settings.
#[derive(Clone, Debug)]
pub struct TfidfConfig {
    /// Smallest n-gram length.
    pub ngram_min: usize,
    /// Largest n-gram length.
    pub ngram_max: usize,
    /// Terms appearing in fewer documents are dropped.
    pub min_df: usize,
    /// Terms appearing in more than this share of documents are dropped.
    pub max_df: f64,
    /// Keep only the most frequent terms when set.
    pub max_features: Option<usize>,
    /// Seeds for the hawkish side.
    pub hawkish_seeds: Vec<Term>,
    /// Seeds for the dovish side.
    pub dovish_seeds: Vec<Term>,
    /// Raw score column name.
    pub score_column: ScoreColumn,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            ngram_min: 1,
            ngram_max: 2,
            min_df: DEFAULT_TFIDF_MIN_DF,
            max_df: DEFAULT_TFIDF_MAX_DF,
            max_features: None,
            hawkish_seeds: owned(HAWKISH_SEEDS),
            dovish_seeds: owned(DOVISH_SEEDS),
            score_column: TFIDF_SCORE_COLUMN.to_string(),
        }
    }
}

impl TfidfConfig {
    /// Override the minimum document frequency.
    pub fn with_min_df(mut self, min_df: usize) -> Self {
        self.min_df = min_df;
        self
    }

    /// Override the maximum document frequency share.
    pub fn with_max_df(mut self, max_df: f64) -> Self {
        self.max_df = max_df;
        self
    }

    /// Cap the vocabulary size.
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Reject settings the vectorizer cannot honor.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.ngram_min == 0 || self.ngram_min > self.ngram_max {
            return Err(PipelineError::Configuration(format!(
                "invalid n-gram range ({}, {})",
                self.ngram_min, self.ngram_max
            )));
        }
        if !(self.max_df > 0.0 && self.max_df <= 1.0) {
            return Err(PipelineError::Configuration(format!(
                "max_df must be in (0, 1], got {}",
                self.max_df
            )));
        }
        Ok(())
    }
}

/// Model-based tone scorer settings.
#[derive(Clone, Debug)]
pub struct ToneConfig {
    /// Directory holding `model.onnx` and `tokenizer.json`.
    pub model_dir: Option<PathBuf>,
    /// Characters per classifier chunk.
    pub max_chars: usize,
    /// Tokens per chunk after tokenization.
    pub max_tokens: usize,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            max_chars: TONE_MAX_CHARS,
            max_tokens: TONE_MAX_TOKENS,
        }
    }
}

/// How per-channel z-scores become dovish/neutral/hawkish labels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LabelPolicy {
    /// `z > t` is hawkish, `z < -t` is dovish.
    FixedThreshold { threshold: f64 },
    /// `z <= q(low)` is dovish, `z >= q(high)` is hawkish, per channel.
    Quantile { low: f64, high: f64 },
}

impl LabelPolicy {
    /// `+/-0.67` thresholds.
    pub fn fixed_threshold() -> Self {
        Self::FixedThreshold {
            threshold: LABEL_Z_THRESHOLD,
        }
    }

    /// 30th/70th percentile cut points.
    pub fn quantile() -> Self {
        Self::Quantile {
            low: LABEL_LOW_QUANTILE,
            high: LABEL_HIGH_QUANTILE,
        }
    }
}

/// Output names derived from the analysed score column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisColumns {
    /// Input score column.
    pub score: ScoreColumn,
    /// Corpus-wide z column.
    pub score_z: String,
    /// Per-channel z column.
    pub channel_z: String,
    /// Label column.
    pub label: String,
}

impl AnalysisColumns {
    /// Derive column names for `score`, keeping the historical lexical names.
    pub fn for_score(score: &str) -> Self {
        let (channel_z, label) = if score == TFIDF_SCORE_COLUMN {
            (
                TFIDF_CHANNEL_Z_COLUMN.to_string(),
                TFIDF_LABEL_COLUMN.to_string(),
            )
        } else {
            let stem = score.split('_').next().unwrap_or(score);
            (format!("{score}{Z_SUFFIX}_ch"), format!("{stem}_label"))
        };
        Self {
            score: score.to_string(),
            score_z: format!("{score}{Z_SUFFIX}"),
            channel_z,
            label,
        }
    }
}

/// Feature analysis configuration.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    /// Feature CSV to analyse.
    pub features_path: PathBuf,
    /// Optional corpus metadata joined on `doc_id` when present.
    pub meta_path: PathBuf,
    /// Directory receiving every export.
    pub out_dir: PathBuf,
    /// Score and derived column names.
    pub columns: AnalysisColumns,
    /// Labeling policy.
    pub policy: LabelPolicy,
    /// Rows kept in each ranked export.
    pub top_n: usize,
    /// File name for the most hawkish ranking.
    pub top_file: String,
    /// File name for the most dovish ranking.
    pub bottom_file: String,
    /// Carry `text_clean` into `features_ready.csv` and write reading packs.
    pub reading_packs: bool,
    /// Render PNG plots.
    pub plots: bool,
}

impl AnalysisConfig {
    /// Threshold labels, top/bottom 20, no reading packs or plots.
    pub fn use_features() -> Self {
        Self {
            features_path: PathBuf::from(crate::constants::analysis::DEFAULT_FEATURES_PATH),
            meta_path: PathBuf::from(crate::constants::analysis::DEFAULT_META_PATH),
            out_dir: PathBuf::from("."),
            columns: AnalysisColumns::for_score(TFIDF_SCORE_COLUMN),
            policy: LabelPolicy::fixed_threshold(),
            top_n: 20,
            top_file: "top20_hawkish.csv".to_string(),
            bottom_file: "bottom20_dovish.csv".to_string(),
            reading_packs: false,
            plots: false,
        }
    }

    /// Quantile labels, top/bottom 50, reading packs and plots.
    pub fn analyze_features() -> Self {
        Self {
            policy: LabelPolicy::quantile(),
            top_n: 50,
            top_file: "top50_hawkish.csv".to_string(),
            bottom_file: "top50_dovish.csv".to_string(),
            reading_packs: true,
            plots: true,
            ..Self::use_features()
        }
    }

    /// Analyse a different score column.
    pub fn with_score_column(mut self, score: &str) -> Self {
        self.columns = AnalysisColumns::for_score(score);
        self
    }

    /// Override the ranking size and derived file names.
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        let bottom_prefix = if self.bottom_file.starts_with("bottom") {
            "bottom"
        } else {
            "top"
        };
        self.top_n = top_n;
        self.top_file = format!("top{top_n}_hawkish.csv");
        self.bottom_file = format!("{bottom_prefix}{top_n}_dovish.csv");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_columns_keep_lexical_names() {
        let cols = AnalysisColumns::for_score("tfidf_hawk_minus_dove");
        assert_eq!(cols.score_z, "tfidf_hawk_minus_dove_z");
        assert_eq!(cols.channel_z, "tfidf_hmd_z_ch");
        assert_eq!(cols.label, "lex_label");

        let tone = AnalysisColumns::for_score("tone_finbert");
        assert_eq!(tone.score_z, "tone_finbert_z");
        assert_eq!(tone.channel_z, "tone_finbert_z_ch");
        assert_eq!(tone.label, "tone_label");
    }

    #[test]
    fn presets_differ_in_policy_and_exports() {
        let use_cfg = AnalysisConfig::use_features();
        let analyze_cfg = AnalysisConfig::analyze_features();
        assert_eq!(use_cfg.policy, LabelPolicy::fixed_threshold());
        assert_eq!(analyze_cfg.policy, LabelPolicy::quantile());
        assert_eq!(use_cfg.bottom_file, "bottom20_dovish.csv");
        assert_eq!(analyze_cfg.bottom_file, "top50_dovish.csv");
        assert!(analyze_cfg.plots && !use_cfg.plots);
    }

    #[test]
    fn with_top_n_renames_rankings() {
        let cfg = AnalysisConfig::use_features().with_top_n(5);
        assert_eq!(cfg.top_file, "top5_hawkish.csv");
        assert_eq!(cfg.bottom_file, "bottom5_dovish.csv");
        let cfg = AnalysisConfig::analyze_features().with_top_n(10);
        assert_eq!(cfg.bottom_file, "top10_dovish.csv");
    }
}
