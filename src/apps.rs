use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum, error::ErrorKind};
use tracing_subscriber::EnvFilter;

use crate::analysis::run_analysis;
use crate::config::{AnalysisConfig, LabelPolicy, MergeConfig, NormalizeConfig, TfidfConfig, ToneConfig};
use crate::constants::ingest::{
    DEFAULT_CORPUS_PATH, DEFAULT_QA_PATH, FALLBACK_CHANNEL_A, FALLBACK_CHANNEL_B,
};
use crate::constants::scoring::{
    DEFAULT_TFIDF_MAX_DF, DEFAULT_TFIDF_MIN_DF, DEFAULT_TFIDF_OUTPUT, DEFAULT_TONE_OUTPUT,
    TONE_MAX_CHARS, TONE_SCORE_COLUMN,
};
use crate::ingestion::run_ingestion;
use crate::merge::{run_corpus_to_merged, run_merge};
use crate::scoring::{tfidf, tone};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// `z > 0.67` hawkish, `z < -0.67` dovish.
    Threshold,
    /// Per-channel 30th/70th percentile cut points.
    Quantile,
}

impl From<PolicyArg> for LabelPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Threshold => LabelPolicy::fixed_threshold(),
            PolicyArg::Quantile => LabelPolicy::quantile(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "ingest_normalize",
    disable_help_subcommand = true,
    about = "Normalize two ECB CSV exports into one corpus",
    long_about = "Read two heterogeneous CSV exports, infer their columns, clean and deduplicate the text, and write the normalized corpus plus a QA summary."
)]
struct IngestCli {
    #[arg(help = "First CSV (fallback channel: speech)")]
    csv_a: PathBuf,
    #[arg(help = "Second CSV (fallback channel: press_conference)")]
    csv_b: PathBuf,
    #[arg(short = 'o', long = "output", default_value = DEFAULT_CORPUS_PATH)]
    output: PathBuf,
    #[arg(long, default_value = DEFAULT_QA_PATH, help = "QA summary JSON path")]
    qa: PathBuf,
}

#[derive(Debug, Parser)]
#[command(
    name = "merge_texts",
    disable_help_subcommand = true,
    about = "Merge ECB speeches and press conferences into one CSV"
)]
struct MergeCli {
    #[arg(long, value_name = "PATH")]
    speeches: PathBuf,
    #[arg(long, value_name = "PATH")]
    pressers: PathBuf,
    #[arg(long, value_name = "PATH")]
    out: PathBuf,
    #[arg(long, help = "Log every encoding/delimiter attempt")]
    debug: bool,
}

#[derive(Debug, Parser)]
#[command(
    name = "corpus_to_merged",
    disable_help_subcommand = true,
    about = "Convert a normalized corpus to the merged-texts format"
)]
struct CorpusToMergedCli {
    #[arg(long = "in", value_name = "PATH", help = "Normalized corpus CSV")]
    input: PathBuf,
    #[arg(long, value_name = "PATH", help = "Output merged CSV")]
    out: PathBuf,
}

#[derive(Debug, Parser)]
#[command(
    name = "tfidf_baseline",
    disable_help_subcommand = true,
    about = "Lexical hawkish-minus-dovish score from TF-IDF seed weights"
)]
struct TfidfCli {
    corpus_csv: PathBuf,
    #[arg(short = 'o', long = "output", default_value = DEFAULT_TFIDF_OUTPUT)]
    output: PathBuf,
    #[arg(long = "min-df", default_value_t = DEFAULT_TFIDF_MIN_DF, help = "Minimum document count per term")]
    min_df: usize,
    #[arg(long = "max-df", default_value_t = DEFAULT_TFIDF_MAX_DF, help = "Maximum document fraction per term")]
    max_df: f64,
    #[arg(long = "max-features", help = "Keep only the most frequent terms")]
    max_features: Option<usize>,
}

#[derive(Debug, Parser)]
#[command(
    name = "finbert_tone",
    disable_help_subcommand = true,
    about = "Model-based tone score per document",
    after_help = "Without a usable model every document scores 0.0 and a warning is logged."
)]
struct ToneCli {
    corpus_csv: PathBuf,
    #[arg(short = 'o', long = "output", default_value = DEFAULT_TONE_OUTPUT)]
    output: PathBuf,
    #[arg(long = "model-dir", value_name = "DIR", help = "Directory holding model.onnx and tokenizer.json")]
    model_dir: Option<PathBuf>,
    #[arg(long = "max-chars", default_value_t = TONE_MAX_CHARS)]
    max_chars: usize,
}

#[derive(Debug, Parser)]
#[command(
    disable_help_subcommand = true,
    about = "Join features with corpus metadata, label, rank, and export",
    after_help = "Metadata is optional; without it every document is in channel 'unknown'."
)]
struct AnalysisCli {
    #[arg(long, value_name = "PATH")]
    features: Option<PathBuf>,
    #[arg(long, value_name = "PATH")]
    meta: Option<PathBuf>,
    #[arg(long = "score-column")]
    score_column: Option<String>,
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,
    #[arg(long = "top", value_parser = parse_positive_usize)]
    top: Option<usize>,
    #[arg(long = "out-dir", value_name = "DIR")]
    out_dir: Option<PathBuf>,
}

/// Install the `tracing` subscriber once; `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Run `ingest_normalize` with CLI-style arguments (without the program name).
pub fn run_ingest_normalize<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) = parse_cli::<IngestCli, _>(
        std::iter::once("ingest_normalize".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };
    init_tracing("info");

    let qa = run_ingestion(
        (cli.csv_a.as_path(), FALLBACK_CHANNEL_A),
        (cli.csv_b.as_path(), FALLBACK_CHANNEL_B),
        &cli.output,
        &cli.qa,
        &NormalizeConfig::default(),
    )?;
    println!("written: {}", cli.output.display());
    println!("QA     : {}", cli.qa.display());
    println!(
        "rows: {} range: {} .. {}",
        qa.rows_total,
        qa.time_range.min.as_deref().unwrap_or("-"),
        qa.time_range.max.as_deref().unwrap_or("-")
    );
    println!("by_channel: {:?}", qa.by_channel);
    println!("picked A: {}", serde_json::to_string(&qa.columns_picked.a)?);
    println!("picked B: {}", serde_json::to_string(&qa.columns_picked.b)?);
    Ok(())
}

/// Run `merge_texts` with CLI-style arguments.
pub fn run_merge_texts<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) =
        parse_cli::<MergeCli, _>(std::iter::once("merge_texts".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };
    init_tracing(if cli.debug { "debug" } else { "info" });

    let rows = run_merge(&cli.speeches, &cli.pressers, &cli.out, &MergeConfig::default())?;
    println!("merged {rows} rows -> {}", cli.out.display());
    Ok(())
}

/// Run `corpus_to_merged` with CLI-style arguments.
pub fn run_corpus_to_merged_app<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) = parse_cli::<CorpusToMergedCli, _>(
        std::iter::once("corpus_to_merged".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };
    init_tracing("info");

    let rows = run_corpus_to_merged(&cli.input, &cli.out)?;
    println!("wrote {rows} rows -> {}", cli.out.display());
    Ok(())
}

/// Run `tfidf_baseline` with CLI-style arguments.
pub fn run_tfidf_baseline<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) =
        parse_cli::<TfidfCli, _>(std::iter::once("tfidf_baseline".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };
    init_tracing("info");

    let config = TfidfConfig::default()
        .with_min_df(cli.min_df)
        .with_max_df(cli.max_df)
        .with_max_features(cli.max_features);
    let table = tfidf::score_corpus(&cli.corpus_csv, &cli.output, &config)?;
    println!("written: {} ({} rows)", cli.output.display(), table.len());
    Ok(())
}

/// Run `finbert_tone` with CLI-style arguments.
pub fn run_finbert_tone<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) =
        parse_cli::<ToneCli, _>(std::iter::once("finbert_tone".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };
    init_tracing("info");

    let config = ToneConfig {
        model_dir: cli.model_dir,
        max_chars: cli.max_chars,
        ..ToneConfig::default()
    };
    let table = tone::score_corpus(&cli.corpus_csv, &cli.output, TONE_SCORE_COLUMN, &config)?;
    println!("written: {} ({} rows)", cli.output.display(), table.len());
    Ok(())
}

/// `use_features`: threshold labels and top/bottom 20 by default.
pub fn run_use_features<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    run_analysis_app("use_features", AnalysisConfig::use_features(), args_iter)
}

/// `analyze_features`: quantile labels, top/bottom 50, reading packs, and plots by default.
pub fn run_analyze_features<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    run_analysis_app("analyze_features", AnalysisConfig::analyze_features(), args_iter)
}

fn run_analysis_app<I>(name: &str, preset: AnalysisConfig, args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) = parse_cli::<AnalysisCli, _>(std::iter::once(name.to_string()).chain(args_iter))?
    else {
        return Ok(());
    };
    init_tracing("info");

    let mut config = preset;
    if let Some(score_column) = cli.score_column.as_deref() {
        config = config.with_score_column(score_column);
    }
    if let Some(top) = cli.top {
        config = config.with_top_n(top);
    }
    if let Some(policy) = cli.policy {
        config.policy = policy.into();
    }
    if let Some(features) = cli.features {
        config.features_path = features;
    }
    if let Some(meta) = cli.meta {
        config.meta_path = meta;
    }
    if let Some(out_dir) = cli.out_dir {
        config.out_dir = out_dir;
    }

    let summary = run_analysis(&config)?;
    for path in &summary.written {
        println!("written: {}", path.display());
    }
    println!("\npreview:");
    for line in &summary.preview {
        println!("{line}");
    }
    Ok(())
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{raw}' as a positive integer"))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn help_is_not_an_error() {
        assert!(run_tfidf_baseline(args(&["--help"])).is_ok());
        assert!(run_use_features(args(&["--help"])).is_ok());
    }

    #[test]
    fn ingest_cli_uses_default_paths() {
        let cli = parse_cli::<IngestCli, _>(["ingest_normalize", "a.csv", "b.csv"])
            .unwrap()
            .unwrap();
        assert_eq!(cli.output, PathBuf::from(DEFAULT_CORPUS_PATH));
        assert_eq!(cli.qa, PathBuf::from(DEFAULT_QA_PATH));
    }

    #[test]
    fn analysis_flags_override_presets() {
        let cli = parse_cli::<AnalysisCli, _>([
            "analyze_features",
            "--policy",
            "threshold",
            "--top",
            "5",
            "--score-column",
            "tone_finbert",
        ])
        .unwrap()
        .unwrap();
        assert!(matches!(cli.policy, Some(PolicyArg::Threshold)));
        assert_eq!(cli.top, Some(5));
        assert!(parse_cli::<AnalysisCli, _>(["use_features", "--top", "0"]).is_err());
    }

    #[test]
    fn corpus_to_merged_requires_both_paths() {
        assert!(parse_cli::<CorpusToMergedCli, _>(["corpus_to_merged", "--in", "x.csv"]).is_err());
    }
}
