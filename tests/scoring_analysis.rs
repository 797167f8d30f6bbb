use std::fs;
use std::path::{Path, PathBuf};

use ecb_tone::PipelineError;
use ecb_tone::analysis::run_analysis;
use ecb_tone::config::{AnalysisConfig, LabelPolicy, TfidfConfig, ToneConfig};
use ecb_tone::constants::scoring::{TFIDF_SCORE_COLUMN, TONE_SCORE_COLUMN};
use ecb_tone::scoring::{FeatureTable, tfidf, tone};
use ecb_tone::transport::fs::CsvFrame;
use tempfile::tempdir;

const CHANNELS: [&str; 2] = ["speech", "press_conference"];

/// Corpus and feature files: ten documents per channel scored 1..=10 (press scaled by 3).
fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let mut corpus = String::from("doc_id,date_time,channel,title,speaker,url,text_clean,source_file\n");
    let mut features = format!("doc_id,{TFIDF_SCORE_COLUMN}\n");
    for (c, channel) in CHANNELS.iter().enumerate() {
        for i in 1..=10 {
            let doc_id = format!("{channel}-{i}");
            let month = if i <= 5 { 1 } else { 3 };
            corpus.push_str(&format!(
                "{doc_id},2020-{month:02}-{i:02},{channel},Title {i},Speaker,https://x.org/{i},Text number {i},src.csv\n"
            ));
            let score = i as f64 * if c == 0 { 1.0 } else { 3.0 };
            features.push_str(&format!("{doc_id},{score}\n"));
        }
    }
    let corpus_path = dir.join("ecb_text_corpus.csv");
    let features_path = dir.join("features_tfidf.csv");
    fs::write(&corpus_path, corpus).unwrap();
    fs::write(&features_path, features).unwrap();
    (corpus_path, features_path)
}

fn column(frame: &CsvFrame, name: &str) -> Vec<String> {
    let idx = frame.column_index(name).unwrap();
    (0..frame.len()).map(|row| frame.get(row, Some(idx)).to_string()).collect()
}

fn label_counts(frame: &CsvFrame, channel: &str) -> (usize, usize, usize) {
    let channels = column(frame, "channel");
    let labels = column(frame, "lex_label");
    let mut counts = (0, 0, 0);
    for (ch, label) in channels.iter().zip(&labels) {
        if ch != channel {
            continue;
        }
        match label.as_str() {
            "dovish" => counts.0 += 1,
            "neutral" => counts.1 += 1,
            "hawkish" => counts.2 += 1,
            other => panic!("unexpected label {other}"),
        }
    }
    counts
}

fn config(dir: &Path, corpus: &Path, features: &Path, preset: AnalysisConfig) -> AnalysisConfig {
    AnalysisConfig {
        features_path: features.to_path_buf(),
        meta_path: corpus.to_path_buf(),
        out_dir: dir.join("out"),
        plots: false,
        ..preset
    }
}

#[test]
fn per_channel_z_is_standardized_and_threshold_labeled() {
    let temp = tempdir().unwrap();
    let (corpus, features) = write_inputs(temp.path());
    let summary = run_analysis(&config(temp.path(), &corpus, &features, AnalysisConfig::use_features())).unwrap();
    assert_eq!(summary.rows, 20);
    assert!(summary.has_metadata);

    let ready = CsvFrame::read(&temp.path().join("out/features_ready.csv")).unwrap();
    let channels = column(&ready, "channel");
    let z: Vec<f64> = column(&ready, "tfidf_hmd_z_ch")
        .iter()
        .map(|value| value.parse().unwrap())
        .collect();
    for channel in CHANNELS {
        let values: Vec<f64> = channels
            .iter()
            .zip(&z)
            .filter(|(ch, _)| ch.as_str() == channel)
            .map(|(_, z)| *z)
            .collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        assert!(mean.abs() < 1e-9, "{channel} mean {mean}");
        assert!((var.sqrt() - 1.0).abs() < 1e-9, "{channel} std {}", var.sqrt());
        // z of 8 is 0.87 and z of 7 is 0.52 with a 0.67 threshold.
        assert_eq!(label_counts(&ready, channel), (3, 4, 3));
    }

    let top = CsvFrame::read(&temp.path().join("out/top20_hawkish.csv")).unwrap();
    assert_eq!(top.len(), 20);
    assert!(column(&top, "doc_id")[0].ends_with("-10"));
    let bottom = CsvFrame::read(&temp.path().join("out/bottom20_dovish.csv")).unwrap();
    assert!(column(&bottom, "doc_id")[0].ends_with("-1"));

    let series = fs::read_to_string(temp.path().join("out/series_hawk_dove_monthly.csv")).unwrap();
    let lines: Vec<&str> = series.lines().collect();
    assert_eq!(lines[0], "date_time,mean_z");
    assert!(lines[1].starts_with("2020-01-31,"));
    assert_eq!(lines[2], "2020-02-29,");
    assert!(lines[3].starts_with("2020-03-31,"));

    let stats = CsvFrame::read(&temp.path().join("out/by_channel_stats.csv")).unwrap();
    assert_eq!(column(&stats, "channel"), vec!["press_conference", "speech"]);
    assert_eq!(column(&stats, "count"), vec!["10", "10"]);
    assert!(!temp.path().join("out/reading_pack_hawkish.csv").exists());
}

#[test]
fn quantile_policy_puts_thirty_percent_in_each_tail() {
    let temp = tempdir().unwrap();
    let (corpus, features) = write_inputs(temp.path());
    let mut cfg = config(temp.path(), &corpus, &features, AnalysisConfig::analyze_features());
    assert_eq!(cfg.policy, LabelPolicy::quantile());
    cfg.top_n = 5;
    let summary = run_analysis(&cfg).unwrap();
    assert_eq!(summary.preview.len(), 6);

    let ready = CsvFrame::read(&temp.path().join("out/features_ready.csv")).unwrap();
    assert!(ready.column_index("text_clean").is_some());
    for channel in CHANNELS {
        assert_eq!(label_counts(&ready, channel), (3, 4, 3));
    }
    let hawkish = CsvFrame::read(&temp.path().join("out/reading_pack_hawkish.csv")).unwrap();
    assert_eq!(hawkish.len(), 20);
    assert_eq!(
        hawkish.headers(),
        &["date_time", "channel", "speaker", "title", "url", "tfidf_hmd_z_ch", "excerpt"]
    );
    assert_eq!(column(&hawkish, "excerpt")[0], "Text number 10");
    let top = CsvFrame::read(&temp.path().join("out/top50_hawkish.csv")).unwrap();
    assert_eq!(top.len(), 5);
}

#[test]
fn features_without_metadata_use_unknown_channel() {
    let temp = tempdir().unwrap();
    let (_, features) = write_inputs(temp.path());
    let missing = temp.path().join("no_such_corpus.csv");
    let summary = run_analysis(&config(temp.path(), &missing, &features, AnalysisConfig::use_features())).unwrap();
    assert!(!summary.has_metadata);

    let ready = CsvFrame::read(&temp.path().join("out/features_ready.csv")).unwrap();
    assert!(column(&ready, "channel").iter().all(|ch| ch == "unknown"));
    assert!(ready.column_index("date_time").is_none());
    assert!(!temp.path().join("out/series_hawk_dove_monthly.csv").exists());
}

fn write_corpus(dir: &Path, texts: &[&str]) -> PathBuf {
    let mut body = String::from("doc_id,text_clean\n");
    for (idx, text) in texts.iter().enumerate() {
        body.push_str(&format!("d{idx},{text}\n"));
    }
    let path = dir.join("corpus.csv");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn tfidf_scores_follow_seed_terms() {
    let temp = tempdir().unwrap();
    let corpus = write_corpus(
        temp.path(),
        &[
            "further tightening and a hike are needed",
            "rates cut and easing continue",
            "the weather is fine today",
            "inflation remains above target so tightening continues",
        ],
    );
    let out = temp.path().join("features_tfidf.csv");
    let cfg = TfidfConfig::default().with_min_df(1).with_max_df(1.0);
    let table = tfidf::score_corpus(&corpus, &out, &cfg).unwrap();
    assert_eq!(table.len(), 4);
    let scores: Vec<f64> = table.records.iter().map(|r| r.score).collect();
    assert!(scores[0] > 0.0);
    assert!(scores[1] < 0.0);
    assert_eq!(scores[2], 0.0);
    assert!(scores[3] > 0.0);

    let read_back = FeatureTable::read(&out, TFIDF_SCORE_COLUMN).unwrap();
    assert_eq!(read_back.records.len(), 4);
    assert_eq!(read_back.records[0].doc_id, "d0");
}

#[test]
fn tfidf_empty_vocabulary_is_reported() {
    let temp = tempdir().unwrap();
    let corpus = write_corpus(temp.path(), &["alpha beta", "gamma delta"]);
    let err = tfidf::score_corpus(
        &corpus,
        &temp.path().join("f.csv"),
        &TfidfConfig::default().with_min_df(3),
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::EmptyVocabulary { min_df: 3, .. }));
}

#[test]
fn tone_without_model_scores_zero() {
    let temp = tempdir().unwrap();
    let corpus = write_corpus(temp.path(), &["rates rise", "rates fall", ""]);
    let out = temp.path().join("features_finbert.csv");
    let table = tone::score_corpus(&corpus, &out, TONE_SCORE_COLUMN, &ToneConfig::default()).unwrap();
    assert!(table.records.iter().all(|r| r.score == 0.0 && r.score_z == 0.0));
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "doc_id,tone_finbert,tone_finbert_z\nd0,0,0\nd1,0,0\nd2,0,0\n"
    );
}

#[test]
fn plots_are_rendered_for_each_summary() {
    let temp = tempdir().unwrap();
    let (corpus, features) = write_inputs(temp.path());
    let cfg = AnalysisConfig {
        plots: true,
        ..config(temp.path(), &corpus, &features, AnalysisConfig::analyze_features())
    };
    let summary = run_analysis(&cfg).unwrap();
    for name in ["plot_z_hist.png", "plot_z_by_channel.png", "plot_monthly_mean.png"] {
        let path = temp.path().join("out").join(name);
        assert!(fs::metadata(&path).unwrap().len() > 0, "{name}");
        assert!(summary.written.contains(&path), "{name}");
    }
}

#[test]
fn empty_join_skips_plots_and_still_succeeds() {
    let temp = tempdir().unwrap();
    let corpus = temp.path().join("ecb_text_corpus.csv");
    fs::write(
        &corpus,
        "doc_id,date_time,channel,title,speaker,url,text_clean,source_file\nx,2020-01-01,speech,T,S,u,Text,src.csv\n",
    )
    .unwrap();
    let features = temp.path().join("features_tfidf.csv");
    fs::write(&features, format!("doc_id,{TFIDF_SCORE_COLUMN}\nnomatch,1.0\n")).unwrap();

    let cfg = config(temp.path(), &corpus, &features, AnalysisConfig::analyze_features());
    let summary = run_analysis(&AnalysisConfig { plots: true, ..cfg }).unwrap();
    assert_eq!(summary.rows, 0);
    assert!(temp.path().join("out/features_ready.csv").exists());
    assert!(!temp.path().join("out/plot_z_hist.png").exists());
    assert!(summary.written.iter().all(|path| path.extension().is_none_or(|ext| ext != "png")));
}
