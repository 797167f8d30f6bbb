use std::fs;
use std::path::{Path, PathBuf};

use ecb_tone::PipelineError;
use ecb_tone::config::{MergeConfig, NormalizeConfig};
use ecb_tone::constants::ingest::{FALLBACK_CHANNEL_A, FALLBACK_CHANNEL_B};
use ecb_tone::ingestion::run_ingestion;
use ecb_tone::merge::{merge_sources, merge_texts, run_corpus_to_merged, run_merge, save_merged};
use tempfile::tempdir;

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn synonym_headers_merge_into_canonical_sorted_rows() {
    let temp = tempdir().unwrap();
    let speeches = write(
        temp.path(),
        "speeches.csv",
        "pub_date,title,url,content\n2020-02-01,Later speech,https://x.org/b,Second [Applause] text\n",
    );
    let pressers = write(
        temp.path(),
        "pressers.csv",
        "date,title,link,text\n2020-01-01,Earlier presser,https://x.org/a,First text\n",
    );
    let out = temp.path().join("merged/merged_texts.csv");

    let rows = run_merge(&speeches, &pressers, &out, &MergeConfig::default()).unwrap();
    assert_eq!(rows, 2);
    let body = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[0], "date,title,link,text,source_type");
    assert_eq!(lines[1], "2020-01-01,Earlier presser,https://x.org/a,First text,press_conf");
    assert_eq!(lines[2], "2020-02-01,Later speech,https://x.org/b,Second text,speech");
}

#[test]
fn missing_canonical_columns_are_filled_empty() {
    let temp = tempdir().unwrap();
    let speeches = write(
        temp.path(),
        "speeches.csv",
        "Date;Headline;Body\n03/02/2021;Semicolons;Read with the second delimiter\n",
    );
    let pressers = write(temp.path(), "pressers.csv", "date,title,link,text\n");
    let merged = merge_texts(&speeches, &pressers, &MergeConfig::default()).unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].title, "Semicolons");
    assert_eq!(merged[0].link, "");
    // Day-first: 3 February.
    assert_eq!(merged[0].date.to_string(), "2021-02-03 00:00:00");
}

#[test]
fn strict_merge_requires_exact_columns_and_dedups() {
    let temp = tempdir().unwrap();
    let speeches = write(
        temp.path(),
        "speeches.csv",
        "date,title,link,text\n2020-03-01,S,l1,one\n2020-03-01,S,l2,dup\n2020-01-01,T,l3,\n",
    );
    let pressers = write(
        temp.path(),
        "pressers.csv",
        "date,title,link,text\n2020-02-01,P,l4,press\n",
    );
    let merged = merge_sources(&speeches, &pressers).unwrap();
    let summary: Vec<(String, String, String)> = merged
        .iter()
        .map(|row| (row.title.clone(), row.source.clone(), row.doc_id.clone()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("P".to_string(), "presser".to_string(), "1".to_string()),
            ("S".to_string(), "speech".to_string(), "0".to_string()),
        ]
    );

    let out = temp.path().join("strict.csv");
    save_merged(&out, &merged).unwrap();
    assert!(fs::read_to_string(&out)
        .unwrap()
        .starts_with("date,title,link,text,source,doc_id\n2020-02-01,P,l4,press,presser,1\n"));

    let bad = write(temp.path(), "bad.csv", "pub_date,title,link,text\n2020-01-01,a,b,c\n");
    assert!(matches!(
        merge_sources(&bad, &pressers),
        Err(PipelineError::MissingColumn { column, .. }) if column == "date"
    ));
}

#[test]
fn corpus_converts_to_merged_format() {
    let temp = tempdir().unwrap();
    let speeches = write(
        temp.path(),
        "speeches.csv",
        "date,title,url,text\n2021-05-06 14:30:00,Speech A,https://x.org/a,Alpha text.\n",
    );
    let pressers = write(
        temp.path(),
        "press_conferences.csv",
        "date,title,url,text\n2021-05-05,Conference B,https://x.org/b,Beta text.\n",
    );
    let corpus = temp.path().join("corpus.csv");
    run_ingestion(
        (speeches.as_path(), FALLBACK_CHANNEL_A),
        (pressers.as_path(), FALLBACK_CHANNEL_B),
        &corpus,
        &temp.path().join("qa.json"),
        &NormalizeConfig::default(),
    )
    .unwrap();

    let out = temp.path().join("merged.csv");
    assert_eq!(run_corpus_to_merged(&corpus, &out).unwrap(), 2);
    let body = fs::read_to_string(&out).unwrap();
    assert_eq!(
        body,
        "date,title,link,text,source_type\n\
         2021-05-05,Conference B,https://x.org/b,Beta text.,press_conf\n\
         2021-05-06,Speech A,https://x.org/a,Alpha text.,speech\n"
    );
}
