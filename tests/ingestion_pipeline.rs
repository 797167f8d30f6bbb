use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use ecb_tone::config::NormalizeConfig;
use ecb_tone::constants::ingest::{FALLBACK_CHANNEL_A, FALLBACK_CHANNEL_B};
use ecb_tone::ingestion::{ingest_sources, normalize_file, read_corpus, run_ingestion};
use tempfile::tempdir;

fn write(dir: &Path, name: &str, body: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

const SPEECHES: &str = "\
date,title,speakers,url,content
2021-03-04,Monetary policy today,Christine Lagarde,https://www.ecb.europa.eu/press/key/date/2021/html/ecb.sp210304.en.html,\"<p>Inflation  remains above target.</p> See https://ecb.europa.eu/x\"
2020-11-15,Outlook,Philip R. Lane,,Policy remains accommodative.
2020-11-15,Outlook,Philip R. Lane,,Policy remains accommodative.
2020-06-01,Blank text,Someone,,
not a date,Undated,Someone,,Text without any date.
";

const PRESSERS: &str = "\
Pub Date;Headline;Body
05/11/2020;Press conference;We decided to keep rates unchanged.
2019-12-12;Press conference;Inflation is subdued, easing continues.
";

#[test]
fn reruns_produce_identical_bytes() {
    let temp = tempdir().unwrap();
    let speeches = write(temp.path(), "speeches.csv", SPEECHES.as_bytes());
    let pressers = write(temp.path(), "press_conferences.csv", PRESSERS.as_bytes());
    let config = NormalizeConfig::default();

    let mut outputs = Vec::new();
    for run in 0..2 {
        let corpus = temp.path().join(format!("run{run}/corpus.csv"));
        let qa = temp.path().join(format!("run{run}/qa.json"));
        run_ingestion(
            (speeches.as_path(), FALLBACK_CHANNEL_A),
            (pressers.as_path(), FALLBACK_CHANNEL_B),
            &corpus,
            &qa,
            &config,
        )
        .unwrap();
        outputs.push((fs::read(&corpus).unwrap(), fs::read(&qa).unwrap()));
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn retained_rows_satisfy_corpus_invariants() {
    let temp = tempdir().unwrap();
    let speeches = write(temp.path(), "speeches.csv", SPEECHES.as_bytes());
    let pressers = write(temp.path(), "press_conferences.csv", PRESSERS.as_bytes());
    let outcome = ingest_sources(
        (speeches.as_path(), FALLBACK_CHANNEL_A),
        (pressers.as_path(), FALLBACK_CHANNEL_B),
        &NormalizeConfig::default(),
    )
    .unwrap();

    // Two speeches survive (duplicate, blank, and undated rows are dropped) plus two pressers.
    assert_eq!(outcome.documents.len(), 4);
    let ids: HashSet<_> = outcome.documents.iter().map(|doc| doc.doc_id.clone()).collect();
    assert_eq!(ids.len(), 4);
    for doc in &outcome.documents {
        assert!(!doc.text_clean.is_empty());
        assert!(!doc.text_clean.contains('<'));
        assert!(!doc.text_clean.contains("http"));
        assert!(!doc.text_clean.contains("  "));
        assert_eq!(doc.n_chars, doc.text_clean.chars().count());
    }
    let dates: Vec<_> = outcome.documents.iter().map(|doc| doc.date_time).collect();
    let mut sorted = dates.clone();
    sorted.sort();
    assert_eq!(dates, sorted);

    let first_speech = outcome
        .documents
        .iter()
        .find(|doc| doc.title == "Monetary policy today")
        .unwrap();
    assert_eq!(first_speech.text_clean, "Inflation remains above target. See");
    assert_eq!(first_speech.channel.as_str(), "speech");
    assert_eq!(outcome.picks_a.text_col, "content");
    assert_eq!(outcome.picks_b.title_col, "Headline");
    assert_eq!(outcome.picks_b.channel, "press_conference");
}

#[test]
fn cp1252_files_are_decoded() {
    let temp = tempdir().unwrap();
    let mut body = b"date,title,text\n2022-01-10,Caf\xe9 remarks,\x93Price stability\x94 first.\n".to_vec();
    body.extend_from_slice(b"2022-01-11,Second,Plain text.\n");
    let path = write(temp.path(), "speech_cp1252.csv", &body);
    let normalized = normalize_file(&path, FALLBACK_CHANNEL_A, &NormalizeConfig::default()).unwrap();
    assert_eq!(normalized.documents.len(), 2);
    assert_eq!(normalized.documents[0].title, "Café remarks");
    assert_eq!(normalized.documents[0].text_clean, "\u{201C}Price stability\u{201D} first.");
}

#[test]
fn semicolon_and_tab_tables_are_sniffed() {
    let temp = tempdir().unwrap();
    let semi = write(
        temp.path(),
        "speech_semi.csv",
        b"date;title;text\n2020-01-02;A;First, with a comma.\n2020-01-03;B;Second.\n",
    );
    let tab = write(
        temp.path(),
        "speech_tab.csv",
        b"date\ttitle\ttext\n2020-01-02\tA\tFirst.\n2020-01-03\tB\tSecond, too.\n",
    );
    for path in [semi, tab] {
        let normalized = normalize_file(&path, FALLBACK_CHANNEL_A, &NormalizeConfig::default()).unwrap();
        assert_eq!(normalized.documents.len(), 2, "{}", path.display());
        assert_eq!(normalized.picks.date_col, "date");
        assert_eq!(normalized.documents[1].title, "B");
    }
}

#[test]
fn url_dates_fill_in_when_no_date_column_exists() {
    let temp = tempdir().unwrap();
    let path = write(
        temp.path(),
        "speeches.csv",
        b"title,link,text\nA,https://www.ecb.europa.eu/press/key/html/ecb.is20190124~cd.en.html,Alpha.\nB,https://www.ecb.europa.eu/about,Beta.\n",
    );
    let normalized = normalize_file(&path, FALLBACK_CHANNEL_A, &NormalizeConfig::default()).unwrap();
    assert_eq!(normalized.documents.len(), 1);
    assert_eq!(
        normalized.documents[0].date_time.to_string(),
        "2019-01-24 00:00:00"
    );
    assert_eq!(normalized.stats.dropped_undated, 1);
}

#[test]
fn corpus_round_trips_through_reader() {
    let temp = tempdir().unwrap();
    let speeches = write(temp.path(), "speeches.csv", SPEECHES.as_bytes());
    let pressers = write(temp.path(), "press_conferences.csv", PRESSERS.as_bytes());
    let corpus = temp.path().join("out/corpus.csv");
    let qa_path = temp.path().join("out/qa.json");
    let qa = run_ingestion(
        (speeches.as_path(), FALLBACK_CHANNEL_A),
        (pressers.as_path(), FALLBACK_CHANNEL_B),
        &corpus,
        &qa_path,
        &NormalizeConfig::default(),
    )
    .unwrap();

    let rows = read_corpus(&corpus).unwrap();
    assert_eq!(rows.len(), qa.rows_total);
    assert!(rows.iter().all(|row| row.date_time.is_some()));
    let header = fs::read_to_string(&corpus).unwrap();
    assert!(header.starts_with(
        "doc_id,date_time,channel,title,speaker,role,language,url,text_clean,source_file,n_chars,n_tokens_ws\n"
    ));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&qa_path).unwrap()).unwrap();
    assert_eq!(json["rows_total"], 4);
    assert_eq!(json["by_channel"]["speech"], 2);
    assert_eq!(json["by_channel"]["press_conference"], 2);
    assert_eq!(json["missing_speaker_%"], 50.0);
    assert_eq!(json["columns_picked"]["A"]["speaker_col"], "speakers");
}
