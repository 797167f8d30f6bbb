/// Constants used by the table reader.
pub mod reader {
    /// Encodings tried, in order, until one decodes the whole file.
    pub const ENCODINGS: [&str; 4] = ["utf-8", "utf-8-sig", "cp1252", "latin-1"];
    /// Candidate field delimiters for sniffing.
    pub const DELIMITERS: [u8; 4] = [b',', b';', b'|', b'\t'];
    /// Number of leading characters inspected when sniffing a delimiter.
    pub const SNIFF_SAMPLE_CHARS: usize = 100_000;
    /// Max lines of the sample considered by the consistency sniffer.
    pub const SNIFF_MAX_LINES: usize = 200;
}

/// Constants used by corpus normalization.
pub mod ingest {
    /// Separator between identifying fields before hashing.
    pub const DOC_ID_SEPARATOR: &str = "||";
    /// Number of leading `text_clean` characters included in the document id.
    pub const DOC_ID_TEXT_PREFIX_CHARS: usize = 160;

    /// Header substrings identifying a title column.
    pub const TITLE_NEEDLES: &[&str] = &["title", "subject", "headline"];
    /// Header substrings identifying a text column.
    pub const TEXT_NEEDLES: &[&str] = &[
        "text",
        "content",
        "speech",
        "remarks",
        "transcript",
        "body",
        "contents",
    ];
    /// Header substrings identifying a speaker column.
    pub const SPEAKER_NEEDLES: &[&str] = &["speaker", "author", "name", "president", "speakers"];
    /// Header substrings identifying a url column.
    pub const URL_NEEDLES: &[&str] = &["url", "link", "href"];
    /// Header substrings identifying date-like candidate columns.
    pub const DATE_NEEDLES: &[&str] = &["date", "time", "year", "day", "pub"];

    /// Marker preceding an 8-digit `YYYYMMDD` token in ECB urls.
    pub const URL_DATE_MARKER: &str = "is";

    /// Fallback channel for the first ingestion input.
    pub const FALLBACK_CHANNEL_A: &str = "speech";
    /// Fallback channel for the second ingestion input.
    pub const FALLBACK_CHANNEL_B: &str = "press_conference";

    /// Default corpus output path.
    pub const DEFAULT_CORPUS_PATH: &str = "outputs/ecb_text_corpus.csv";
    /// Default QA summary output path.
    pub const DEFAULT_QA_PATH: &str = "outputs/ecb_text_corpus_QA.json";

    /// Column order of the normalized corpus CSV.
    pub const CORPUS_COLUMNS: [&str; 12] = [
        "doc_id",
        "date_time",
        "channel",
        "title",
        "speaker",
        "role",
        "language",
        "url",
        "text_clean",
        "source_file",
        "n_chars",
        "n_tokens_ws",
    ];
}

/// Constants used by the merged-texts pipelines.
pub mod merge {
    /// Canonical columns every merge input must provide.
    pub const REQUIRED_COLUMNS: [&str; 4] = ["date", "title", "link", "text"];
    /// Column order of the merged CSV.
    pub const MERGED_COLUMNS: [&str; 5] = ["date", "title", "link", "text", "source_type"];
    /// Header synonyms, canonical name first.
    pub const SYNONYMS: [(&str, &[&str]); 4] = [
        (
            "date",
            &["date", "publication_date", "pub_date", "time", "datetime"],
        ),
        ("title", &["title", "headline", "subject"]),
        ("link", &["link", "url", "urls", "href"]),
        (
            "text",
            &["text", "content", "body", "speech", "transcript"],
        ),
    ];
    /// Source type for the speeches input.
    pub const SOURCE_SPEECH: &str = "speech";
    /// Source type for the press-conference input.
    pub const SOURCE_PRESS_CONF: &str = "press_conf";
    /// Source label used by the strict merge for press conferences.
    pub const SOURCE_PRESSER: &str = "presser";
    /// Column order of the strict merge output.
    pub const STRICT_MERGED_COLUMNS: [&str; 6] = ["date", "title", "link", "text", "source", "doc_id"];
    /// Delimiters tried by the synonym reader, in order.
    pub const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];
}

/// Constants used by the lexical and model-based scorers.
pub mod scoring {
    /// Default TF-IDF minimum document frequency (absolute count).
    pub const DEFAULT_TFIDF_MIN_DF: usize = 5;
    /// Default TF-IDF maximum document frequency (fraction of documents).
    pub const DEFAULT_TFIDF_MAX_DF: f64 = 0.9;

    /// Seed terms signalling tighter policy.
    pub const HAWKISH_SEEDS: &[&str] = &[
        "hike",
        "tightening",
        "restrictive",
        "inflation",
        "above target",
        "increase rates",
    ];
    /// Seed terms signalling looser policy.
    pub const DOVISH_SEEDS: &[&str] = &[
        "cut",
        "easing",
        "accommodative",
        "disinflation",
        "below target",
        "decrease rates",
    ];

    /// Lexical raw score column.
    pub const TFIDF_SCORE_COLUMN: &str = "tfidf_hawk_minus_dove";
    /// Model-based raw score column.
    pub const TONE_SCORE_COLUMN: &str = "tone_finbert";
    /// Suffix appended to a score column for its corpus-wide z-score.
    pub const Z_SUFFIX: &str = "_z";

    /// Max characters per classifier chunk.
    pub const TONE_MAX_CHARS: usize = 4500;
    /// Max tokens fed to the classifier per chunk.
    pub const TONE_MAX_TOKENS: usize = 512;
    /// Model name recorded in logs.
    pub const DEFAULT_TONE_MODEL: &str = "yiyanghkust/finbert-tone";
    /// Classifier output labels in logit order.
    pub const FINBERT_LABELS: [&str; 3] = ["Neutral", "Positive", "Negative"];

    /// Default lexical feature output path.
    pub const DEFAULT_TFIDF_OUTPUT: &str = "features_tfidf.csv";
    /// Default model-based feature output path.
    pub const DEFAULT_TONE_OUTPUT: &str = "features_finbert.csv";
}

/// Constants used by feature analysis and exports.
pub mod analysis {
    /// Fixed z-score threshold approximating tercile cut points under normality.
    pub const LABEL_Z_THRESHOLD: f64 = 0.67;
    /// Lower empirical quantile for the quantile labeling policy.
    pub const LABEL_LOW_QUANTILE: f64 = 0.30;
    /// Upper empirical quantile for the quantile labeling policy.
    pub const LABEL_HIGH_QUANTILE: f64 = 0.70;

    /// Channel assigned when no metadata is joined.
    pub const UNKNOWN_CHANNEL: &str = "unknown";
    /// Per-channel z column for the lexical score.
    pub const TFIDF_CHANNEL_Z_COLUMN: &str = "tfidf_hmd_z_ch";
    /// Label column for the lexical score.
    pub const TFIDF_LABEL_COLUMN: &str = "lex_label";

    /// Rows kept in each reading pack.
    pub const READING_PACK_ROWS: usize = 30;
    /// Characters kept in a reading-pack excerpt.
    pub const EXCERPT_CHARS: usize = 500;
    /// Histogram bin count for the z distribution plot.
    pub const HISTOGRAM_BINS: usize = 50;
    /// Rows printed in the console preview.
    pub const PREVIEW_ROWS: usize = 5;

    /// Default feature input path.
    pub const DEFAULT_FEATURES_PATH: &str = "features_tfidf.csv";
    /// Default metadata input path.
    pub const DEFAULT_META_PATH: &str = "ecb_text_corpus.csv";

    /// Joined, labeled feature table.
    pub const FEATURES_READY_FILE: &str = "features_ready.csv";
    /// Monthly mean of per-channel z.
    pub const MONTHLY_SERIES_FILE: &str = "series_hawk_dove_monthly.csv";
    /// Per-channel summary statistics.
    pub const CHANNEL_STATS_FILE: &str = "by_channel_stats.csv";
    /// Most hawkish documents with excerpts.
    pub const READING_PACK_HAWKISH_FILE: &str = "reading_pack_hawkish.csv";
    /// Most dovish documents with excerpts.
    pub const READING_PACK_DOVISH_FILE: &str = "reading_pack_dovish.csv";
    /// Histogram of per-channel z.
    pub const PLOT_HIST_FILE: &str = "plot_z_hist.png";
    /// Boxplot of per-channel z by channel.
    pub const PLOT_BY_CHANNEL_FILE: &str = "plot_z_by_channel.png";
    /// Monthly mean line chart.
    pub const PLOT_MONTHLY_FILE: &str = "plot_monthly_mean.png";
}
