use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub use crate::types::{DocId, SourceFileName};

/// Communication type of a document.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Channel {
    /// Speech, lecture, or keynote.
    Speech,
    /// Press conference introductory statement.
    PressConference,
    /// Press conference questions and answers.
    Qna,
    /// Interview.
    Interview,
    /// Any other label read back from a corpus (e.g. `unknown`).
    Other(String),
}

impl Channel {
    /// Canonical snake_case label.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Speech => "speech",
            Self::PressConference => "press_conference",
            Self::Qna => "qna",
            Self::Interview => "interview",
            Self::Other(label) => label,
        }
    }

    /// Parse a stored label; unrecognized labels are kept verbatim.
    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "speech" => Self::Speech,
            "press_conference" => Self::PressConference,
            "qna" => Self::Qna,
            "interview" => Self::Interview,
            other => Self::Other(other.to_string()),
        }
    }

    /// Guess a channel from a source file name, else return `fallback`.
    pub fn guess_from_file_name(file_name: &str, fallback: &str) -> Self {
        let lowered = file_name.to_lowercase();
        if lowered.contains("conf") || lowered.contains("press") {
            Self::PressConference
        } else if lowered.contains("q&a") || lowered.contains("qa") {
            Self::Qna
        } else if lowered.contains("interview") {
            Self::Interview
        } else if lowered.contains("speech") {
            Self::Speech
        } else {
            Self::parse(fallback)
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Channel {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Channel> for String {
    fn from(value: Channel) -> Self {
        value.as_str().to_string()
    }
}

/// One row of the normalized corpus.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedDocument {
    /// Content-derived id; also the dedup key.
    pub doc_id: DocId,
    /// Publication timestamp.
    pub date_time: NaiveDateTime,
    /// Communication type.
    pub channel: Channel,
    /// Title; may be empty.
    pub title: String,
    /// Speaker; may be empty.
    pub speaker: String,
    /// Always empty; kept for schema compatibility.
    pub role: String,
    /// Always empty; kept for schema compatibility.
    pub language: String,
    /// Source url; may be empty.
    pub url: String,
    /// Cleaned body text; never empty for retained rows.
    pub text_clean: String,
    /// File name of the raw export.
    pub source_file: SourceFileName,
    /// Characters in `text_clean`.
    pub n_chars: usize,
    /// Whitespace tokens in `text_clean`.
    pub n_tokens_ws: usize,
}

/// One row of the merged-texts format.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedRow {
    /// Publication timestamp.
    pub date: NaiveDateTime,
    /// Title.
    pub title: String,
    /// Source url.
    pub link: String,
    /// Cleaned text.
    pub text: String,
    /// `speech`, `press_conf`, or another channel label.
    pub source_type: String,
}

/// Per-document score with its corpus-wide z-score.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureRecord {
    /// Corpus document id.
    pub doc_id: DocId,
    /// Raw score.
    pub score: f64,
    /// Corpus-wide z-score.
    pub score_z: f64,
}

/// Three-way policy-sentiment label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneLabel {
    /// Below the lower cut.
    Dovish,
    /// Between the cuts.
    Neutral,
    /// Above the upper cut.
    Hawkish,
}

impl ToneLabel {
    /// Lowercase label as written to CSV.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dovish => "dovish",
            Self::Neutral => "neutral",
            Self::Hawkish => "hawkish",
        }
    }
}

impl fmt::Display for ToneLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
