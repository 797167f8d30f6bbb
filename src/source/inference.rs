//! Column guessing for heterogeneous exports.
//!
//! Every guess is a best-effort heuristic: the chosen column is the
//! best-scoring candidate, not a verified semantic match.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::RawTable;
use super::date_helpers::{at_midnight, extract_iso_date, extract_marked_compact_date, parse_timestamp};
use crate::config::{ColumnNeedles, DateInferenceConfig};
use crate::heuristics::{best_guess, first_matching_column, matching_columns, score_candidates};

/// Resolved source columns for each logical field (`None` when absent).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    /// Title column index.
    pub title: Option<usize>,
    /// Text column index.
    pub text: Option<usize>,
    /// Speaker column index.
    pub speaker: Option<usize>,
    /// Url column index.
    pub url: Option<usize>,
}

impl ColumnRoles {
    /// Guess title/text/speaker/url columns from header substrings.
    pub fn infer(table: &RawTable, needles: &ColumnNeedles) -> Self {
        let headers = table.headers();
        Self {
            title: first_matching_column(headers, &needles.title),
            text: first_matching_column(headers, &needles.text),
            speaker: first_matching_column(headers, &needles.speaker),
            url: first_matching_column(headers, &needles.url),
        }
    }
}

/// Where the per-row dates came from.
#[derive(Clone, Debug, PartialEq)]
pub enum DateSource {
    /// A header-matched column, with its share of parsed rows.
    Column { index: usize, parse_fraction: f64 },
    /// Patterns extracted from the url column.
    Url { index: usize },
    /// No usable source; every row is undated.
    None,
}

/// Parsed per-row dates plus their provenance.
#[derive(Clone, Debug)]
pub struct DateGuess {
    /// Where the dates came from.
    pub source: DateSource,
    /// Parsed timestamp per row.
    pub values: Vec<Option<NaiveDateTime>>,
}

impl DateGuess {
    /// Column index when dates came from a date-like column.
    pub fn column(&self) -> Option<usize> {
        match self.source {
            DateSource::Column { index, .. } => Some(index),
            _ => None,
        }
    }
}

/// Column names picked for one input, as reported in the QA summary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ColumnPicks {
    /// Title column header.
    pub title_col: String,
    /// Text column header.
    pub text_col: String,
    /// Speaker column header.
    pub speaker_col: String,
    /// Url column header.
    pub url_col: String,
    /// Date column header, or the url fallback.
    pub date_col: String,
    /// Channel assigned to the file.
    pub channel: String,
    /// Raw export file name.
    pub source: String,
}

impl ColumnPicks {
    /// Render picks with empty strings for missing roles.
    pub fn describe(
        table: &RawTable,
        roles: &ColumnRoles,
        dates: &DateGuess,
        channel: &str,
        source: &str,
    ) -> Self {
        let name = |idx: Option<usize>| {
            idx.and_then(|idx| table.headers().get(idx).cloned())
                .unwrap_or_default()
        };
        Self {
            title_col: name(roles.title),
            text_col: name(roles.text),
            speaker_col: name(roles.speaker),
            url_col: name(roles.url),
            date_col: name(dates.column()),
            channel: channel.to_string(),
            source: source.to_string(),
        }
    }
}

/// Parse one column as timestamps.
pub fn parse_date_column(
    table: &RawTable,
    column: usize,
    day_first: bool,
) -> Vec<Option<NaiveDateTime>> {
    table
        .column(column)
        .map(|cell| cell.and_then(|value| parse_timestamp(value, day_first)))
        .collect()
}

/// Share of rows with a parsed value; zero for an empty table.
pub fn parse_fraction(values: &[Option<NaiveDateTime>]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|value| value.is_some()).count() as f64 / values.len() as f64
}

/// Pick the date-like column with the highest parse fraction.
///
/// Falls back to url extraction when no candidate parses more than
/// `min_parse_fraction` of the rows.
pub fn infer_dates(table: &RawTable, url_column: Option<usize>, config: &DateInferenceConfig) -> DateGuess {
    let candidates = matching_columns(table.headers(), &config.needles);
    let parsed: Vec<(usize, Vec<Option<NaiveDateTime>>)> = candidates
        .into_iter()
        .map(|idx| (idx, parse_date_column(table, idx, config.day_first)))
        .collect();

    let guesses = score_candidates(0..parsed.len(), |&slot| parse_fraction(&parsed[slot].1));
    if let Some(best) = best_guess(guesses, config.min_parse_fraction) {
        let (index, values) = parsed.into_iter().nth(best.candidate).unwrap_or_default();
        return DateGuess {
            source: DateSource::Column {
                index,
                parse_fraction: best.score,
            },
            values,
        };
    }

    match url_column {
        Some(index) => DateGuess {
            source: DateSource::Url { index },
            values: url_dates(table, index, &config.url_marker),
        },
        None => DateGuess {
            source: DateSource::None,
            values: vec![None; table.len()],
        },
    }
}

/// Dates recovered from urls: ISO substring first, then the marked compact token.
pub fn url_dates(table: &RawTable, url_column: usize, marker: &str) -> Vec<Option<NaiveDateTime>> {
    table
        .column(url_column)
        .map(|cell| {
            cell.and_then(|url| {
                extract_iso_date(url)
                    .or_else(|| extract_marked_compact_date(url, marker))
                    .map(at_midnight)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn roles_follow_header_order() {
        let t = table(
            &["Subject", "Contents", "Speakers", "Link", "Pub Date"],
            &[],
        );
        let roles = ColumnRoles::infer(&t, &ColumnNeedles::default());
        assert_eq!(roles.title, Some(0));
        assert_eq!(roles.text, Some(1));
        assert_eq!(roles.speaker, Some(2));
        assert_eq!(roles.url, Some(3));
    }

    #[test]
    fn best_parsing_date_column_wins() {
        let t = table(
            &["year", "date", "text"],
            &[
                &["unknown", "2020-01-10", "a"],
                &["2020", "2020-02-11", "b"],
                &["", "n/a", "c"],
            ],
        );
        let guess = infer_dates(&t, None, &DateInferenceConfig::default());
        assert_eq!(guess.column(), Some(1));
        assert_eq!(
            guess.values[1],
            NaiveDate::from_ymd_opt(2020, 2, 11).map(at_midnight)
        );
        assert_eq!(guess.values[2], None);
    }

    #[test]
    fn ties_keep_first_candidate() {
        let t = table(&["date", "pub_time"], &[&["2020-01-10", "2021-01-10"]]);
        let guess = infer_dates(&t, None, &DateInferenceConfig::default());
        assert_eq!(guess.column(), Some(0));
    }

    #[test]
    fn falls_back_to_url_when_nothing_parses() {
        let t = table(
            &["date", "url"],
            &[
                &["soon", "https://x.org/press/2019-07-25-statement.html"],
                &["later", "https://x.org/ecb.is20190124~cd.en.html"],
                &["never", "https://x.org/about"],
            ],
        );
        let guess = infer_dates(&t, Some(1), &DateInferenceConfig::default());
        assert_eq!(guess.source, DateSource::Url { index: 1 });
        assert_eq!(
            guess.values,
            vec![
                NaiveDate::from_ymd_opt(2019, 7, 25).map(at_midnight),
                NaiveDate::from_ymd_opt(2019, 1, 24).map(at_midnight),
                None,
            ]
        );
    }

    #[test]
    fn no_candidates_and_no_url_leaves_rows_undated() {
        let t = table(&["title", "text"], &[&["a", "b"]]);
        let guess = infer_dates(&t, None, &DateInferenceConfig::default());
        assert_eq!(guess.source, DateSource::None);
        assert_eq!(guess.values, vec![None]);
    }

    #[test]
    fn picks_describe_missing_roles_as_empty() {
        let t = table(&["title", "body", "date"], &[&["a", "b", "2020-01-01"]]);
        let roles = ColumnRoles::infer(&t, &ColumnNeedles::default());
        let dates = infer_dates(&t, roles.url, &DateInferenceConfig::default());
        let picks = ColumnPicks::describe(&t, &roles, &dates, "speech", "a.csv");
        assert_eq!(picks.title_col, "title");
        assert_eq!(picks.text_col, "body");
        assert_eq!(picks.speaker_col, "");
        assert_eq!(picks.url_col, "");
        assert_eq!(picks.date_col, "date");
    }
}
