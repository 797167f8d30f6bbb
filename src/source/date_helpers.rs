use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;

static RE_ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap());

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];
const DAY_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];
const MONTH_FIRST_DATETIME_FORMATS: &[&str] = &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"];
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%A, %d %B %Y",
    "%a, %d %b %Y",
];
const DAY_FIRST_DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d.%m.%Y", "%d-%m-%Y"];
const MONTH_FIRST_DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%Y"];

/// Parse a free-form timestamp cell.
///
/// Tries offset-aware forms (offsets are dropped, wall time kept), then
/// naive date-times, then dates, then compact `YYYYMMDD`, bare years, and
/// finally a token scan for textual months (`Nov. 15th, 2024`). With
/// `day_first`, ambiguous numeric dates like `03/04/2020` read as 3 April;
/// dates that only make sense month-first still parse.
pub fn parse_timestamp(value: &str, day_first: bool) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.naive_local());
    }
    for format in ["%Y-%m-%d %H:%M:%S%z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(parsed) = DateTime::parse_from_str(value, format) {
            return Some(parsed.naive_local());
        }
    }

    let (first_dt, second_dt, first_d, second_d) = if day_first {
        (
            DAY_FIRST_DATETIME_FORMATS,
            MONTH_FIRST_DATETIME_FORMATS,
            DAY_FIRST_DATE_FORMATS,
            MONTH_FIRST_DATE_FORMATS,
        )
    } else {
        (
            MONTH_FIRST_DATETIME_FORMATS,
            DAY_FIRST_DATETIME_FORMATS,
            MONTH_FIRST_DATE_FORMATS,
            DAY_FIRST_DATE_FORMATS,
        )
    };

    for format in DATETIME_FORMATS.iter().chain(first_dt).chain(second_dt) {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS.iter().chain(first_d).chain(second_d) {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, format) {
            return Some(at_midnight(parsed));
        }
    }
    if let Some(date) = parse_compact_ymd(value) {
        return Some(at_midnight(date));
    }
    if let Some(date) = parse_bare_year(value) {
        return Some(at_midnight(date));
    }
    parse_textual_date(value).map(at_midnight)
}

/// First ISO `YYYY-MM-DD` substring of `text`, when it is a real date.
pub fn extract_iso_date(text: &str) -> Option<NaiveDate> {
    let capture = RE_ISO_DATE.captures(text)?;
    NaiveDate::parse_from_str(capture.get(1)?.as_str(), "%Y-%m-%d").ok()
}

/// First 8-digit `YYYYMMDD` token right after `marker`, when it is a real date.
pub fn extract_marked_compact_date(text: &str, marker: &str) -> Option<NaiveDate> {
    let mut search_from = 0;
    while let Some(found) = text[search_from..].find(marker) {
        let start = search_from + found + marker.len();
        let digits: String = text[start..].chars().take(8).collect();
        if digits.len() == 8 && digits.chars().all(|ch| ch.is_ascii_digit()) {
            return parse_compact_ymd(&digits);
        }
        let step = if marker.is_empty() {
            text[start..].chars().next().map_or(1, char::len_utf8)
        } else {
            marker.len()
        };
        search_from = search_from + found + step;
        if search_from >= text.len() {
            break;
        }
    }
    None
}

/// Parse exactly eight ASCII digits as `YYYYMMDD`.
pub fn parse_compact_ymd(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let year = value[0..4].parse::<i32>().ok()?;
    let month = value[4..6].parse::<u32>().ok()?;
    let day = value[6..8].parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Midnight of `date`.
pub fn at_midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Canonical `YYYY-MM-DD HH:MM:SS` rendering.
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render a whole column, dropping the time part when every value is midnight.
pub fn format_timestamp_column<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a NaiveDateTime>>,
    I::IntoIter: Clone,
{
    let values = values.into_iter();
    let date_only = values.clone().flatten().all(is_midnight);
    values
        .map(|value| match value {
            Some(ts) if date_only => ts.format("%Y-%m-%d").to_string(),
            Some(ts) => format_timestamp(ts),
            None => String::new(),
        })
        .collect()
}

fn is_midnight(value: &NaiveDateTime) -> bool {
    value.hour() == 0 && value.minute() == 0 && value.second() == 0 && value.nanosecond() == 0
}

fn parse_bare_year(value: &str) -> Option<NaiveDate> {
    if value.len() != 4 || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let year = value.parse::<i32>().ok()?;
    if !(1000..=2999).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, 1, 1)
}

/// Token scan for dates written with a month name.
///
/// Needs exactly one month token and one 4-digit year; a 1-2 digit token
/// (ordinal suffixes allowed) gives the day, defaulting to the 1st.
fn parse_textual_date(value: &str) -> Option<NaiveDate> {
    let tokens: Vec<String> = value
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
        .collect();

    let mut month = None;
    let mut year = None;
    let mut day = None;
    for token in &tokens {
        if let Some(number) = month_token_to_number(token) {
            if month.replace(number).is_some() {
                return None;
            }
            continue;
        }
        let digits = strip_ordinal_suffix(token);
        if !digits.bytes().all(|byte| byte.is_ascii_digit()) || digits.is_empty() {
            continue;
        }
        match digits.len() {
            4 => {
                if year.replace(digits.parse::<i32>().ok()?).is_some() {
                    return None;
                }
            }
            1 | 2 if day.is_none() => day = digits.parse::<u32>().ok(),
            _ => {}
        }
    }
    NaiveDate::from_ymd_opt(year?, month?, day.unwrap_or(1))
}

fn strip_ordinal_suffix(token: &str) -> &str {
    for suffix in ["st", "nd", "rd", "th"] {
        if let Some(stripped) = token.strip_suffix(suffix)
            && !stripped.is_empty()
            && stripped.bytes().all(|byte| byte.is_ascii_digit())
        {
            return stripped;
        }
    }
    token
}

/// Convert a lowercase month token to a month number (1-12).
fn month_token_to_number(token: &str) -> Option<u32> {
    match token {
        "jan" | "january" | "janvier" => Some(1),
        "feb" | "february" | "fevrier" => Some(2),
        "mar" | "march" | "mars" => Some(3),
        "apr" | "april" | "avril" => Some(4),
        "may" | "mai" => Some(5),
        "jun" | "june" | "juin" => Some(6),
        "jul" | "july" | "juillet" => Some(7),
        "aug" | "august" | "aout" => Some(8),
        "sep" | "sept" | "september" | "septembre" => Some(9),
        "oct" | "october" | "octobre" => Some(10),
        "nov" | "november" | "novembre" => Some(11),
        "dec" | "december" | "decembre" => Some(12),
        _ => None,
    }
}
