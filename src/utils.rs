//! Text normalization helpers shared by the ingestion and analysis stages.

use std::sync::LazyLock;

use regex::Regex;

static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static RE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"http\S+").unwrap());
static RE_BRACKET_NOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]+\]").unwrap());

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_inline_whitespace<T: AsRef<str>>(text: T) -> String {
    let mut normalized = String::new();
    let mut seen_space = false;
    for ch in text.as_ref().chars() {
        if ch.is_whitespace() {
            if !seen_space {
                normalized.push(' ');
                seen_space = true;
            }
        } else {
            normalized.push(ch);
            seen_space = false;
        }
    }
    normalized.trim().to_string()
}

/// Corpus cleaner: drop markup tags, non-breaking spaces, and urls, then collapse whitespace.
///
/// `None` (a missing cell) yields an empty string.
pub fn clean_text(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let without_tags = RE_TAG.replace_all(raw, " ");
    let without_nbsp = without_tags.replace('\u{a0}', " ");
    let without_urls = RE_URL.replace_all(&without_nbsp, " ");
    normalize_inline_whitespace(without_urls)
}

/// Lighter cleaner used by the merge pipeline: drops `[...]` notes and urls.
pub fn clean_text_basic(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let collapsed = normalize_inline_whitespace(raw);
    let without_notes = RE_BRACKET_NOTE.replace_all(&collapsed, " ");
    let without_urls = RE_URL.replace_all(&without_notes, " ");
    normalize_inline_whitespace(without_urls)
}

/// Number of whitespace-separated tokens.
pub fn whitespace_token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// First `max_chars` characters after whitespace collapsing.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    normalize_inline_whitespace(text)
        .chars()
        .take(max_chars)
        .collect()
}

/// Treat empty or whitespace-only cells as missing.
pub fn non_blank(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
