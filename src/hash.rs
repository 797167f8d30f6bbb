use sha2::{Digest, Sha256};

use crate::constants::ingest::{DOC_ID_SEPARATOR, DOC_ID_TEXT_PREFIX_CHARS};
use crate::types::DocId;

/// Hex SHA-256 over `parts` joined by `||`.
pub fn stable_hash_parts<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for (idx, part) in parts.into_iter().enumerate() {
        if idx > 0 {
            hasher.update(DOC_ID_SEPARATOR.as_bytes());
        }
        hasher.update(part.as_ref().as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Document id from source file, title, rendered date, speaker, and a text prefix.
///
/// Only the first 160 characters of `text_clean` participate, so two documents
/// that agree on every other field and share that prefix collide.
pub fn stable_doc_id(
    source_file: &str,
    title: &str,
    date_time: &str,
    speaker: &str,
    text_clean: &str,
) -> DocId {
    let prefix: String = text_clean.chars().take(DOC_ID_TEXT_PREFIX_CHARS).collect();
    stable_hash_parts([source_file, title, date_time, speaker, prefix.as_str()])
}
