/// Stable document identifier (hex SHA-256 of identifying fields).
/// Example: `3f1a...c9` (64 hex chars)
pub type DocId = String;
/// Raw column name as found in a source CSV header.
/// Examples: `pub_date`, `Speech Title`, `speakers`
pub type ColumnName = String;
/// Single cell value from a raw table (empty string means missing).
/// Examples: `2020-01-10`, `Christine Lagarde`, ``
pub type CellValue = String;
/// Source file name (no directory) recorded on every normalized document.
/// Example: `all_ECB_speeches.csv`
pub type SourceFileName = String;
/// Name of a numeric score column in a feature table.
/// Examples: `tfidf_hawk_minus_dove`, `tone_finbert`
pub type ScoreColumn = String;
/// Term (unigram or bigram) in a fitted TF-IDF vocabulary.
/// Examples: `inflation`, `above target`
pub type Term = String;
