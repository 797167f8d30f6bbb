use std::fs::{self, File};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Writer, WriterBuilder};
use serde::Serialize;

use crate::errors::PipelineError;
use crate::utils::non_blank;

/// Read a whole input file, failing fast when it does not exist.
pub fn read_input_bytes(path: &Path) -> Result<Vec<u8>, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }
    fs::read(path).map_err(|err| PipelineError::Unreadable {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

/// File name without directories, or the full path when it has none.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

/// Create the parent directory of `path` when it has one.
pub fn ensure_parent_dir(path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Comma-separated UTF-8 writer with the header already written.
pub fn csv_writer<S: AsRef<str>>(path: &Path, headers: &[S]) -> Result<Writer<File>, PipelineError> {
    ensure_parent_dir(path)?;
    let mut writer = WriterBuilder::new().from_path(path)?;
    writer.write_record(headers.iter().map(|header| header.as_ref()))?;
    Ok(writer)
}

/// Write a header plus rows of string cells and flush.
pub fn write_csv<S, R, C>(path: &Path, headers: &[S], rows: R) -> Result<(), PipelineError>
where
    S: AsRef<str>,
    R: IntoIterator,
    R::Item: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    let mut writer = csv_writer(path, headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Pretty-printed JSON with a trailing newline.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    ensure_parent_dir(path)?;
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    fs::write(path, body)?;
    Ok(())
}

/// A CSV written by this crate, read back with named-column access.
#[derive(Clone, Debug, Default)]
pub struct CsvFrame {
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl CsvFrame {
    /// Read `path` as UTF-8 CSV with a header row.
    pub fn read(path: &Path) -> Result<Self, PipelineError> {
        if !path.is_file() {
            return Err(PipelineError::MissingInput(path.to_path_buf()));
        }
        let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers = reader
            .headers()?
            .iter()
            .map(|header| header.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, records })
    }

    /// Header row.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when there are no data rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the column named exactly `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Like `column_index`, but a missing column is an error.
    pub fn require_column(&self, name: &str, source_label: &str) -> Result<usize, PipelineError> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::MissingColumn {
                column: name.to_string(),
                source_label: source_label.to_string(),
            })
    }

    /// Raw cell, `""` when the row is short or the column absent.
    pub fn get(&self, row: usize, column: Option<usize>) -> &str {
        column
            .and_then(|column| self.records.get(row).and_then(|record| record.get(column)))
            .unwrap_or("")
    }

    /// Non-blank cell value.
    pub fn value(&self, row: usize, column: Option<usize>) -> Option<&str> {
        non_blank(self.get(row, column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_input_is_reported_before_reading() {
        let temp = tempdir().unwrap();
        let err = read_input_bytes(&temp.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
        assert!(matches!(
            CsvFrame::read(&temp.path().join("absent.csv")),
            Err(PipelineError::MissingInput(_))
        ));
    }

    #[test]
    fn writes_create_parent_dirs_and_read_back() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested/out/table.csv");
        write_csv(
            &path,
            &["doc_id", "text"],
            vec![vec!["a", "first, with comma"], vec!["b", "line\nbreak"]],
        )
        .unwrap();

        let frame = CsvFrame::read(&path).unwrap();
        assert_eq!(frame.headers(), &["doc_id".to_string(), "text".to_string()]);
        assert_eq!(frame.len(), 2);
        let text = frame.column_index("text");
        assert_eq!(frame.get(0, text), "first, with comma");
        assert_eq!(frame.get(1, text), "line\nbreak");
        assert_eq!(frame.get(1, None), "");
        assert!(frame.require_column("score", "features").is_err());
    }

    #[test]
    fn json_is_pretty_with_trailing_newline() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("qa/summary.json");
        write_json_pretty(&path, &serde_json::json!({"rows_total": 3})).unwrap();
        let body = fs::read_to_string(&path).unwrap();
        assert!(body.ends_with("}\n"));
        assert!(body.contains("\"rows_total\": 3"));
    }

    #[test]
    fn file_name_drops_directories() {
        assert_eq!(file_name_of(Path::new("data/raw/all_ECB_speeches.csv")), "all_ECB_speeches.csv");
    }
}
