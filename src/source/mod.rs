//! Raw table access, table reading, and schema inference.
//!
//! Ownership model:
//! - `table_reader` turns bytes of unknown encoding/delimiter into a `RawTable`.
//! - `inference` guesses which raw columns carry each logical field.
//! - `date_helpers` parses free-form timestamps for date inference.

use crate::types::{CellValue, ColumnName};
use crate::utils::non_blank;

/// Timestamp parsing for date-column inference and url fallbacks.
pub mod date_helpers;
/// Column and date inference over raw tables.
pub mod inference;
/// Encoding/delimiter detection and permissive CSV parsing.
pub mod table_reader;

/// Header plus string cells from an arbitrary source CSV.
///
/// Every row has exactly `headers.len()` cells; an empty cell is a missing value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<ColumnName>,
    rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Build a table, padding or truncating rows to the header width.
    pub fn new(headers: Vec<ColumnName>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Column names in file order.
    pub fn headers(&self) -> &[ColumnName] {
        &self.headers
    }

    /// All rows.
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column named exactly `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Non-blank cell value, or `None` when missing.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .and_then(|value| non_blank(value))
    }

    /// Cells of one column as optional values.
    pub fn column(&self, column: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        (0..self.rows.len()).map(move |row| self.cell(row, column))
    }

    /// Rename headers in place with `rename`, leaving unmatched names as-is.
    pub fn rename_headers(&mut self, mut rename: impl FnMut(&str) -> Option<String>) {
        for header in &mut self.headers {
            if let Some(renamed) = rename(header) {
                *header = renamed;
            }
        }
    }

    /// Append a column filled with missing values.
    pub fn push_empty_column(&mut self, name: impl Into<ColumnName>) {
        self.headers.push(name.into());
        for row in &mut self.rows {
            row.push(String::new());
        }
    }
}
