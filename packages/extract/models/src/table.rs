//! The rectangular result of one extraction run.
//!
//! Every row has exactly one cell per column. `tag` and `content` are always
//! the first two columns; the rest follow in first-seen order. Each row also
//! keeps the matched element's outer markup, which travels with the row but
//! is not a column.

use std::fmt;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{CONTENT_COLUMN, TAG_COLUMN};

/// Key under which row-oriented records carry a row's outer markup.
pub const RAW_HTML_KEY: &str = "raw_html";

/// A column list or row that would break the table's shape.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TableShapeError {
    /// The first two columns are not `tag` and `content`.
    #[error("columns must start with `tag`, `content`; got {0:?}")]
    Columns(Vec<String>),

    /// A row has the wrong number of cells.
    #[error("row {row} has {cells} cells but the table has {columns} columns")]
    Row {
        /// Zero-based row position.
        row: usize,
        /// Cells in the offending row.
        cells: usize,
        /// Columns in the table.
        columns: usize,
    },
}

/// One row of a [`ResultTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// One cell per column; `None` where the record lacked the field.
    pub values: Vec<Option<String>>,
    /// Outer markup of the matched element.
    pub raw_html: String,
}

/// Ordered, rectangular collection of extracted records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

impl Default for ResultTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl ResultTable {
    /// A table with no rows and the base `tag`, `content` schema.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            columns: vec![TAG_COLUMN.to_owned(), CONTENT_COLUMN.to_owned()],
            rows: Vec::new(),
        }
    }

    /// Builds a table from explicit columns and rows.
    ///
    /// # Errors
    ///
    /// Returns [`TableShapeError`] if the columns don't start with `tag`,
    /// `content` or any row's width differs from the column count.
    pub fn new(columns: Vec<String>, rows: Vec<TableRow>) -> Result<Self, TableShapeError> {
        if columns.len() < 2 || columns[0] != TAG_COLUMN || columns[1] != CONTENT_COLUMN {
            return Err(TableShapeError::Columns(columns));
        }
        if let Some((row, bad)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.values.len() != columns.len())
        {
            return Err(TableShapeError::Row {
                row,
                cells: bad.values.len(),
                columns: columns.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in extraction order.
    #[must_use]
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the named column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// The cell at `row` in the named column.
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.values.get(col)?.as_deref()
    }

    /// Every cell of the named column, top to bottom.
    #[must_use]
    pub fn column_values(&self, column: &str) -> Vec<Option<&str>> {
        self.column_index(column).map_or_else(Vec::new, |col| {
            self.rows
                .iter()
                .map(|r| r.values.get(col).and_then(Option::as_deref))
                .collect()
        })
    }

    /// Returns a table holding only the first `limit` rows.
    #[must_use]
    pub fn head(&self, limit: usize) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(limit).cloned().collect(),
        }
    }

    /// Keeps the rows whose tag is one of `tags` (any tag when `tags` is
    /// empty) and whose content contains `search`, ignoring case. Columns
    /// are unchanged.
    #[must_use]
    pub fn filter(&self, tags: &[String], search: Option<&str>) -> Self {
        let needle = search.map(str::to_lowercase).filter(|s| !s.is_empty());
        let rows = self
            .rows
            .iter()
            .filter(|row| {
                let tag = row.values[0].as_deref().unwrap_or_default();
                tags.is_empty() || tags.iter().any(|t| t == tag)
            })
            .filter(|row| {
                needle.as_deref().is_none_or(|needle| {
                    row.values[1]
                        .as_deref()
                        .is_some_and(|content| content.to_lowercase().contains(needle))
                })
            })
            .cloned()
            .collect();

        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Rebuilds a table from row-oriented `(column, value)` entries.
    ///
    /// Columns after `tag`, `content` appear in first-seen order; a
    /// [`RAW_HTML_KEY`] entry becomes the row's markup.
    #[must_use]
    pub fn from_entries(entries: Vec<Vec<(String, Option<String>)>>) -> Self {
        let mut columns = vec![TAG_COLUMN.to_owned(), CONTENT_COLUMN.to_owned()];
        for row in &entries {
            for (name, _) in row {
                if name != RAW_HTML_KEY && !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }

        let rows = entries
            .into_iter()
            .map(|row| {
                let mut values = vec![None; columns.len()];
                let mut raw_html = String::new();
                for (name, value) in row {
                    if name == RAW_HTML_KEY {
                        raw_html = value.unwrap_or_default();
                    } else if let Some(col) = columns.iter().position(|c| *c == name) {
                        values[col] = value;
                    }
                }
                TableRow { values, raw_html }
            })
            .collect();

        Self { columns, rows }
    }
}

/// Row-oriented view used for serialization.
struct RowRecord<'a> {
    columns: &'a [String],
    row: &'a TableRow,
}

impl Serialize for RowRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len() + 1))?;
        for (name, value) in self.columns.iter().zip(&self.row.values) {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(RAW_HTML_KEY, &self.row.raw_html)?;
        map.end()
    }
}

impl Serialize for ResultTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&RowRecord {
                columns: &self.columns,
                row,
            })?;
        }
        seq.end()
    }
}

/// Ordered entries of one serialized row.
struct RowEntries(Vec<(String, Option<String>)>);

impl<'de> Deserialize<'de> for RowEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = RowEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column names to string or null values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RowEntries, A::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = access.next_entry::<String, Option<String>>()? {
                    entries.push(entry);
                }
                Ok(RowEntries(entries))
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

impl<'de> Deserialize<'de> for ResultTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = ResultTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a sequence of row records")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<ResultTable, A::Error> {
                let mut rows = Vec::new();
                while let Some(RowEntries(entries)) = access.next_element()? {
                    rows.push(entries);
                }
                Ok(ResultTable::from_entries(rows))
            }
        }

        deserializer.deserialize_seq(TableVisitor)
    }
}
