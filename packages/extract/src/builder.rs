//! Accumulates [`ExtractedRecord`]s into a [`ResultTable`].

use smart_scraper_extract_models::{
    CONTENT_COLUMN, ExtractedRecord, RAW_HTML_KEY, ResultTable, TAG_COLUMN,
};

/// Collects records rule by rule and assembles them into one table.
#[derive(Debug, Default)]
pub struct TableBuilder {
    records: Vec<ExtractedRecord>,
}

impl TableBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Appends one record.
    pub fn push(&mut self, record: ExtractedRecord) {
        self.records.push(record);
    }

    /// Number of records collected so far.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records have been collected.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Builds the table: `tag`, `content`, then every other field in the
    /// order it was first seen. Missing cells are `None`.
    #[must_use]
    pub fn finish(self) -> ResultTable {
        ResultTable::from_entries(self.records.into_iter().map(record_entries).collect())
    }
}

impl Extend<ExtractedRecord> for TableBuilder {
    fn extend<I: IntoIterator<Item = ExtractedRecord>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}

fn record_entries(record: ExtractedRecord) -> Vec<(String, Option<String>)> {
    let mut entries = Vec::with_capacity(record.fields.len() + 3);
    entries.push((TAG_COLUMN.to_owned(), Some(record.tag)));
    entries.push((CONTENT_COLUMN.to_owned(), Some(record.content)));
    entries.extend(record.fields.into_iter().map(|(k, v)| (k, Some(v))));
    entries.push((RAW_HTML_KEY.to_owned(), Some(record.raw_html)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tag: &str, content: &str, fields: &[(&str, &str)]) -> ExtractedRecord {
        let mut r = ExtractedRecord::new(tag, content.to_owned(), format!("<{tag}/>"));
        for (k, v) in fields {
            r.set_field(k, (*v).to_owned());
        }
        r
    }

    #[test]
    fn empty_builder_has_base_schema() {
        let table = TableBuilder::new().finish();
        assert!(table.is_empty());
        assert_eq!(table.columns(), ["tag", "content"]);
    }

    #[test]
    fn heterogeneous_records_make_a_rectangular_table() {
        let mut builder = TableBuilder::new();
        builder.push(record("h1", "Title", &[]));
        builder.push(record("a", "Home", &[("href", "/"), ("link_text", "Home")]));
        builder.push(record("img", "", &[("src", "x.png"), ("alt", "")]));

        let table = builder.finish();

        assert_eq!(
            table.columns(),
            ["tag", "content", "href", "link_text", "src", "alt"]
        );
        assert!(
            table
                .rows()
                .iter()
                .all(|r| r.values.len() == table.columns().len())
        );
        assert_eq!(table.value(0, "href"), None);
        assert_eq!(table.value(1, "href"), Some("/"));
        assert_eq!(table.value(2, "alt"), Some(""));
        assert_eq!(table.rows()[2].raw_html, "<img/>");
    }
}
