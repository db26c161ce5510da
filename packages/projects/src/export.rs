//! CSV and JSON export of result tables.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use smart_scraper_extract_models::ResultTable;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::ProjectError;

/// File formats a [`ResultTable`] can be written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    /// Header row of column names, one line per row, missing values empty.
    Csv,
    /// Array of row objects, missing values `null`.
    Json,
}

impl ExportFormat {
    /// Infers the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }
}

/// Writes `table` as CSV. Only the table's columns are written.
///
/// # Errors
///
/// Returns [`ProjectError::Csv`] if writing fails.
pub fn write_csv<W: Write>(table: &ResultTable, writer: W) -> Result<(), ProjectError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(table.columns())?;
    for row in table.rows() {
        csv.write_record(row.values.iter().map(|v| v.as_deref().unwrap_or_default()))?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes `table` as a pretty-printed JSON array of row objects, each
/// carrying its source markup under `raw_html`.
///
/// # Errors
///
/// Returns [`ProjectError::Json`] if writing fails.
pub fn write_json<W: Write>(table: &ResultTable, writer: W) -> Result<(), ProjectError> {
    serde_json::to_writer_pretty(writer, table)?;
    Ok(())
}

/// Writes `table` to `path` in `format`.
///
/// # Errors
///
/// Returns [`ProjectError`] if the file cannot be created or written.
pub fn export_to_path(table: &ResultTable, path: &Path, format: ExportFormat) -> Result<(), ProjectError> {
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        ExportFormat::Csv => write_csv(table, &mut writer)?,
        ExportFormat::Json => write_json(table, &mut writer)?,
    }
    writer.flush()?;
    log::info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ResultTable {
        let entry = |k: &str, v: &str| (k.to_string(), Some(v.to_string()));
        ResultTable::from_entries(vec![
            vec![
                entry("tag", "a"),
                entry("content", "Home, sweet home"),
                entry("href", "/"),
                entry("raw_html", "<a href=\"/\">Home, sweet home</a>"),
            ],
            vec![entry("tag", "p"), entry("content", "Intro")],
        ])
    }

    #[test]
    fn csv_has_header_and_empty_missing_cells() {
        let mut out = Vec::new();
        write_csv(&table(), &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "tag,content,href\na,\"Home, sweet home\",/\np,Intro,\n"
        );
    }

    #[test]
    fn json_keeps_nulls_and_markup() {
        let mut out = Vec::new();
        write_json(&table(), &mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["href"], "/");
        assert_eq!(value[0]["raw_html"], "<a href=\"/\">Home, sweet home</a>");
        assert!(value[1]["href"].is_null());
    }

    #[test]
    fn empty_table_exports_header_only() {
        let mut out = Vec::new();
        write_csv(&ResultTable::empty(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "tag,content\n");
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            ExportFormat::from_path(Path::new("out/results.CSV")),
            Some(ExportFormat::Csv)
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("results.json")),
            Some(ExportFormat::Json)
        );
        assert_eq!(ExportFormat::from_path(Path::new("results.xlsx")), None);
        assert_eq!(ExportFormat::from_path(Path::new("results")), None);
    }

    #[test]
    fn export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.json");

        export_to_path(&table(), &path, ExportFormat::Json).unwrap();

        let back: ResultTable = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(back, table());
    }
}
