#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! On-disk state for the smart scraper.
//!
//! Everything lives under a single data directory:
//!
//! ```text
//! <data_dir>/
//!   templates/<id>.json          custom templates
//!   projects/<name>_<timestamp>/
//!     config.json                rule set and acquisition settings
//!     results.csv                last results, when any
//!     results.json
//! ```
//!
//! Built-in templates are compiled into the binary and are never written
//! to disk.

pub mod export;
pub mod projects;
pub mod templates;

use std::path::{Component, Path};

use thiserror::Error;

pub use export::{ExportFormat, export_to_path, write_csv, write_json};
pub use projects::{Project, ProjectConfig, ProjectDraft, ProjectStore, ProjectSummary, ProjectUpdate};
pub use templates::{Template, TemplateStore, builtin_templates};

/// Characters that may not appear in a file or directory name.
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Errors that can occur while reading or writing scraper state.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON document could not be read or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// No project or template with the given id.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// `"Project"` or `"Template"`.
        kind: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// Built-in templates are read-only.
    #[error("Template {id} is built in and cannot be changed")]
    BuiltIn {
        /// The built-in template id.
        id: String,
    },

    /// Required input was missing or malformed.
    #[error("Invalid input: {message}")]
    Invalid {
        /// Description.
        message: String,
    },
}

/// Replaces characters that are not allowed in file names with `_`.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Sanitizes `id` and accepts it only when it names a single entry inside
/// a store directory, so `.` and `..` never resolve outside the store.
pub(crate) fn store_key(id: &str) -> Option<String> {
    let key = sanitize_name(id);
    let mut components = Path::new(&key).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(key),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_characters_become_underscores() {
        assert_eq!(sanitize_name(r#"a<b>c:d"e/f\g|h?i*j"#), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_name("  Shop prices  "), "Shop prices");
    }

    #[test]
    fn store_keys_are_single_normal_components() {
        assert_eq!(store_key(" shop_20260101_090000 ").as_deref(), Some("shop_20260101_090000"));
        assert_eq!(store_key("a/b").as_deref(), Some("a_b"));
        assert_eq!(store_key(".."), None);
        assert_eq!(store_key(" . "), None);
        assert_eq!(store_key(""), None);
    }
}
