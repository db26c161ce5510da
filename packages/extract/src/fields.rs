//! Per-tag field derivation.
//!
//! Every matched element gets the shared `tag`, `content`, and `raw_html`
//! values. Extra columns come from a [`FieldRegistry`] keyed by the rule's
//! declared tag, not by the matched element's own name, so a selector rule
//! declared as `a` derives `href` even when it matches something else.

use std::collections::BTreeMap;

use scraper::ElementRef;
use smart_scraper_extract_models::ExtractedRecord;

/// Derives tag-specific fields for one element into its record.
pub type FieldDeriver = fn(ElementRef<'_>, &mut ExtractedRecord);

/// Lookup table from declared tag to [`FieldDeriver`].
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    derivers: BTreeMap<String, FieldDeriver>,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::empty()
            .with("a", link_fields)
            .with("img", image_fields)
            .with("input", form_control_fields)
            .with("button", form_control_fields)
            .with("select", form_control_fields)
            .with("meta", meta_fields)
            .with("tr", row_fields)
            .with("th", cell_fields)
            .with("td", cell_fields)
    }
}

impl FieldRegistry {
    /// A registry that derives nothing beyond the shared fields.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            derivers: BTreeMap::new(),
        }
    }

    /// Registers `deriver` for `tag`, replacing any existing entry.
    pub fn register(&mut self, tag: &str, deriver: FieldDeriver) {
        self.derivers.insert(tag.to_ascii_lowercase(), deriver);
    }

    /// Builder-style [`Self::register`].
    #[must_use]
    pub fn with(mut self, tag: &str, deriver: FieldDeriver) -> Self {
        self.register(tag, deriver);
        self
    }

    /// Normalizes `element` into a record keyed by `declared_tag`.
    #[must_use]
    pub fn extract(&self, element: ElementRef<'_>, declared_tag: &str) -> ExtractedRecord {
        let mut record =
            ExtractedRecord::new(declared_tag, visible_text(element), element.html());

        if let Some(derive) = self.derivers.get(&declared_tag.to_ascii_lowercase()) {
            derive(element, &mut record);
        }

        record
    }
}

/// Descendant text with whitespace runs collapsed and ends trimmed.
#[must_use]
pub fn visible_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn attr(element: ElementRef<'_>, name: &str) -> String {
    element.value().attr(name).unwrap_or_default().to_owned()
}

fn link_fields(element: ElementRef<'_>, record: &mut ExtractedRecord) {
    record.set_field("href", attr(element, "href"));
    record.set_field("link_text", record.content.clone());
}

fn image_fields(element: ElementRef<'_>, record: &mut ExtractedRecord) {
    record.set_field("src", attr(element, "src"));
    record.set_field("alt", attr(element, "alt"));
}

fn form_control_fields(element: ElementRef<'_>, record: &mut ExtractedRecord) {
    record.set_field("name", attr(element, "name"));
    record.set_field("value", attr(element, "value"));
    record.set_field("type", attr(element, "type"));
}

/// Meta elements have no visible text; their `content` attribute is the
/// record's content.
fn meta_fields(element: ElementRef<'_>, record: &mut ExtractedRecord) {
    record.set_field("name", attr(element, "name"));
    record.content = attr(element, "content");
}

fn inside_table(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == "table")
}

fn row_fields(element: ElementRef<'_>, record: &mut ExtractedRecord) {
    if !inside_table(element) {
        return;
    }
    let preceding = element
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|s| s.value().name() == "tr")
        .count();
    record.set_field("row_index", (preceding + 1).to_string());
}

fn cell_fields(element: ElementRef<'_>, record: &mut ExtractedRecord) {
    if !inside_table(element) {
        return;
    }
    let preceding = element.prev_siblings().filter_map(ElementRef::wrap).count();
    record.set_field("column_index", (preceding + 1).to_string());
}
