#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Rule-driven extraction from parsed HTML.
//!
//! [`resolve`] turns each rule into matched elements, the [`FieldRegistry`]
//! normalizes every match into an [`ExtractedRecord`], and the
//! [`TableBuilder`] assembles the records into one rectangular
//! [`ResultTable`].
//!
//! A rule that fails to resolve contributes no rows. Its error is logged and
//! returned in [`ExtractionOutcome::rule_errors`]; the remaining rules still
//! run.
//!
//! [`ExtractedRecord`]: smart_scraper_extract_models::ExtractedRecord

pub mod builder;
pub mod fields;
pub mod resolve;

use scraper::Html;
use smart_scraper_extract_models::{ResultTable, RuleSet};

pub use builder::TableBuilder;
pub use fields::FieldRegistry;
pub use resolve::resolve;

/// Why a single rule produced no matches.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// The rule's CSS selector does not parse.
    #[error("invalid CSS selector '{selector}' for rule '{tag}': {message}")]
    InvalidSelector {
        /// Rule key.
        tag: String,
        /// The offending selector.
        selector: String,
        /// Parser message.
        message: String,
    },

    /// The rule key is not an element name and no selector was given.
    #[error("rule '{tag}' is not an element name; give it a CSS selector instead")]
    InvalidTag {
        /// Rule key.
        tag: String,
    },

    /// A custom rule with no selector.
    #[error("rule '{tag}' needs a CSS selector")]
    MissingSelector {
        /// Rule key.
        tag: String,
    },
}

impl RuleError {
    /// Key of the rule that failed.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::InvalidSelector { tag, .. }
            | Self::InvalidTag { tag }
            | Self::MissingSelector { tag } => tag,
        }
    }
}

/// The table produced by one run plus any per-rule failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionOutcome {
    /// Assembled records.
    pub table: ResultTable,
    /// Rules that could not be resolved, in rule-set order.
    pub rule_errors: Vec<RuleError>,
}

/// Runs rule sets against parsed documents.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    fields: FieldRegistry,
}

impl Extractor {
    /// An extractor using the built-in field derivations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An extractor using a custom field registry.
    #[must_use]
    pub const fn with_registry(fields: FieldRegistry) -> Self {
        Self { fields }
    }

    /// Applies every rule in order to `document`.
    #[must_use]
    pub fn extract_document(&self, document: &Html, rules: &RuleSet) -> ExtractionOutcome {
        let mut builder = TableBuilder::new();
        let mut rule_errors = Vec::new();

        for rule in rules {
            match resolve(rule, document) {
                Ok(elements) => {
                    log::debug!("Rule '{}' matched {} elements", rule.tag, elements.len());
                    builder.extend(
                        elements
                            .into_iter()
                            .map(|el| self.fields.extract(el, &rule.tag)),
                    );
                }
                Err(e) => {
                    log::warn!("Skipping rule '{}': {e}", rule.tag);
                    rule_errors.push(e);
                }
            }
        }

        log::info!(
            "Extracted {} records from {} rules ({} failed)",
            builder.len(),
            rules.len(),
            rule_errors.len()
        );

        ExtractionOutcome {
            table: builder.finish(),
            rule_errors,
        }
    }

    /// Parses `html` once and applies every rule to it.
    #[must_use]
    pub fn extract_html(&self, html: &str, rules: &RuleSet) -> ExtractionOutcome {
        if rules.is_empty() {
            return ExtractionOutcome::default();
        }
        let document = Html::parse_document(html);
        self.extract_document(&document, rules)
    }
}

/// [`Extractor::extract_html`] with the built-in field derivations.
#[must_use]
pub fn extract_html(html: &str, rules: &RuleSet) -> ExtractionOutcome {
    Extractor::new().extract_html(html, rules)
}

#[cfg(test)]
mod tests {
    use smart_scraper_extract_models::ExtractionRule;

    use super::*;

    const LINKS: &str = r#"
        <html><body>
            <nav>
                <a href="/">Home</a>
                <a href="/about">About us</a>
                <a href="https://example.com/contact">Contact</a>
            </nav>
            <h1>Welcome</h1>
            <p>First paragraph.</p>
        </body></html>
    "#;

    #[test]
    fn three_links_make_three_rows_with_link_columns() {
        let rules: RuleSet = [ExtractionRule::new("a")].into_iter().collect();

        let outcome = extract_html(LINKS, &rules);

        let table = outcome.table;
        assert_eq!(table.len(), 3);
        assert_eq!(table.columns(), ["tag", "content", "href", "link_text"]);
        assert_eq!(
            table.column_values("href"),
            [Some("/"), Some("/about"), Some("https://example.com/contact")]
        );
        assert_eq!(table.value(1, "link_text"), Some("About us"));
        assert!(outcome.rule_errors.is_empty());
    }

    #[test]
    fn empty_rule_set_yields_empty_table_with_base_schema() {
        let outcome = extract_html(LINKS, &RuleSet::new());
        assert!(outcome.table.is_empty());
        assert_eq!(outcome.table.columns(), ["tag", "content"]);
    }

    #[test]
    fn rows_follow_rule_set_order_and_tag_content_lead() {
        let rules: RuleSet = [
            ExtractionRule::new("p"),
            ExtractionRule::new("a"),
            ExtractionRule::new("h1"),
        ]
        .into_iter()
        .collect();

        let table = extract_html(LINKS, &rules).table;

        assert_eq!(&table.columns()[..2], ["tag", "content"]);
        assert_eq!(
            table.column_values("tag"),
            [Some("p"), Some("a"), Some("a"), Some("a"), Some("h1")]
        );
        assert_eq!(table.value(0, "href"), None);
        assert_eq!(table.value(4, "content"), Some("Welcome"));
    }

    #[test]
    fn failing_rule_does_not_abort_the_others() {
        let rules: RuleSet = [
            ExtractionRule::new("h1"),
            ExtractionRule::new("custom"),
            ExtractionRule::new("bad").with_selector("p[[["),
            ExtractionRule::new("p"),
        ]
        .into_iter()
        .collect();

        let outcome = extract_html(LINKS, &rules);

        assert_eq!(outcome.table.column_values("tag"), [Some("h1"), Some("p")]);
        assert_eq!(
            outcome
                .rule_errors
                .iter()
                .map(RuleError::tag)
                .collect::<Vec<_>>(),
            ["custom", "bad"]
        );
    }

    #[test]
    fn extraction_is_idempotent() {
        let rules: RuleSet = [ExtractionRule::new("a"), ExtractionRule::new("p")]
            .into_iter()
            .collect();

        assert_eq!(extract_html(LINKS, &rules), extract_html(LINKS, &rules));
    }

    #[test]
    fn selector_rule_keeps_declared_tag_as_key() {
        let rules: RuleSet = [ExtractionRule::new("custom").with_selector("nav a")]
            .into_iter()
            .collect();

        let table = extract_html(LINKS, &rules).table;

        assert_eq!(table.len(), 3);
        assert_eq!(table.value(0, "tag"), Some("custom"));
        assert_eq!(table.columns(), ["tag", "content"]);
    }
}
