#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core data types for the smart scraper extraction pipeline.
//!
//! A [`RuleSet`] maps tag names to [`ExtractionRule`]s. Running a rule set
//! against a page yields one [`ExtractedRecord`] per matched element, and the
//! records of a run are assembled into a rectangular [`ResultTable`].
//! Auto-detection produces a [`PageClassification`] whose suggested rules are
//! a plain [`RuleSet`] that feeds straight back into extraction.

pub mod table;

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

pub use table::{RAW_HTML_KEY, ResultTable, TableRow, TableShapeError};

/// Pseudo-tag for rules that are a bare CSS selector not tied to an element
/// name.
pub const CUSTOM_TAG: &str = "custom";

/// Column holding the rule key that produced a row.
pub const TAG_COLUMN: &str = "tag";

/// Column holding the trimmed visible text of a matched element.
pub const CONTENT_COLUMN: &str = "content";

/// Shortest settle time allowed for a rendered page.
pub const MIN_SETTLE_SECONDS: u64 = 1;

/// Longest settle time allowed for a rendered page.
pub const MAX_SETTLE_SECONDS: u64 = 10;

/// Settle time used when none is configured.
pub const DEFAULT_SETTLE_SECONDS: u64 = 3;

/// Clamps a settle time into the supported `1..=10` second range.
#[must_use]
pub fn clamp_settle_seconds(seconds: u64) -> u64 {
    seconds.clamp(MIN_SETTLE_SECONDS, MAX_SETTLE_SECONDS)
}

/// One user-specified matcher.
///
/// Empty filter strings impose no constraint. A non-empty `css_selector`
/// replaces tag, class, and id matching entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRule {
    /// Element tag name, or [`CUSTOM_TAG`]. Unique within a rule set.
    pub tag: String,
    /// Class token(s) the element must carry.
    #[serde(default, rename = "class")]
    pub class_filter: String,
    /// Exact id the element must carry.
    #[serde(default, rename = "id")]
    pub id_filter: String,
    /// Raw CSS selector.
    #[serde(default, rename = "selector")]
    pub css_selector: String,
}

impl ExtractionRule {
    /// Creates an unconstrained rule for `tag`.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.trim().to_owned(),
            ..Self::default()
        }
    }

    /// Sets the class filter.
    #[must_use]
    pub fn with_class(mut self, class: &str) -> Self {
        class.trim().clone_into(&mut self.class_filter);
        self
    }

    /// Sets the id filter.
    #[must_use]
    pub fn with_id(mut self, id: &str) -> Self {
        id.trim().clone_into(&mut self.id_filter);
        self
    }

    /// Sets the CSS selector.
    #[must_use]
    pub fn with_selector(mut self, selector: &str) -> Self {
        selector.trim().clone_into(&mut self.css_selector);
        self
    }

    /// The class filter, if one is set.
    #[must_use]
    pub fn class_filter(&self) -> Option<&str> {
        non_empty(&self.class_filter)
    }

    /// The id filter, if one is set.
    #[must_use]
    pub fn id_filter(&self) -> Option<&str> {
        non_empty(&self.id_filter)
    }

    /// The CSS selector, if one is set.
    #[must_use]
    pub fn css_selector(&self) -> Option<&str> {
        non_empty(&self.css_selector)
    }

    /// Whether this rule is the selector-only [`CUSTOM_TAG`] pseudo-tag.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.tag == CUSTOM_TAG
    }

    /// A rule can select something when it has a selector or names a real
    /// element.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.css_selector().is_some() || (!self.tag.is_empty() && !self.is_custom())
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// The filter half of a rule, as stored under its tag key.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RuleFilters {
    #[serde(default)]
    class: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    selector: String,
}

/// An insertion-ordered mapping from tag name to [`ExtractionRule`].
///
/// Serializes as `{"<tag>": {"class": "", "id": "", "selector": ""}}` with
/// keys in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<ExtractionRule>,
}

impl RuleSet {
    /// Creates an empty rule set.
    #[must_use]
    pub const fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Inserts a rule, replacing any existing rule for the same tag in place.
    ///
    /// Returns the replaced rule, if any.
    pub fn insert(&mut self, rule: ExtractionRule) -> Option<ExtractionRule> {
        if let Some(existing) = self.rules.iter_mut().find(|r| r.tag == rule.tag) {
            return Some(std::mem::replace(existing, rule));
        }
        self.rules.push(rule);
        None
    }

    /// Builder-style [`Self::insert`].
    #[must_use]
    pub fn with_rule(mut self, rule: ExtractionRule) -> Self {
        self.insert(rule);
        self
    }

    /// Removes the rule for `tag`.
    pub fn remove(&mut self, tag: &str) -> Option<ExtractionRule> {
        let index = self.rules.iter().position(|r| r.tag == tag)?;
        Some(self.rules.remove(index))
    }

    /// Looks up the rule for `tag`.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&ExtractionRule> {
        self.rules.iter().find(|r| r.tag == tag)
    }

    /// Whether a rule exists for `tag`.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    /// Iterates rules in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, ExtractionRule> {
        self.rules.iter()
    }

    /// Tag keys in insertion order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.tag.as_str())
    }

    /// Number of rules.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the rule set holds no rules.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<ExtractionRule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = ExtractionRule>>(iter: I) -> Self {
        let mut set = Self::new();
        for rule in iter {
            set.insert(rule);
        }
        set
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a ExtractionRule;
    type IntoIter = std::slice::Iter<'a, ExtractionRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl IntoIterator for RuleSet {
    type Item = ExtractionRule;
    type IntoIter = std::vec::IntoIter<ExtractionRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}

impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rules.len()))?;
        for rule in &self.rules {
            map.serialize_entry(
                &rule.tag,
                &RuleFilters {
                    class: rule.class_filter.clone(),
                    id: rule.id_filter.clone(),
                    selector: rule.css_selector.clone(),
                },
            )?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RuleSetVisitor;

        impl<'de> Visitor<'de> for RuleSetVisitor {
            type Value = RuleSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of tag names to rule filters")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RuleSet, A::Error> {
                let mut set = RuleSet::new();
                while let Some((tag, filters)) = access.next_entry::<String, RuleFilters>()? {
                    set.insert(
                        ExtractionRule::new(&tag)
                            .with_class(&filters.class)
                            .with_id(&filters.id)
                            .with_selector(&filters.selector),
                    );
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(RuleSetVisitor)
    }
}

/// One matched element's normalized output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedRecord {
    /// The rule key that matched this element.
    pub tag: String,
    /// Trimmed visible text.
    pub content: String,
    /// Serialized outer markup.
    pub raw_html: String,
    /// Tag-specific fields in derivation order.
    pub fields: Vec<(String, String)>,
}

impl ExtractedRecord {
    /// Creates a record with no tag-specific fields.
    #[must_use]
    pub fn new(tag: &str, content: String, raw_html: String) -> Self {
        Self {
            tag: tag.to_owned(),
            content,
            raw_html,
            fields: Vec::new(),
        }
    }

    /// Sets a tag-specific field, overwriting an earlier value of the same
    /// name.
    pub fn set_field(&mut self, name: &str, value: String) {
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name.to_owned(), value));
        }
    }

    /// Looks up a column value, including the `tag` and `content` columns.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            TAG_COLUMN => Some(&self.tag),
            CONTENT_COLUMN => Some(&self.content),
            _ => self
                .fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
        }
    }
}

/// Content categories recognised by the page classifier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PageCategory {
    /// Product listings and shops
    Ecommerce,
    /// Articles, blogs, and news
    News,
    /// Tabular data pages
    Data,
    /// Anything without a dominant signature
    General,
    /// The page could not be fetched
    Unknown,
}

/// The classifier's verdict for one page plus the rules it suggests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageClassification {
    /// Detected category.
    pub category: PageCategory,
    /// Suggested rules, usable directly as extraction input.
    pub rules: RuleSet,
    /// Failure detail; only set when `category` is
    /// [`PageCategory::Unknown`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageClassification {
    /// A successful classification.
    #[must_use]
    pub const fn new(category: PageCategory, rules: RuleSet) -> Self {
        Self {
            category,
            rules,
            error: None,
        }
    }

    /// The classification reported when the page could not be acquired.
    #[must_use]
    pub const fn failed(error: String) -> Self {
        Self {
            category: PageCategory::Unknown,
            rules: RuleSet::new(),
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_existing_tag_in_place() {
        let mut rules = RuleSet::new()
            .with_rule(ExtractionRule::new("h1"))
            .with_rule(ExtractionRule::new("p"));

        let replaced = rules.insert(ExtractionRule::new("h1").with_class("title"));

        assert_eq!(replaced, Some(ExtractionRule::new("h1")));
        assert_eq!(rules.tags().collect::<Vec<_>>(), ["h1", "p"]);
        assert_eq!(rules.get("h1").and_then(ExtractionRule::class_filter), Some("title"));
    }

    #[test]
    fn rule_set_serializes_in_insertion_order() {
        let rules = RuleSet::new()
            .with_rule(ExtractionRule::new("p"))
            .with_rule(ExtractionRule::new("a").with_selector("nav a"));

        let json = serde_json::to_string(&rules).unwrap();

        assert_eq!(
            json,
            r#"{"p":{"class":"","id":"","selector":""},"a":{"class":"","id":"","selector":"nav a"}}"#
        );
    }

    #[test]
    fn rule_set_deserializes_partial_filters() {
        let rules: RuleSet =
            serde_json::from_str(r#"{"div": {"class": "product"}, "a": {}}"#).unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules.tags().collect::<Vec<_>>(), ["div", "a"]);
        let div = rules.get("div").unwrap();
        assert_eq!(div.class_filter(), Some("product"));
        assert_eq!(div.id_filter(), None);
        assert_eq!(div.css_selector(), None);
    }

    #[test]
    fn custom_rule_needs_a_selector() {
        assert!(!ExtractionRule::new(CUSTOM_TAG).is_well_formed());
        assert!(ExtractionRule::new(CUSTOM_TAG).with_selector(".x").is_well_formed());
        assert!(ExtractionRule::new("a").is_well_formed());
    }

    #[test]
    fn set_field_overwrites() {
        let mut record = ExtractedRecord::new("a", "x".to_owned(), "<a>x</a>".to_owned());
        record.set_field("href", "/one".to_owned());
        record.set_field("href", "/two".to_owned());

        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.field("href"), Some("/two"));
        assert_eq!(record.field("tag"), Some("a"));
    }

    #[test]
    fn page_category_round_trips_lowercase() {
        assert_eq!(PageCategory::Ecommerce.to_string(), "ecommerce");
        assert_eq!("news".parse::<PageCategory>().unwrap(), PageCategory::News);
    }

    #[test]
    fn settle_seconds_are_clamped() {
        assert_eq!(clamp_settle_seconds(0), 1);
        assert_eq!(clamp_settle_seconds(5), 5);
        assert_eq!(clamp_settle_seconds(60), 10);
    }
}
