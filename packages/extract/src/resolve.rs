//! Turns one [`ExtractionRule`] into the elements it matches.

use scraper::{ElementRef, Html, Selector};
use smart_scraper_extract_models::ExtractionRule;

use crate::RuleError;

/// Finds every element matched by `rule`, in document order.
///
/// A non-empty CSS selector takes precedence over tag, class, and id
/// matching. Otherwise elements are matched by tag name and narrowed by the
/// class filter (every whitespace-separated token must be present) and the
/// id filter.
///
/// # Errors
///
/// Returns [`RuleError`] if the selector does not parse, the tag is not a
/// usable element name, or a custom rule has no selector.
pub fn resolve<'a>(rule: &ExtractionRule, document: &'a Html) -> Result<Vec<ElementRef<'a>>, RuleError> {
    if let Some(css) = rule.css_selector() {
        let selector = Selector::parse(css).map_err(|e| RuleError::InvalidSelector {
            tag: rule.tag.clone(),
            selector: css.to_owned(),
            message: e.to_string(),
        })?;
        return Ok(document.select(&selector).collect());
    }

    if !rule.is_well_formed() {
        return Err(RuleError::MissingSelector {
            tag: rule.tag.clone(),
        });
    }

    let selector = tag_selector(&rule.tag)?;
    let classes: Vec<&str> = rule
        .class_filter()
        .map(|c| c.split_whitespace().collect())
        .unwrap_or_default();
    let id = rule.id_filter();

    Ok(document
        .select(&selector)
        .filter(|el| matches_filters(*el, &classes, id))
        .collect())
}

/// Parses a bare element name into a type selector.
fn tag_selector(tag: &str) -> Result<Selector, RuleError> {
    let name = tag.to_ascii_lowercase();
    let valid = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid {
        return Err(RuleError::InvalidTag {
            tag: tag.to_owned(),
        });
    }

    Selector::parse(&name).map_err(|_| RuleError::InvalidTag {
        tag: tag.to_owned(),
    })
}

fn matches_filters(element: ElementRef<'_>, classes: &[&str], id: Option<&str>) -> bool {
    let value = element.value();

    if let Some(id) = id
        && value.id() != Some(id)
    {
        return false;
    }

    classes
        .iter()
        .all(|wanted| value.classes().any(|have| have == *wanted))
}
