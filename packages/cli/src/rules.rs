//! Parsing of URLs and rule arguments given on the command line.

use std::path::Path;

use smart_scraper_extract_models::{CUSTOM_TAG, ExtractionRule, RuleSet};
use url::Url;

/// Accepts only absolute `http`/`https` URLs with a host.
///
/// # Errors
///
/// Returns a message describing why `input` was rejected.
pub fn validate_url(input: &str) -> Result<Url, String> {
    let url = Url::parse(input.trim()).map_err(|e| format!("Invalid URL '{input}': {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!(
            "Invalid URL '{input}': scheme must be http or https, not {}",
            url.scheme()
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(format!("Invalid URL '{input}': missing host"));
    }
    Ok(url)
}

/// Parses `tag[.class[.class]][#id]`.
///
/// ```text
/// a                 every link
/// div.product.card  divs carrying both classes
/// section#main      the section with id "main"
/// ```
///
/// # Errors
///
/// Returns a message if the tag is missing or a segment is empty.
pub fn parse_rule_arg(arg: &str) -> Result<ExtractionRule, String> {
    let arg = arg.trim();
    let split = arg.find(['.', '#']).unwrap_or(arg.len());
    let (tag, mut rest) = arg.split_at(split);
    if tag.is_empty() {
        return Err(format!("Rule '{arg}' needs a tag before any class or id"));
    }

    let mut classes: Vec<&str> = Vec::new();
    let mut id = "";
    while let Some(marker) = rest.chars().next() {
        let body = &rest[1..];
        let end = body.find(['.', '#']).unwrap_or(body.len());
        let value = &body[..end];
        if value.is_empty() {
            return Err(format!("Rule '{arg}' has an empty '{marker}' segment"));
        }
        if marker == '.' {
            classes.push(value);
        } else if id.is_empty() {
            id = value;
        } else {
            return Err(format!("Rule '{arg}' has more than one id"));
        }
        rest = &body[end..];
    }

    Ok(ExtractionRule::new(tag)
        .with_class(&classes.join(" "))
        .with_id(id))
}

/// Parses `tag=css selector`. A bare selector with no `=` is filed under
/// the `custom` tag.
///
/// # Errors
///
/// Returns a message if the tag or selector is empty.
pub fn parse_selector_arg(arg: &str) -> Result<ExtractionRule, String> {
    let (tag, selector) = arg
        .split_once('=')
        .map_or((CUSTOM_TAG, arg), |(tag, selector)| (tag.trim(), selector));
    if tag.is_empty() || selector.trim().is_empty() {
        return Err(format!("Selector '{arg}' must look like tag=css"));
    }
    Ok(ExtractionRule::new(tag).with_selector(selector))
}

/// Reads a rule set from a JSON file shaped like
/// `{"a": {"class": "", "id": "", "selector": ""}}`.
///
/// # Errors
///
/// Returns a message if the file cannot be read or parsed.
pub fn read_rules_file(path: &Path) -> Result<RuleSet, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read rules file {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("Invalid rules file {}: {e}", path.display()))
}

/// Layers rule sources in order: `base` (template or file), then `--rule`
/// arguments, then `--selector` arguments. Later rules replace earlier
/// rules with the same tag.
///
/// # Errors
///
/// Returns the first argument that fails to parse.
pub fn merge_rules(base: RuleSet, rule_args: &[String], selector_args: &[String]) -> Result<RuleSet, String> {
    let mut rules = base;
    for arg in rule_args {
        rules.insert(parse_rule_arg(arg)?);
    }
    for arg in selector_args {
        rules.insert(parse_selector_arg(arg)?);
    }
    Ok(rules)
}

/// One-line description of a rule.
#[must_use]
pub fn describe_rule(rule: &ExtractionRule) -> String {
    if let Some(selector) = rule.css_selector() {
        return format!("{:<10} selector: {selector}", rule.tag);
    }
    let mut parts = vec![format!("<{}>", rule.tag)];
    if let Some(class) = rule.class_filter() {
        parts.push(format!("class='{class}'"));
    }
    if let Some(id) = rule.id_filter() {
        parts.push(format!("id='{id}'"));
    }
    format!("{:<10} {}", rule.tag, parts.join(" "))
}
