//! Proposes extraction rules for a classified page.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use smart_scraper_extract_models::{ExtractionRule, PageCategory, RuleSet};

use crate::classify::ANY_ELEMENT;

/// Product containers folded into the suggested `div` selector.
const MAX_PRODUCT_SELECTORS: usize = 5;

/// Price elements folded into the suggested `span` selector.
const MAX_PRICE_SELECTORS: usize = 3;

/// How many frequent `tag.class` pairs may become rules.
const COMMON_CLASS_RULES: usize = 3;

static PRODUCT_CONTAINER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"product|item|card").expect("valid regex"));

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"price|cost|amount").expect("valid regex"));

/// Builds a rule set suited to `category`, then adds rules for the most
/// frequent `tag.class` pairs whose tag is not already covered.
#[must_use]
pub fn suggest_rules(document: &Html, category: PageCategory) -> RuleSet {
    let elements: Vec<ElementRef<'_>> = document.select(&ANY_ELEMENT).collect();

    let mut rules = match category {
        PageCategory::Ecommerce => ecommerce_rules(&elements),
        PageCategory::News => RuleSet::new()
            .with_rule(ExtractionRule::new("article").with_selector("article"))
            .with_rule(ExtractionRule::new("h1").with_selector("h1.title, h1.entry-title"))
            .with_rule(ExtractionRule::new("p").with_selector("p.entry-content, article p"))
            .with_rule(ExtractionRule::new("time").with_selector("time, .date, .published")),
        PageCategory::Data => ["table", "tr", "th", "td"]
            .into_iter()
            .map(|tag| ExtractionRule::new(tag).with_selector(tag))
            .collect(),
        PageCategory::General | PageCategory::Unknown => general_rules(&elements),
    };

    for selector in common_classes(&elements)
        .into_iter()
        .take(COMMON_CLASS_RULES)
    {
        let tag = selector.split('.').next().unwrap_or_default();
        if !rules.contains(tag) {
            rules.insert(ExtractionRule::new(tag).with_selector(&selector));
        }
    }

    rules
}

fn ecommerce_rules(elements: &[ElementRef<'_>]) -> RuleSet {
    let products = matching_selectors(
        elements
            .iter()
            .filter(|el| matches!(el.value().name(), "div" | "article" | "li")),
        &PRODUCT_CONTAINER_RE,
        MAX_PRODUCT_SELECTORS,
    );
    let prices = matching_selectors(elements.iter(), &PRICE_RE, MAX_PRICE_SELECTORS);

    RuleSet::new()
        .with_rule(
            ExtractionRule::new("div")
                .with_class("product")
                .with_selector(&or_default(&products, ".product, .product-item, .item")),
        )
        .with_rule(
            ExtractionRule::new("span")
                .with_class("price")
                .with_selector(&or_default(&prices, ".price, .product-price")),
        )
        .with_rule(ExtractionRule::new("img").with_selector("img.product-image, .product img"))
        .with_rule(ExtractionRule::new("a").with_selector("a.product-link, .product a"))
}

fn general_rules(elements: &[ElementRef<'_>]) -> RuleSet {
    let has = |names: &[&str]| elements.iter().any(|el| names.contains(&el.value().name()));

    let mut rules = RuleSet::new();
    if has(&["h1", "h2", "h3"]) {
        rules.insert(ExtractionRule::new("h1").with_selector("h1"));
    }
    if has(&["p"]) {
        rules.insert(ExtractionRule::new("p").with_selector("p"));
    }
    if has(&["a"]) {
        rules.insert(ExtractionRule::new("a").with_selector("a"));
    }
    rules
}

/// `tag.class1.class2` for the first `limit` distinct elements carrying a
/// class token that matches `pattern`.
fn matching_selectors<'a, 'b: 'a>(
    elements: impl Iterator<Item = &'a ElementRef<'b>>,
    pattern: &Regex,
    limit: usize,
) -> Vec<String> {
    let mut selectors: Vec<String> = Vec::new();
    for el in elements.filter(|el| el.value().classes().any(|c| pattern.is_match(c))) {
        let selector = element_selector(el);
        if !selectors.contains(&selector) {
            selectors.push(selector);
        }
        if selectors.len() == limit {
            break;
        }
    }
    selectors
}

fn element_selector(element: &ElementRef<'_>) -> String {
    let mut selector = element.value().name().to_owned();
    for class in element.value().classes() {
        selector.push('.');
        selector.push_str(class);
    }
    selector
}

fn or_default(selectors: &[String], fallback: &str) -> String {
    if selectors.is_empty() {
        fallback.to_owned()
    } else {
        selectors.join(", ")
    }
}

/// `tag.class` pairs ordered by frequency, ties in first-seen order.
fn common_classes(elements: &[ElementRef<'_>]) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for el in elements {
        for class in el.value().classes() {
            let key = format!("{}.{class}", el.value().name());
            if let Some(entry) = counts.iter_mut().find(|(k, _)| *k == key) {
                entry.1 += 1;
            } else {
                counts.push((key, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(key, _)| key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(rules: &RuleSet) -> Vec<&str> {
        rules.tags().collect()
    }

    #[test]
    fn news_rules_are_fixed() {
        let doc = Html::parse_document("<article><p>x</p></article>");
        let rules = suggest_rules(&doc, PageCategory::News);

        assert_eq!(tags(&rules), ["article", "h1", "p", "time"]);
        assert_eq!(
            rules.get("time").and_then(ExtractionRule::css_selector),
            Some("time, .date, .published")
        );
    }

    #[test]
    fn data_rules_select_table_parts() {
        let doc = Html::parse_document("<table><tr><td>1</td></tr></table>");
        let rules = suggest_rules(&doc, PageCategory::Data);

        assert_eq!(tags(&rules), ["table", "tr", "th", "td"]);
        assert_eq!(rules.get("td").and_then(ExtractionRule::css_selector), Some("td"));
    }

    #[test]
    fn ecommerce_rules_use_discovered_classes() {
        let doc = Html::parse_document(
            r#"<html><body>
                <li class="product-card featured"><span class="price">$1</span></li>
                <li class="product-card"><span class="price sale">$2</span></li>
                <section class="item">not a container</section>
            </body></html>"#,
        );
        let rules = suggest_rules(&doc, PageCategory::Ecommerce);

        let div = rules.get("div").unwrap();
        assert_eq!(div.class_filter(), Some("product"));
        assert_eq!(
            div.css_selector(),
            Some("li.product-card.featured, li.product-card")
        );
        assert_eq!(
            rules.get("span").and_then(ExtractionRule::css_selector),
            Some("span.price, span.price.sale")
        );
    }

    #[test]
    fn ecommerce_rules_fall_back_to_generic_selectors() {
        let doc = Html::parse_document("<p>nothing here</p>");
        let rules = suggest_rules(&doc, PageCategory::Ecommerce);

        assert_eq!(tags(&rules), ["div", "span", "img", "a"]);
        assert_eq!(
            rules.get("div").and_then(ExtractionRule::css_selector),
            Some(".product, .product-item, .item")
        );
        assert_eq!(
            rules.get("span").and_then(ExtractionRule::css_selector),
            Some(".price, .product-price")
        );
    }

    #[test]
    fn general_rules_depend_on_present_elements() {
        let doc = Html::parse_document("<h3>Heading</h3><a href='/'>x</a>");
        let rules = suggest_rules(&doc, PageCategory::General);
        assert_eq!(tags(&rules), ["h1", "a"]);
    }

    #[test]
    fn frequent_classes_add_rules_for_uncovered_tags() {
        let doc = Html::parse_document(
            r#"<p>x</p>
               <ul><li class="menu">a</li><li class="menu">b</li><li class="menu">c</li></ul>
               <p class="lead">y</p><p class="lead">z</p>
               <span class="badge">1</span>"#,
        );
        let rules = suggest_rules(&doc, PageCategory::General);

        assert_eq!(tags(&rules), ["p", "li", "span"]);
        assert_eq!(rules.get("li").and_then(ExtractionRule::css_selector), Some("li.menu"));
        assert_eq!(rules.get("p").and_then(ExtractionRule::css_selector), Some("p"));
        assert_eq!(
            rules.get("span").and_then(ExtractionRule::css_selector),
            Some("span.badge")
        );
    }
}
