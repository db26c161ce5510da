//! Scores a page against content-category vocabularies.
//!
//! Each category has a list of indicator words. Occurrences are counted
//! case-insensitively over every attribute value plus the page's text, and
//! structural elements add a fixed bonus. A category only wins with a score
//! strictly above both others.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use smart_scraper_extract_models::PageCategory;

/// Words that suggest a shop or product listing.
pub const ECOMMERCE_INDICATORS: &[&str] = &[
    "cart",
    "basket",
    "shop",
    "product",
    "price",
    "checkout",
    "add-to-cart",
    "buy",
    "purchase",
    "shopping",
    "store",
    "order",
    "payment",
];

/// Words that suggest articles or a blog.
pub const NEWS_INDICATORS: &[&str] = &[
    "article",
    "blog",
    "news",
    "post",
    "author",
    "date",
    "published",
    "editorial",
    "journalist",
    "reporter",
    "story",
    "opinion",
];

/// Words that suggest tabular data.
pub const DATA_INDICATORS: &[&str] = &["table", "data", "statistics", "chart", "dataset"];

/// Score added per structural element (`<table>`, `<article>`, product
/// container).
pub const STRUCTURE_BONUS: usize = 5;

static PRODUCT_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"product|item").expect("valid regex"));

pub(crate) static ANY_ELEMENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("*").expect("valid selector"));

/// Raw per-category scores for one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryScores {
    /// Shop signals.
    pub ecommerce: usize,
    /// Article signals.
    pub news: usize,
    /// Table signals.
    pub data: usize,
}

impl CategoryScores {
    /// The winning category, or [`PageCategory::General`] when no score is
    /// strictly greater than both others.
    #[must_use]
    pub const fn category(&self) -> PageCategory {
        let Self {
            ecommerce,
            news,
            data,
        } = *self;

        if ecommerce > news && ecommerce > data {
            PageCategory::Ecommerce
        } else if news > ecommerce && news > data {
            PageCategory::News
        } else if data > news && data > ecommerce {
            PageCategory::Data
        } else {
            PageCategory::General
        }
    }
}

/// Scores `document` against every category.
#[must_use]
pub fn score_document(document: &Html) -> CategoryScores {
    let elements: Vec<ElementRef<'_>> = document.select(&ANY_ELEMENT).collect();

    let mut haystack = elements
        .iter()
        .flat_map(|el| el.value().attrs().map(|(_, value)| value.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ");
    haystack.push(' ');
    haystack.push_str(&document.root_element().text().collect::<String>().to_lowercase());

    let count = |indicators: &[&str]| -> usize {
        indicators
            .iter()
            .map(|word| haystack.matches(word).count())
            .sum()
    };

    let named = |name: &str| elements.iter().filter(|el| el.value().name() == name).count();
    let product_elements = elements
        .iter()
        .filter(|el| el.value().classes().any(|c| PRODUCT_CLASS_RE.is_match(c)))
        .count();

    CategoryScores {
        ecommerce: count(ECOMMERCE_INDICATORS) + product_elements * STRUCTURE_BONUS,
        news: count(NEWS_INDICATORS) + named("article") * STRUCTURE_BONUS,
        data: count(DATA_INDICATORS) + named("table") * STRUCTURE_BONUS,
    }
}

/// Classifies `document` into a [`PageCategory`].
#[must_use]
pub fn classify_document(document: &Html) -> PageCategory {
    let scores = score_document(document);
    let category = scores.category();
    log::debug!("Category scores {scores:?} -> {category}");
    category
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_fall_back_to_general() {
        let scores = CategoryScores {
            ecommerce: 3,
            news: 7,
            data: 7,
        };
        assert_eq!(scores.category(), PageCategory::General);
        assert_eq!(CategoryScores::default().category(), PageCategory::General);
    }

    #[test]
    fn structural_bonus_counts_elements() {
        let doc = Html::parse_document(
            "<html><body><article><p>x</p></article><table><tr><td>1</td></tr></table></body></html>",
        );
        let scores = score_document(&doc);
        assert_eq!(scores.news, STRUCTURE_BONUS);
        assert_eq!(scores.data, STRUCTURE_BONUS);
        assert_eq!(scores.ecommerce, 0);
        assert_eq!(classify_document(&doc), PageCategory::General);
    }

    #[test]
    fn indicators_match_attributes_case_insensitively() {
        let doc = Html::parse_document(r#"<html><body><div data-role="SHOP">x</div></body></html>"#);
        assert_eq!(score_document(&doc).ecommerce, 1);
    }

    #[test]
    fn product_classes_earn_the_bonus_once_per_element() {
        let doc = Html::parse_document(
            r#"<html><body><div class="product item">a</div><li class="line-item">b</li></body></html>"#,
        );
        let scores = score_document(&doc);
        assert_eq!(scores.ecommerce, 1 + 2 * STRUCTURE_BONUS);
    }
}
