#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Auto-detection of page type and suggested extraction rules.
//!
//! [`classify`] scores a page against shop, news, and data vocabularies;
//! [`suggest`] turns the winning category into a [`RuleSet`] that can be
//! passed straight to extraction.
//!
//! [`RuleSet`]: smart_scraper_extract_models::RuleSet

pub mod classify;
pub mod suggest;

use scraper::Html;
use smart_scraper_acquire::{Acquirer, AcquisitionMode};
use smart_scraper_extract_models::PageClassification;

pub use classify::{CategoryScores, classify_document, score_document};
pub use suggest::suggest_rules;

/// Classifies already-fetched HTML and suggests rules for it.
#[must_use]
pub fn classify_html(html: &str) -> PageClassification {
    let document = Html::parse_document(html);
    let category = classify_document(&document);
    let rules = suggest_rules(&document, category);
    log::info!("Detected {category} page; suggesting {} rules", rules.len());
    PageClassification::new(category, rules)
}

/// Fetches `url` statically, classifies it, and suggests rules.
///
/// Acquisition failures are reported as an
/// [`Unknown`](smart_scraper_extract_models::PageCategory::Unknown)
/// classification carrying the error text.
pub async fn classify_and_suggest(acquirer: &Acquirer, url: &str) -> PageClassification {
    match acquirer.fetch_html(url, AcquisitionMode::Static).await {
        Ok(html) => classify_html(&html),
        Err(e) => {
            log::warn!("Auto-detect could not fetch {url}: {e}");
            PageClassification::failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use smart_scraper_extract_models::{ExtractionRule, PageCategory};

    use super::*;

    const NEWS_PAGE: &str = r#"<html><head><title>Daily Tribune</title></head><body>
        <article class="story">
            <h1 class="title">Council votes on budget</h1>
            <span class="author">By Ana</span>
            <time class="date">2024-05-01</time>
            <p>The council met on Monday.</p>
        </article>
        <article class="story">
            <h1 class="title">Rain expected</h1>
            <span class="author">By Ben</span>
            <time class="date">2024-05-02</time>
            <p>Bring an umbrella.</p>
        </article>
        <article class="story">
            <h1 class="title">Library reopens</h1>
            <span class="author">By Cy</span>
            <time class="date">2024-05-03</time>
            <p>Doors open at nine.</p>
        </article>
    </body></html>"#;

    const SHOP_PAGE: &str = r#"<html><body>
        <div class="cart">Cart (0)</div>
        <div class="product-card item"><span class="price">$10</span><a href="/p/1">Buy now</a></div>
        <div class="product-card item"><span class="price">$12</span><a href="/p/2">Buy now</a></div>
    </body></html>"#;

    const DATA_PAGE: &str = r#"<html><body>
        <h2>Population statistics</h2>
        <table class="stats">
            <tr><th>City</th><th>Residents</th></tr>
            <tr><td>Springfield</td><td>30,720</td></tr>
        </table>
    </body></html>"#;

    #[test]
    fn article_heavy_page_is_news() {
        let result = classify_html(NEWS_PAGE);

        assert_eq!(result.category, PageCategory::News);
        assert!(result.error.is_none());
        assert_eq!(
            result.rules.tags().take(4).collect::<Vec<_>>(),
            ["article", "h1", "p", "time"]
        );
    }

    #[test]
    fn classification_is_deterministic() {
        assert_eq!(classify_html(NEWS_PAGE), classify_html(NEWS_PAGE));
    }

    #[test]
    fn product_page_is_ecommerce() {
        let result = classify_html(SHOP_PAGE);

        assert_eq!(result.category, PageCategory::Ecommerce);
        assert_eq!(
            result.rules.get("div").and_then(ExtractionRule::css_selector),
            Some("div.product-card.item")
        );
        assert_eq!(
            result.rules.get("span").and_then(ExtractionRule::css_selector),
            Some("span.price")
        );
    }

    #[test]
    fn table_page_is_data() {
        let result = classify_html(DATA_PAGE);

        assert_eq!(result.category, PageCategory::Data);
        assert_eq!(
            result.rules.tags().collect::<Vec<_>>(),
            ["table", "tr", "th", "td"]
        );
    }

    #[test]
    fn suggestions_feed_back_into_extraction() {
        let result = classify_html(DATA_PAGE);
        let table = smart_scraper_extract::extract_html(DATA_PAGE, &result.rules).table;

        assert_eq!(table.column_values("tag").iter().filter(|t| **t == Some("td")).count(), 2);
        assert_eq!(table.value(0, "tag"), Some("table"));
    }

    #[tokio::test]
    async fn unreachable_page_is_unknown() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = classify_and_suggest(&Acquirer::default(), &format!("http://{addr}/")).await;

        assert_eq!(result.category, PageCategory::Unknown);
        assert!(result.rules.is_empty());
        assert!(result.error.unwrap().starts_with("Connection error"));
    }
}
