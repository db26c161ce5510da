//! Terminal rendering of tables, rules, and listings.

use smart_scraper_ai::analysis::render_table;
use smart_scraper_extract::RuleError;
use smart_scraper_extract_models::{CONTENT_COLUMN, ResultTable, RuleSet, TAG_COLUMN};

use crate::rules::describe_rule;

/// Rows shown when previewing results.
pub const PREVIEW_ROWS: usize = 20;

/// Prints up to `limit` rows of `table` followed by a row count.
pub fn print_table(table: &ResultTable, limit: usize) {
    if table.is_empty() {
        println!("No results.");
        return;
    }

    println!("{}", render_table(table, limit));
    if table.len() > limit {
        println!("\nShowing {limit} of {} rows", table.len());
    } else {
        println!("\n{} row(s)", table.len());
    }
}

/// Prints every row's source markup under a short heading.
pub fn print_raw_html(table: &ResultTable) {
    for (i, row) in table.rows().iter().enumerate() {
        let tag = table.value(i, TAG_COLUMN).unwrap_or_default();
        let content = table.value(i, CONTENT_COLUMN).unwrap_or_default();
        println!("[{i}] {tag}: {}", shorten(content, 50));
        println!("{}\n", row.raw_html);
    }
}

/// Reports rules that could not be applied.
pub fn print_rule_errors(errors: &[RuleError]) {
    for err in errors {
        eprintln!("warning: {err}");
    }
}

/// Prints one line per rule.
pub fn print_rules(rules: &RuleSet) {
    if rules.is_empty() {
        println!("  (no rules)");
    }
    for rule in rules {
        println!("  {}", describe_rule(rule));
    }
}

/// Cuts `text` to `max` characters, marking the cut with `...`.
#[must_use]
pub fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorten_keeps_short_text() {
        assert_eq!(shorten("Weekly deals", 50), "Weekly deals");
    }

    #[test]
    fn shorten_marks_cut_text() {
        assert_eq!(shorten("abcdefghij", 8), "abcde...");
        assert_eq!(shorten("ááááá", 4), "á...");
    }
}
