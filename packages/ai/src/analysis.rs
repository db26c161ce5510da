//! Prompt construction for scraped-table analysis.

use serde::{Deserialize, Serialize};
use smart_scraper_extract_models::ResultTable;

use crate::AiError;
use crate::providers::LlmProvider;

/// Rows sent to the model by default.
pub const DEFAULT_MAX_ROWS: usize = 20;

/// Prompt length, in characters, above which the prompt is cut.
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 8000;

/// Appended to a prompt that was cut short.
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// Widest a rendered cell may be before it is elided.
const MAX_CELL_CHARS: usize = 50;

const ANALYSIS_INSTRUCTION: &str =
    "Analyze this data extracted from a web page. Give a useful summary and identify patterns:";

/// Bounds on how much of a table is sent to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Leading rows included in the prompt.
    pub max_rows: usize,
    /// Hard cap on prompt length in characters.
    pub max_prompt_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
        }
    }
}

/// Renders the first `max_rows` rows of `table` as a column-aligned text
/// table with a leading row index. Missing values print as `None`.
#[must_use]
pub fn render_table(table: &ResultTable, max_rows: usize) -> String {
    let shown = table.head(max_rows);
    let columns = shown.columns();

    let cells: Vec<Vec<String>> = shown
        .rows()
        .iter()
        .map(|row| {
            row.values
                .iter()
                .map(|value| value.as_deref().map_or_else(|| "None".to_string(), render_cell))
                .collect()
        })
        .collect();

    let index_width = shown.len().saturating_sub(1).to_string().len();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or_default()
        })
        .collect();

    let mut lines = Vec::with_capacity(cells.len() + 1);
    lines.push(render_line(&" ".repeat(index_width), columns, &widths));
    for (i, row) in cells.iter().enumerate() {
        lines.push(render_line(&format!("{i:>index_width$}"), row, &widths));
    }
    lines.join("\n")
}

fn render_line(index: &str, cells: &[String], widths: &[usize]) -> String {
    let mut line = index.to_string();
    for (cell, width) in cells.iter().zip(widths) {
        line.push_str("  ");
        line.push_str(cell);
        line.push_str(&" ".repeat(width - cell.chars().count()));
    }
    line.trim_end().to_string()
}

fn render_cell(value: &str) -> String {
    let flat = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > MAX_CELL_CHARS {
        let mut cut: String = flat.chars().take(MAX_CELL_CHARS - 3).collect();
        cut.push_str("...");
        cut
    } else {
        flat
    }
}

/// Cuts `prompt` to `max_chars` characters, appending
/// [`TRUNCATION_MARKER`] when anything was removed.
#[must_use]
pub fn truncate_prompt(prompt: &str, max_chars: usize) -> String {
    if prompt.chars().count() <= max_chars {
        return prompt.to_string();
    }
    let mut cut: String = prompt.chars().take(max_chars).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

/// Builds the analysis prompt for `table`.
///
/// # Errors
///
/// Returns [`AiError::NoData`] if `table` has no rows.
pub fn build_analysis_prompt(table: &ResultTable, config: &AnalysisConfig) -> Result<String, AiError> {
    if table.is_empty() {
        return Err(AiError::NoData);
    }

    let mut prompt = format!(
        "{ANALYSIS_INSTRUCTION}\n\n{}",
        render_table(table, config.max_rows)
    );
    if table.len() > config.max_rows {
        prompt.push_str(&format!("\n\n({} of {} rows shown)", config.max_rows, table.len()));
    }

    Ok(truncate_prompt(&prompt, config.max_prompt_chars))
}

/// Asks `provider` to summarize `table` and point out patterns.
///
/// # Errors
///
/// Returns [`AiError::NoData`] for an empty table, otherwise whatever the
/// provider returns.
pub async fn analyze_table(
    provider: &dyn LlmProvider,
    model: &str,
    table: &ResultTable,
    config: &AnalysisConfig,
) -> Result<String, AiError> {
    let prompt = build_analysis_prompt(table, config)?;
    log::info!(
        "Analyzing {} rows with {} model {model}",
        table.len().min(config.max_rows),
        provider.kind()
    );
    provider.complete(&prompt, model).await
}

/// Forwards a free-text question to `provider`.
///
/// # Errors
///
/// Returns [`AiError::Config`] for a blank question, otherwise whatever
/// the provider returns.
pub async fn ask(provider: &dyn LlmProvider, model: &str, question: &str) -> Result<String, AiError> {
    if question.trim().is_empty() {
        return Err(AiError::Config {
            message: "Question is empty".to_string(),
        });
    }
    provider.complete(question, model).await
}
