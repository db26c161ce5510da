//! Subcommand handlers shared by the argument-driven and interactive
//! front ends.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use smart_scraper_acquire::{Acquirer, AcquisitionMode};
use smart_scraper_ai::{AnalysisConfig, LlmProvider, ProviderKind, create_provider_from_env};
use smart_scraper_cli_utils::{MultiProgress, Spinner};
use smart_scraper_extract::ExtractionOutcome;
use smart_scraper_extract_models::{ResultTable, RuleSet};
use smart_scraper_projects::{
    ExportFormat, ProjectDraft, ProjectStore, Template, TemplateStore, export_to_path, write_csv,
    write_json,
};

use crate::config::AppConfig;
use crate::output::{PREVIEW_ROWS, print_raw_html, print_rule_errors, print_rules, print_table, shorten};
use crate::rules::{merge_rules, read_rules_file, validate_url};

/// Boxed error used by every handler.
pub type CliError = Box<dyn std::error::Error>;

/// How `scrape` prints its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table.
    #[default]
    Table,
    /// Comma-separated values.
    Csv,
    /// Array of row objects.
    Json,
}

/// Options for one `scrape` run.
#[derive(Debug, Clone, Default)]
pub struct ScrapeRequest {
    /// Page to scrape.
    pub url: String,
    /// `tag[.class][#id]` rules.
    pub rules: Vec<String>,
    /// `tag=css` rules.
    pub selectors: Vec<String>,
    /// Template providing base rules and settings.
    pub template: Option<String>,
    /// JSON rule-set file providing base rules.
    pub rules_file: Option<PathBuf>,
    /// Force browser rendering.
    pub dynamic: bool,
    /// Settle time override.
    pub settle: Option<u64>,
    /// Output format.
    pub format: OutputFormat,
    /// Write output here instead of stdout.
    pub output: Option<PathBuf>,
    /// Save the rules and the rows kept by the filters as a project with
    /// this name.
    pub save_project: Option<String>,
    /// Print each row's markup.
    pub show_html: bool,
    /// Only keep rows with these tags.
    pub tags: Vec<String>,
    /// Only keep rows whose content contains this text.
    pub search: Option<String>,
}

/// Settings and shared terminal state for one invocation.
pub struct App {
    /// Loaded configuration.
    pub config: AppConfig,
    /// Progress area all spinners attach to.
    pub multi: MultiProgress,
}

impl App {
    /// Bundles `config` with the terminal's progress area.
    #[must_use]
    pub const fn new(config: AppConfig, multi: MultiProgress) -> Self {
        Self { config, multi }
    }

    /// An acquirer using the configured HTTP settings.
    #[must_use]
    pub fn acquirer(&self) -> Acquirer {
        Acquirer::new(self.config.acquire_config())
    }

    /// Built-in and custom templates.
    #[must_use]
    pub fn templates(&self) -> TemplateStore {
        TemplateStore::in_data_dir(&self.config.data_dir)
    }

    /// Saved projects.
    #[must_use]
    pub fn projects(&self) -> ProjectStore {
        ProjectStore::in_data_dir(&self.config.data_dir)
    }

    /// Prompt bounds for analysis.
    #[must_use]
    pub const fn analysis_config(&self) -> AnalysisConfig {
        self.config.ai.limits
    }

    /// Resolves a provider and model from explicit choices, falling back
    /// to the config file and then the provider's default model.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown provider or a missing API key.
    pub fn provider(
        &self,
        provider: Option<&str>,
        model: Option<&str>,
    ) -> Result<(Box<dyn LlmProvider>, String), CliError> {
        let kind = match provider {
            Some(name) => {
                ProviderKind::from_str(name).map_err(|_| format!("Unknown AI provider '{name}'"))?
            }
            None => self.config.provider()?,
        };
        let model = model
            .map(str::to_string)
            .or_else(|| {
                // Configured model only applies to the configured provider.
                provider.is_none().then(|| self.config.ai.model.clone()).flatten()
            })
            .unwrap_or_else(|| kind.default_model().to_string());

        Ok((create_provider_from_env(kind)?, model))
    }

    /// Runs `rules` against `url` behind a spinner.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be acquired.
    pub async fn run_rules(
        &self,
        url: &str,
        rules: &RuleSet,
        mode: AcquisitionMode,
    ) -> Result<ExtractionOutcome, CliError> {
        let label = match mode {
            AcquisitionMode::Static => format!("Fetching {url}"),
            AcquisitionMode::Dynamic { settle } => {
                format!("Rendering {url} (waiting {}s)", settle.as_secs())
            }
        };
        let spinner = Spinner::start(&self.multi, &label);
        let result = self.acquirer().scrape(url, rules, mode).await;
        spinner.finish_and_clear();

        let outcome = result?;
        log::info!(
            "Extracted {} rows from {url} ({} rule errors)",
            outcome.table.len(),
            outcome.rule_errors.len()
        );
        Ok(outcome)
    }

    /// Sends `table` to an LLM behind a spinner.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be created or the request
    /// fails.
    pub async fn analyze(
        &self,
        table: &ResultTable,
        provider: Option<&str>,
        model: Option<&str>,
    ) -> Result<String, CliError> {
        let (provider, model) = self.provider(provider, model)?;
        let spinner = Spinner::start(
            &self.multi,
            &format!("Analyzing with {} ({model})", provider.kind().label()),
        );
        let result =
            smart_scraper_ai::analyze_table(provider.as_ref(), &model, table, &self.analysis_config()).await;
        spinner.finish_and_clear();
        Ok(result?)
    }
}

// ---------------------------------------------------------------------------
// scrape
// ---------------------------------------------------------------------------

/// Validates the request, scrapes, filters, and emits results.
///
/// # Errors
///
/// Returns an error for invalid input, acquisition failure, or output
/// failure.
pub async fn scrape(app: &App, request: ScrapeRequest) -> Result<(), CliError> {
    let url = validate_url(&request.url)?;

    let template = request
        .template
        .as_deref()
        .map(|id| {
            app.templates()
                .get(id)
                .ok_or_else(|| format!("Template not found: {id}"))
        })
        .transpose()?;

    let base = match (&template, &request.rules_file) {
        (Some(template), None) => template.rules.clone(),
        (None, Some(path)) => read_rules_file(path)?,
        (Some(_), Some(_)) => return Err("Use either --template or --rules-file, not both".into()),
        (None, None) => RuleSet::new(),
    };
    let rules = merge_rules(base, &request.rules, &request.selectors)?;
    if rules.is_empty() {
        return Err("No rules given; use --rule, --selector, --template or --rules-file".into());
    }

    let use_dynamic = request.dynamic || template.as_ref().is_some_and(|t| t.use_dynamic);
    let settle = request
        .settle
        .or_else(|| template.as_ref().map(|t| t.settle_seconds))
        .unwrap_or_else(|| app.config.settle_seconds());
    let mode = AcquisitionMode::from_settings(use_dynamic, settle);

    let outcome = app.run_rules(url.as_str(), &rules, mode).await?;
    print_rule_errors(&outcome.rule_errors);

    let table = outcome.table.filter(&request.tags, request.search.as_deref());
    if table.len() != outcome.table.len() {
        log::info!("Filters kept {} of {} rows", table.len(), outcome.table.len());
    }

    emit(&table, request.format, request.output.as_deref())?;
    if request.show_html {
        print_raw_html(&table);
    }

    if let Some(name) = request.save_project {
        let draft = ProjectDraft {
            name,
            url: url.to_string(),
            rule_set: rules,
            use_dynamic,
            settle_seconds: settle,
        };
        let id = app.projects().save(&draft, Some(&table))?;
        eprintln!("Saved project {id}");
    }

    Ok(())
}

fn emit(table: &ResultTable, format: OutputFormat, output: Option<&Path>) -> Result<(), CliError> {
    if let Some(path) = output {
        let export = match format {
            OutputFormat::Csv => ExportFormat::Csv,
            OutputFormat::Json => ExportFormat::Json,
            OutputFormat::Table => ExportFormat::from_path(path).ok_or_else(|| {
                format!(
                    "Cannot tell the format of {}; use --format csv or --format json",
                    path.display()
                )
            })?,
        };
        export_to_path(table, path, export)?;
        eprintln!("Wrote {} rows to {}", table.len(), path.display());
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    match format {
        OutputFormat::Table => print_table(table, table.len()),
        OutputFormat::Csv => write_csv(table, &mut stdout)?,
        OutputFormat::Json => {
            write_json(table, &mut stdout)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// detect
// ---------------------------------------------------------------------------

/// Classifies a page and prints the suggested rules, optionally saving
/// them as a template.
///
/// # Errors
///
/// Returns an error for an invalid URL, a failed fetch, or a failed save.
pub async fn detect(app: &App, url: &str, save_template: Option<&str>) -> Result<(), CliError> {
    let url = validate_url(url)?;

    let spinner = Spinner::start(&app.multi, &format!("Analyzing {url}"));
    let classification = smart_scraper_detect::classify_and_suggest(&app.acquirer(), url.as_str()).await;
    spinner.finish_and_clear();

    if let Some(error) = classification.error {
        return Err(format!("Auto-detect failed: {error}").into());
    }

    println!("Page type: {}", classification.category);
    println!("Suggested rules:");
    print_rules(&classification.rules);

    if let Some(id) = save_template {
        let template = Template {
            id: String::new(),
            name: id.to_string(),
            description: format!("Suggested for {} page {url}", classification.category),
            rules: classification.rules,
            use_dynamic: false,
            settle_seconds: app.config.settle_seconds(),
        };
        let id = app.templates().save(id, &template)?;
        println!("Saved template {id}");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// analyze / ask
// ---------------------------------------------------------------------------

/// Loads results from a project or a `results.json` file and prints the
/// model's analysis.
///
/// # Errors
///
/// Returns an error if no results can be loaded or the model call fails.
pub async fn analyze(
    app: &App,
    project: Option<&str>,
    input: Option<&Path>,
    provider: Option<&str>,
    model: Option<&str>,
) -> Result<(), CliError> {
    let table = match (project, input) {
        (Some(id), None) => app
            .projects()
            .load(id)?
            .results
            .ok_or_else(|| format!("Project {id} has no saved results"))?,
        (None, Some(path)) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        _ => return Err("Give exactly one of --project or --input".into()),
    };

    let answer = app.analyze(&table, provider, model).await?;
    println!("{answer}");
    Ok(())
}

/// Sends a free-text question and prints the answer.
///
/// # Errors
///
/// Returns an error if the provider cannot be created or the call fails.
pub async fn ask(app: &App, question: &str, provider: Option<&str>, model: Option<&str>) -> Result<(), CliError> {
    let (provider, model) = app.provider(provider, model)?;
    let spinner = Spinner::start(&app.multi, &format!("Asking {}", provider.kind().label()));
    let result = smart_scraper_ai::ask(provider.as_ref(), &model, question).await;
    spinner.finish_and_clear();

    println!("{}", result?);
    Ok(())
}

// ---------------------------------------------------------------------------
// templates
// ---------------------------------------------------------------------------

/// Prints every template.
pub fn list_templates(app: &App) {
    let store = app.templates();
    let templates = store.all();

    println!("{:<24} {:<28} {:<8} {:<6} SOURCE", "ID", "NAME", "MODE", "RULES");
    println!("{}", "-".repeat(80));
    for template in &templates {
        let source = if smart_scraper_projects::templates::is_builtin(&template.id) {
            "built-in"
        } else {
            "custom"
        };
        println!(
            "{:<24} {:<28} {:<8} {:<6} {source}",
            template.id,
            shorten(&template.name, 28),
            mode_label(template.use_dynamic),
            template.rules.len(),
        );
    }
    println!("\n{} template(s)", templates.len());
}

/// Prints one template in full.
///
/// # Errors
///
/// Returns an error if there is no such template.
pub fn show_template(app: &App, id: &str) -> Result<(), CliError> {
    let template = app
        .templates()
        .get(id)
        .ok_or_else(|| format!("Template not found: {id}"))?;

    println!("{} ({})", template.name, template.id);
    if !template.description.is_empty() {
        println!("{}", template.description);
    }
    println!(
        "Mode: {} (settle {}s)",
        mode_label(template.use_dynamic),
        template.settle_seconds
    );
    println!("Rules:");
    print_rules(&template.rules);
    Ok(())
}

/// Deletes a custom template.
///
/// # Errors
///
/// Returns an error for built-in or unknown ids.
pub fn delete_template(app: &App, id: &str) -> Result<(), CliError> {
    app.templates().delete(id)?;
    println!("Deleted template: {id}");
    Ok(())
}

// ---------------------------------------------------------------------------
// projects
// ---------------------------------------------------------------------------

/// Prints every saved project, most recently updated first.
pub fn list_projects(app: &App) {
    let projects = app.projects().list();
    if projects.is_empty() {
        println!("No projects found.");
        return;
    }

    println!("{:<40} {:<24} {:<20} RESULTS", "ID", "NAME", "UPDATED");
    println!("{}", "-".repeat(95));
    for project in &projects {
        println!(
            "{:<40} {:<24} {:<20} {}",
            project.id,
            shorten(&project.name, 24),
            project.last_updated.format("%Y-%m-%d %H:%M:%S"),
            if project.has_results { "yes" } else { "no" }
        );
    }
    println!("\n{} project(s)", projects.len());
}

/// Prints a project's settings, rules, and a preview of its results.
///
/// # Errors
///
/// Returns an error if the project cannot be loaded.
pub fn show_project(app: &App, id: &str) -> Result<(), CliError> {
    let project = app.projects().load(id)?;
    let config = &project.config;

    println!("{} ({})", config.name, project.id);
    println!("URL: {}", config.url);
    println!(
        "Mode: {} (settle {}s)",
        mode_label(config.use_dynamic),
        config.settle_seconds
    );
    println!("Created: {}", config.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Updated: {}", config.last_updated.format("%Y-%m-%d %H:%M:%S"));
    println!("Rules:");
    print_rules(&config.rule_set);

    if let Some(results) = &project.results {
        println!();
        print_table(results, PREVIEW_ROWS);
    }
    Ok(())
}

/// Deletes a project.
///
/// # Errors
///
/// Returns an error if the project does not exist or cannot be removed.
pub fn delete_project(app: &App, id: &str) -> Result<(), CliError> {
    app.projects().delete(id)?;
    println!("Deleted project: {id}");
    Ok(())
}

/// `static` or `dynamic`.
#[must_use]
pub const fn mode_label(use_dynamic: bool) -> &'static str {
    if use_dynamic { "dynamic" } else { "static" }
}
