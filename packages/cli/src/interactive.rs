//! Menu-driven scraping session.
//!
//! Walks through URL entry, rule planning, acquisition mode, and a run,
//! then offers follow-up actions on the results using `dialoguer`.

use dialoguer::{Confirm, Input, MultiSelect, Select};
use smart_scraper_acquire::AcquisitionMode;
use smart_scraper_ai::ProviderKind;
use smart_scraper_cli_utils::Spinner;
use smart_scraper_extract_models::{
    CUSTOM_TAG, ExtractionRule, MAX_SETTLE_SECONDS, MIN_SETTLE_SECONDS, ResultTable, RuleSet,
    TAG_COLUMN,
};
use smart_scraper_projects::{ExportFormat, ProjectDraft, ProjectUpdate, Template, export_to_path};

use crate::commands::{
    App, CliError, delete_project, list_projects, list_templates, mode_label, show_project,
};
use crate::output::{PREVIEW_ROWS, print_raw_html, print_rule_errors, print_rules, print_table};
use crate::rules::validate_url;

/// Tag groups offered when picking rules by hand.
const TAG_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Structure",
        &["div", "main", "article", "section", "aside", "header", "footer", "nav"],
    ),
    (
        "Content",
        &["p", "span", "h1", "h2", "h3", "h4", "strong", "em", "time"],
    ),
    ("Lists & tables", &["ul", "ol", "li", "table", "tr", "td", "th"]),
    (
        "Media",
        &["img", "video", "audio", "source", "picture", "figure", "figcaption"],
    ),
    (
        "Interactive",
        &["a", "button", "form", "input", "select", "option", "label", "iframe"],
    ),
];

/// Top-level menu entries.
enum MainAction {
    Scrape,
    Projects,
    Templates,
    Ask,
    Quit,
}

impl MainAction {
    const ALL: &[Self] = &[
        Self::Scrape,
        Self::Projects,
        Self::Templates,
        Self::Ask,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Scrape => "Scrape a page",
            Self::Projects => "Open a saved project",
            Self::Templates => "List templates",
            Self::Ask => "Ask the AI a question",
            Self::Quit => "Quit",
        }
    }
}

/// Ways of deciding which rules to run.
enum RuleSource {
    PickTags,
    Template,
    AutoDetect,
    Selector,
}

impl RuleSource {
    const ALL: &[Self] = &[
        Self::PickTags,
        Self::Template,
        Self::AutoDetect,
        Self::Selector,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::PickTags => "Pick tags by category",
            Self::Template => "Use a template",
            Self::AutoDetect => "Auto-detect from the page",
            Self::Selector => "Enter a CSS selector",
        }
    }
}

/// Follow-ups offered after a run.
enum ResultAction {
    Filter,
    RawHtml,
    Export,
    SaveProject,
    SaveTemplate,
    Analyze,
    Done,
}

impl ResultAction {
    const ALL: &[Self] = &[
        Self::Filter,
        Self::RawHtml,
        Self::Export,
        Self::SaveProject,
        Self::SaveTemplate,
        Self::Analyze,
        Self::Done,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Filter => "Filter rows",
            Self::RawHtml => "Show raw HTML",
            Self::Export => "Export to CSV / JSON",
            Self::SaveProject => "Save as project",
            Self::SaveTemplate => "Save rules as template",
            Self::Analyze => "Analyze with AI",
            Self::Done => "Done",
        }
    }
}

/// Project menu entries.
enum ProjectAction {
    Rerun,
    Show,
    Delete,
    Back,
}

impl ProjectAction {
    const ALL: &[Self] = &[Self::Rerun, Self::Show, Self::Delete, Self::Back];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Rerun => "Run again and update results",
            Self::Show => "Show settings and saved results",
            Self::Delete => "Delete",
            Self::Back => "Back",
        }
    }
}

/// Everything needed to run (or re-run) a scrape.
struct Plan {
    url: String,
    rules: RuleSet,
    use_dynamic: bool,
    settle_seconds: u64,
}

impl Plan {
    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::from_settings(self.use_dynamic, self.settle_seconds)
    }
}

/// Runs the interactive menu until the user quits.
///
/// # Errors
///
/// Returns an error if a prompt fails. Failures of individual actions are
/// reported and the menu continues.
pub async fn run(app: &App) -> Result<(), CliError> {
    let labels: Vec<&str> = MainAction::ALL.iter().map(MainAction::label).collect();

    loop {
        let idx = Select::new()
            .with_prompt("Smart scraper")
            .items(&labels)
            .default(0)
            .interact()?;

        let result = match MainAction::ALL[idx] {
            MainAction::Scrape => handle_scrape(app).await,
            MainAction::Projects => handle_projects(app).await,
            MainAction::Templates => {
                list_templates(app);
                Ok(())
            }
            MainAction::Ask => handle_ask(app).await,
            MainAction::Quit => return Ok(()),
        };

        if let Err(e) = result {
            log::error!("{e}");
        }
        println!();
    }
}

// ---------------------------------------------------------------------------
// Scrape
// ---------------------------------------------------------------------------

async fn handle_scrape(app: &App) -> Result<(), CliError> {
    let url: String = Input::new()
        .with_prompt("URL")
        .validate_with(|input: &String| validate_url(input).map(|_| ()))
        .interact_text()?;
    let url = validate_url(&url)?.to_string();

    let Some(mut plan) = plan_rules(app, url).await? else {
        return Ok(());
    };
    if plan.rules.is_empty() {
        println!("No rules selected.");
        return Ok(());
    }

    println!("Rules:");
    print_rules(&plan.rules);
    choose_mode(&mut plan)?;

    let table = run_plan(app, &plan).await?;
    result_menu(app, &plan, &table).await
}

/// Builds a plan from the chosen rule source. Returns `None` when the user
/// backs out.
async fn plan_rules(app: &App, url: String) -> Result<Option<Plan>, CliError> {
    let mut plan = Plan {
        url,
        rules: RuleSet::new(),
        use_dynamic: false,
        settle_seconds: app.config.settle_seconds(),
    };

    let labels: Vec<&str> = RuleSource::ALL.iter().map(RuleSource::label).collect();
    let idx = Select::new()
        .with_prompt("How should rules be chosen?")
        .items(&labels)
        .default(0)
        .interact()?;

    match RuleSource::ALL[idx] {
        RuleSource::PickTags => plan.rules = pick_tags()?,
        RuleSource::Template => {
            let Some(template) = pick_template(app)? else {
                return Ok(None);
            };
            plan.rules = template.rules;
            plan.use_dynamic = template.use_dynamic;
            plan.settle_seconds = template.settle_seconds;
        }
        RuleSource::AutoDetect => {
            let spinner = Spinner::start(&app.multi, &format!("Analyzing {}", plan.url));
            let classification =
                smart_scraper_detect::classify_and_suggest(&app.acquirer(), &plan.url).await;
            spinner.finish_and_clear();

            if let Some(error) = classification.error {
                return Err(format!("Auto-detect failed: {error}").into());
            }
            println!("Detected page type: {}", classification.category);
            plan.rules = classification.rules;
        }
        RuleSource::Selector => {
            let selector: String = Input::new()
                .with_prompt("CSS selector")
                .interact_text()?;
            plan.rules
                .insert(ExtractionRule::new(CUSTOM_TAG).with_selector(selector.trim()));
        }
    }

    Ok(Some(plan))
}

/// Tag picking: category, then tags, then optional class and id filters
/// per tag. Repeats until the user stops adding categories.
fn pick_tags() -> Result<RuleSet, CliError> {
    let categories: Vec<&str> = TAG_CATEGORIES.iter().map(|(name, _)| *name).collect();
    let mut rules = RuleSet::new();

    loop {
        let idx = Select::new()
            .with_prompt("Tag category")
            .items(&categories)
            .default(0)
            .interact()?;
        let tags = TAG_CATEGORIES[idx].1;

        let chosen = MultiSelect::new()
            .with_prompt("Tags (space to toggle)")
            .items(tags)
            .interact()?;

        for tag in chosen.into_iter().map(|i| tags[i]) {
            let class: String = Input::new()
                .with_prompt(format!("<{tag}> class filter (blank for any)"))
                .allow_empty(true)
                .interact_text()?;
            let id: String = Input::new()
                .with_prompt(format!("<{tag}> id filter (blank for any)"))
                .allow_empty(true)
                .interact_text()?;
            rules.insert(
                ExtractionRule::new(tag)
                    .with_class(class.trim())
                    .with_id(id.trim()),
            );
        }

        let more = Confirm::new()
            .with_prompt("Add tags from another category?")
            .default(false)
            .interact()?;
        if !more {
            return Ok(rules);
        }
    }
}

fn pick_template(app: &App) -> Result<Option<Template>, CliError> {
    let templates = app.templates().all();
    if templates.is_empty() {
        println!("No templates available.");
        return Ok(None);
    }

    let labels: Vec<String> = templates
        .iter()
        .map(|t| format!("{} ({}, {} rules)", t.name, mode_label(t.use_dynamic), t.rules.len()))
        .collect();
    let idx = Select::new()
        .with_prompt("Template")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(templates.into_iter().nth(idx))
}

fn choose_mode(plan: &mut Plan) -> Result<(), CliError> {
    plan.use_dynamic = Confirm::new()
        .with_prompt("Render with a headless browser (for JavaScript pages)?")
        .default(plan.use_dynamic)
        .interact()?;

    if plan.use_dynamic {
        plan.settle_seconds = Input::new()
            .with_prompt(format!(
                "Seconds to wait after load ({MIN_SETTLE_SECONDS}-{MAX_SETTLE_SECONDS})"
            ))
            .default(plan.settle_seconds)
            .validate_with(|secs: &u64| {
                if (MIN_SETTLE_SECONDS..=MAX_SETTLE_SECONDS).contains(secs) {
                    Ok(())
                } else {
                    Err(format!(
                        "Enter a value between {MIN_SETTLE_SECONDS} and {MAX_SETTLE_SECONDS}"
                    ))
                }
            })
            .interact_text()?;
    }
    Ok(())
}

async fn run_plan(app: &App, plan: &Plan) -> Result<ResultTable, CliError> {
    let outcome = app.run_rules(&plan.url, &plan.rules, plan.mode()).await?;
    print_rule_errors(&outcome.rule_errors);
    print_table(&outcome.table, PREVIEW_ROWS);
    Ok(outcome.table)
}

async fn result_menu(app: &App, plan: &Plan, table: &ResultTable) -> Result<(), CliError> {
    if table.is_empty() {
        return Ok(());
    }
    let labels: Vec<&str> = ResultAction::ALL.iter().map(ResultAction::label).collect();

    loop {
        let idx = Select::new()
            .with_prompt("Next")
            .items(&labels)
            .default(0)
            .interact()?;

        let result = match ResultAction::ALL[idx] {
            ResultAction::Filter => handle_filter(table),
            ResultAction::RawHtml => {
                print_raw_html(&table.head(PREVIEW_ROWS));
                Ok(())
            }
            ResultAction::Export => handle_export(table),
            ResultAction::SaveProject => handle_save_project(app, plan, table),
            ResultAction::SaveTemplate => handle_save_template(app, plan),
            ResultAction::Analyze => handle_analyze(app, table).await,
            ResultAction::Done => return Ok(()),
        };

        if let Err(e) = result {
            log::error!("{e}");
        }
    }
}

fn handle_filter(table: &ResultTable) -> Result<(), CliError> {
    let mut tags: Vec<String> = Vec::new();
    for value in table.column_values(TAG_COLUMN).into_iter().flatten() {
        if !tags.iter().any(|t| t == value) {
            tags.push(value.to_string());
        }
    }

    let chosen = MultiSelect::new()
        .with_prompt("Tags to keep (none for all)")
        .items(&tags)
        .interact()?;
    let tags: Vec<String> = chosen.into_iter().map(|i| tags[i].clone()).collect();

    let search: String = Input::new()
        .with_prompt("Content contains (blank for any)")
        .allow_empty(true)
        .interact_text()?;
    let search = search.trim();

    let filtered = table.filter(&tags, (!search.is_empty()).then_some(search));
    print_table(&filtered, PREVIEW_ROWS);
    Ok(())
}

fn handle_export(table: &ResultTable) -> Result<(), CliError> {
    let formats = [ExportFormat::Csv, ExportFormat::Json];
    let labels = ["CSV", "JSON"];
    let idx = Select::new()
        .with_prompt("Format")
        .items(&labels)
        .default(0)
        .interact()?;
    let format = formats[idx];

    let path: String = Input::new()
        .with_prompt("File")
        .default(format!("results.{format}"))
        .interact_text()?;

    export_to_path(table, std::path::Path::new(path.trim()), format)?;
    println!("Wrote {} rows to {}", table.len(), path.trim());
    Ok(())
}

fn handle_save_project(app: &App, plan: &Plan, table: &ResultTable) -> Result<(), CliError> {
    let name: String = Input::new().with_prompt("Project name").interact_text()?;
    let draft = ProjectDraft {
        name,
        url: plan.url.clone(),
        rule_set: plan.rules.clone(),
        use_dynamic: plan.use_dynamic,
        settle_seconds: plan.settle_seconds,
    };
    let id = app.projects().save(&draft, Some(table))?;
    println!("Saved project {id}");
    Ok(())
}

fn handle_save_template(app: &App, plan: &Plan) -> Result<(), CliError> {
    let id: String = Input::new().with_prompt("Template id").interact_text()?;
    let description: String = Input::new()
        .with_prompt("Description")
        .allow_empty(true)
        .interact_text()?;

    let template = Template {
        id: String::new(),
        name: id.trim().to_string(),
        description,
        rules: plan.rules.clone(),
        use_dynamic: plan.use_dynamic,
        settle_seconds: plan.settle_seconds,
    };
    let id = app.templates().save(&id, &template)?;
    println!("Saved template {id}");
    Ok(())
}

/// Prompts for provider and model. Returns `(provider name, model id)`.
fn pick_model() -> Result<(String, String), CliError> {
    let labels: Vec<&str> = ProviderKind::ALL.iter().map(|k| k.label()).collect();
    let idx = Select::new()
        .with_prompt("AI provider")
        .items(&labels)
        .default(0)
        .interact()?;
    let kind = ProviderKind::ALL[idx];

    let models = kind.models();
    let model_labels: Vec<String> = models
        .iter()
        .map(|m| format!("{} ({})", m.label, m.id))
        .collect();
    let idx = Select::new()
        .with_prompt("Model")
        .items(&model_labels)
        .default(0)
        .interact()?;

    Ok((kind.to_string(), models[idx].id.to_string()))
}

async fn handle_analyze(app: &App, table: &ResultTable) -> Result<(), CliError> {
    let (provider, model) = pick_model()?;
    let answer = app.analyze(table, Some(&provider), Some(&model)).await?;
    println!("\n{answer}\n");
    Ok(())
}

async fn handle_ask(app: &App) -> Result<(), CliError> {
    let (provider, model) = pick_model()?;
    let question: String = Input::new().with_prompt("Question").interact_text()?;
    crate::commands::ask(app, &question, Some(&provider), Some(&model)).await
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

async fn handle_projects(app: &App) -> Result<(), CliError> {
    let projects = app.projects().list();
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }
    list_projects(app);

    let labels: Vec<String> = projects
        .iter()
        .map(|p| format!("{} - {}", p.name, p.url))
        .collect();
    let idx = Select::new()
        .with_prompt("Project")
        .items(&labels)
        .default(0)
        .interact()?;
    let id = &projects[idx].id;

    let actions: Vec<&str> = ProjectAction::ALL.iter().map(ProjectAction::label).collect();
    let idx = Select::new()
        .with_prompt(id.as_str())
        .items(&actions)
        .default(0)
        .interact()?;

    match ProjectAction::ALL[idx] {
        ProjectAction::Rerun => rerun_project(app, id).await?,
        ProjectAction::Show => show_project(app, id)?,
        ProjectAction::Delete => {
            let confirmed = Confirm::new()
                .with_prompt(format!("Delete project {id}?"))
                .default(false)
                .interact()?;
            if confirmed {
                delete_project(app, id)?;
            } else {
                println!("Cancelled.");
            }
        }
        ProjectAction::Back => {}
    }
    Ok(())
}

async fn rerun_project(app: &App, id: &str) -> Result<(), CliError> {
    let project = app.projects().load(id)?;
    let config = project.config;
    let plan = Plan {
        url: config.url,
        rules: config.rule_set,
        use_dynamic: config.use_dynamic,
        settle_seconds: config.settle_seconds,
    };
    log::debug!("Re-running project {id} against {}", plan.url);

    let table = run_plan(app, &plan).await?;
    app.projects()
        .update(id, ProjectUpdate::default(), Some(&table))?;
    println!("Updated project {id}");

    result_menu(app, &plan, &table).await
}
