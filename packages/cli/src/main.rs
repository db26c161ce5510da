#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Smart scraper command line.
//!
//! ```text
//! smart_scraper scrape <url> [--rule div.product] [--selector price=span.price]
//!                            [--template <id>] [--rules-file rules.json]
//!                            [--dynamic] [--settle 3] [--format table|csv|json]
//!                            [--output results.csv] [--save-project <name>]
//! smart_scraper detect <url> [--save-template <id>]
//! smart_scraper analyze (--project <id> | --input results.json) [--provider groq]
//! smart_scraper ask <question...>
//! smart_scraper templates list|show <id>|delete <id>
//! smart_scraper projects list|show <id>|delete <id>
//! ```
//!
//! Running `smart_scraper` with no subcommand enters interactive mode.
//!
//! Log output goes through `indicatif-log-bridge` (via
//! [`smart_scraper_cli_utils::init_logger`]) so that log lines and spinners
//! never fight for the terminal. Set `RUST_LOG` to adjust verbosity.

mod commands;
mod config;
mod interactive;
mod output;
mod rules;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use smart_scraper_extract_models::{MAX_SETTLE_SECONDS, MIN_SETTLE_SECONDS};

use crate::commands::{App, OutputFormat, ScrapeRequest};
use crate::config::AppConfig;

#[derive(Parser)]
#[command(
    name = "smart_scraper",
    about = "Extract structured data from web pages with tag and CSS rules"
)]
struct Cli {
    /// Config file (defaults to $SMART_SCRAPER_CONFIG, then ./smart_scraper.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a page with rules
    Scrape(ScrapeArgs),
    /// Classify a page and suggest rules
    Detect {
        /// Page to classify
        url: String,
        /// Save the suggested rules as a custom template with this id
        #[arg(long)]
        save_template: Option<String>,
    },
    /// Summarize saved results with an LLM
    Analyze {
        /// Saved project id
        #[arg(long, conflicts_with = "input", required_unless_present = "input")]
        project: Option<String>,
        /// JSON results file (as written by --format json)
        #[arg(long)]
        input: Option<PathBuf>,
        /// openai, groq, or gemini
        #[arg(long)]
        provider: Option<String>,
        /// Model id
        #[arg(long)]
        model: Option<String>,
    },
    /// Ask an LLM a free-text question
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
        /// openai, groq, or gemini
        #[arg(long)]
        provider: Option<String>,
        /// Model id
        #[arg(long)]
        model: Option<String>,
    },
    /// Manage rule templates
    Templates {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Manage saved projects
    Projects {
        #[command(subcommand)]
        command: ProjectCommands,
    },
}

#[derive(Args)]
struct ScrapeArgs {
    /// Page to scrape
    url: String,
    /// Rule as tag[.class[.class]][#id]; repeatable
    #[arg(long = "rule", short = 'r')]
    rules: Vec<String>,
    /// Rule as tag=css-selector; repeatable
    #[arg(long = "selector", short = 's')]
    selectors: Vec<String>,
    /// Start from a template's rules and settings
    #[arg(long, short = 't')]
    template: Option<String>,
    /// Start from a JSON rule file
    #[arg(long, conflicts_with = "template")]
    rules_file: Option<PathBuf>,
    /// Render with a headless browser
    #[arg(long)]
    dynamic: bool,
    /// Seconds to wait after load in dynamic mode
    #[arg(long, value_parser = clap::value_parser!(u64).range(MIN_SETTLE_SECONDS..=MAX_SETTLE_SECONDS))]
    settle: Option<u64>,
    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
    /// Write results to a file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
    /// Save the rules and the rows kept by --tag/--search as a project
    #[arg(long)]
    save_project: Option<String>,
    /// Print each row's source markup
    #[arg(long)]
    show_html: bool,
    /// Only keep rows with this tag; repeatable
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Only keep rows whose content contains this text (case-insensitive)
    #[arg(long)]
    search: Option<String>,
}

impl From<ScrapeArgs> for ScrapeRequest {
    fn from(args: ScrapeArgs) -> Self {
        Self {
            url: args.url,
            rules: args.rules,
            selectors: args.selectors,
            template: args.template,
            rules_file: args.rules_file,
            dynamic: args.dynamic,
            settle: args.settle,
            format: args.format,
            output: args.output,
            save_project: args.save_project,
            show_html: args.show_html,
            tags: args.tags,
            search: args.search,
        }
    }
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// List built-in and custom templates
    List,
    /// Show a template's rules
    Show {
        /// Template id
        id: String,
    },
    /// Delete a custom template
    Delete {
        /// Template id
        id: String,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// List saved projects
    List,
    /// Show a project's settings and results
    Show {
        /// Project id
        id: String,
    },
    /// Delete a project
    Delete {
        /// Project id
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = smart_scraper_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    let app = App::new(config, multi);

    let Some(command) = cli.command else {
        println!("Smart Scraper");
        println!();
        return interactive::run(&app).await;
    };

    match command {
        Commands::Scrape(args) => commands::scrape(&app, args.into()).await?,
        Commands::Detect { url, save_template } => {
            commands::detect(&app, &url, save_template.as_deref()).await?;
        }
        Commands::Analyze {
            project,
            input,
            provider,
            model,
        } => {
            commands::analyze(
                &app,
                project.as_deref(),
                input.as_deref(),
                provider.as_deref(),
                model.as_deref(),
            )
            .await?;
        }
        Commands::Ask {
            question,
            provider,
            model,
        } => {
            commands::ask(
                &app,
                &question.join(" "),
                provider.as_deref(),
                model.as_deref(),
            )
            .await?;
        }
        Commands::Templates { command } => match command {
            TemplateCommands::List => commands::list_templates(&app),
            TemplateCommands::Show { id } => commands::show_template(&app, &id)?,
            TemplateCommands::Delete { id } => commands::delete_template(&app, &id)?,
        },
        Commands::Projects { command } => match command {
            ProjectCommands::List => commands::list_projects(&app),
            ProjectCommands::Show { id } => commands::show_project(&app, &id)?,
            ProjectCommands::Delete { id } => commands::delete_project(&app, &id)?,
        },
    }

    Ok(())
}
