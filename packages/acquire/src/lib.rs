#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Page acquisition for the smart scraper.
//!
//! Pages are obtained either with a single static HTTP GET ([`fetch`]) or
//! by rendering them in a headless browser ([`dynamic`]). Both paths hand
//! the resulting HTML to the same extraction pipeline, so a rule set yields
//! the same table shape whichever way the page was acquired.
//!
//! Failures are returned as [`AcquireError`] values; rule-level problems are
//! reported alongside the table in
//! [`ExtractionOutcome`](smart_scraper_extract::ExtractionOutcome).

pub mod browser;
pub mod dynamic;
pub mod fetch;

use std::time::Duration;

use smart_scraper_extract::{ExtractionOutcome, Extractor};
use smart_scraper_extract_models::{DEFAULT_SETTLE_SECONDS, RuleSet, clamp_settle_seconds};

pub use browser::BrowserUnavailable;
pub use dynamic::DynamicRenderer;
pub use fetch::{AcquireConfig, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, fetch_static};

/// Errors that can occur while acquiring a page.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// DNS, connect, timeout, or non-2xx failure.
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    /// The HTTP client could not be configured.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No headless browser could be started.
    #[error("{0}")]
    BrowserUnavailable(#[from] BrowserUnavailable),

    /// A browser started but failed to render the page.
    #[error("Browser error: {0}")]
    Browser(String),

    /// The blocking browser task panicked or was cancelled.
    #[error("Browser task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// How a page is obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AcquisitionMode {
    /// One HTTP GET.
    #[default]
    Static,
    /// Headless browser render followed by a fixed wait.
    Dynamic {
        /// Time to wait after navigation before reading the DOM.
        settle: Duration,
    },
}

impl AcquisitionMode {
    /// Builds a mode from persisted settings, clamping the settle time into
    /// `1..=10` seconds.
    #[must_use]
    pub fn from_settings(use_dynamic: bool, settle_seconds: u64) -> Self {
        if use_dynamic {
            Self::Dynamic {
                settle: Duration::from_secs(clamp_settle_seconds(settle_seconds)),
            }
        } else {
            Self::Static
        }
    }

    /// Dynamic mode with the default settle time.
    #[must_use]
    pub const fn dynamic() -> Self {
        Self::Dynamic {
            settle: Duration::from_secs(DEFAULT_SETTLE_SECONDS),
        }
    }
}

/// Acquires pages and runs rule sets against them.
#[derive(Debug, Clone)]
pub struct Acquirer {
    config: AcquireConfig,
    renderer: DynamicRenderer,
    extractor: Extractor,
}

impl Default for Acquirer {
    fn default() -> Self {
        Self::new(AcquireConfig::default())
    }
}

impl Acquirer {
    /// An acquirer that renders with installed browsers.
    #[must_use]
    pub fn new(config: AcquireConfig) -> Self {
        let renderer = DynamicRenderer::system(&config.user_agent);
        Self::with_renderer(config, renderer)
    }

    /// An acquirer with an explicit browser renderer.
    #[must_use]
    pub fn with_renderer(config: AcquireConfig, renderer: DynamicRenderer) -> Self {
        Self {
            config,
            renderer,
            extractor: Extractor::new(),
        }
    }

    /// The HTTP settings in use.
    #[must_use]
    pub const fn config(&self) -> &AcquireConfig {
        &self.config
    }

    /// Obtains the HTML for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError`] if the page could not be fetched or
    /// rendered.
    pub async fn fetch_html(&self, url: &str, mode: AcquisitionMode) -> Result<String, AcquireError> {
        match mode {
            AcquisitionMode::Static => fetch_static(&self.config, url).await,
            AcquisitionMode::Dynamic { settle } => self.renderer.render(url, settle).await,
        }
    }

    /// Acquires `url` once and applies every rule in `rules` to it.
    ///
    /// An empty rule set returns an empty table without touching the
    /// network.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError`] only when the page itself could not be
    /// acquired; rules that fail to resolve are reported in the outcome.
    pub async fn scrape(
        &self,
        url: &str,
        rules: &RuleSet,
        mode: AcquisitionMode,
    ) -> Result<ExtractionOutcome, AcquireError> {
        if rules.is_empty() {
            log::info!("No rules selected for {url}; nothing to extract");
            return Ok(ExtractionOutcome::default());
        }

        let html = self.fetch_html(url, mode).await?;
        Ok(self.extractor.extract_html(&html, rules))
    }
}
