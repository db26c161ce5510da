#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! LLM-backed analysis of scraped tables.
//!
//! Supports `OpenAI`, Groq, and Google Gemini behind a single
//! [`LlmProvider`](providers::LlmProvider) trait. [`analysis`] renders a
//! [`ResultTable`](smart_scraper_extract_models::ResultTable) into a bounded
//! prompt and forwards it to whichever provider the caller picked.

pub mod analysis;
pub mod providers;

use thiserror::Error;

pub use analysis::{AnalysisConfig, analyze_table, ask};
pub use providers::{LlmProvider, ModelInfo, ProviderKind, create_provider, create_provider_from_env};

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to LLM provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The requested model cannot answer text prompts.
    #[error("Model {model} is not a chat model: {reason}")]
    UnsupportedModel {
        /// The rejected model id.
        model: String,
        /// Why it was rejected.
        reason: String,
    },

    /// There was nothing to analyze.
    #[error("No data to analyze")]
    NoData,

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}
