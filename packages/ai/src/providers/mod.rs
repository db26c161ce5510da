//! LLM provider abstraction and implementations.
//!
//! Supports `OpenAI`, Groq, and Google Gemini via a common trait. Every
//! provider is a single-turn text completion: one prompt in, one answer
//! out.

pub mod gemini;
pub mod groq;
pub mod openai;

use serde::Deserialize;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::AiError;

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Which service this provider talks to.
    fn kind(&self) -> ProviderKind;

    /// Sends `prompt` to `model` and returns the answer text.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the service rejects it.
    async fn complete(&self, prompt: &str, model: &str) -> Result<String, AiError>;
}

/// A selectable model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    /// Identifier sent to the provider.
    pub id: &'static str,
    /// Human-readable name.
    pub label: &'static str,
}

const fn model(id: &'static str, label: &'static str) -> ModelInfo {
    ModelInfo { id, label }
}

const OPENAI_MODELS: &[ModelInfo] = &[
    model("gpt-3.5-turbo", "GPT-3.5 Turbo (recommended)"),
    model("gpt-4o", "GPT-4o (most capable)"),
    model("gpt-4-turbo", "GPT-4 Turbo"),
    model("gpt-4", "GPT-4"),
    model("gpt-3.5-turbo-instruct", "GPT-3.5 Turbo Instruct"),
];

const GROQ_MODELS: &[ModelInfo] = &[
    model("llama-3.3-70b-versatile", "Llama 3.3 70B Versatile (recommended)"),
    model("llama-3.1-8b-instant", "Llama 3.1 8B Instant (fast)"),
    model("llama3-70b-8192", "Llama 3 70B"),
    model("llama3-8b-8192", "Llama 3 8B"),
    model("gemma2-9b-it", "Gemma 2 9B"),
    model("mixtral-8x7b-32768", "Mixtral 8x7B"),
    model("llama-guard-3-8b", "Llama Guard 3 8B"),
    model("distil-whisper-large-v3-en", "Whisper Large V3 (English)"),
    model("whisper-large-v3", "Whisper Large V3"),
    model("whisper-large-v3-turbo", "Whisper Large V3 Turbo"),
];

const GEMINI_MODELS: &[ModelInfo] = &[
    model("gemini-2.0-flash", "Gemini 2.0 Flash (recommended)"),
    model("gemini-1.5-pro", "Gemini 1.5 Pro"),
    model("gemini-1.5-flash", "Gemini 1.5 Flash (fast)"),
    model("gemini-pro", "Gemini Pro (stable)"),
    model("gemini-pro-vision", "Gemini Pro Vision"),
];

/// Supported LLM services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum ProviderKind {
    /// `OpenAI` chat completions.
    #[strum(to_string = "openai", serialize = "chatgpt", serialize = "gpt")]
    OpenAi,
    /// Groq's `OpenAI`-compatible endpoint.
    #[strum(to_string = "groq")]
    Groq,
    /// Google Gemini `generateContent`.
    #[strum(to_string = "gemini")]
    Gemini,
}

impl ProviderKind {
    /// Every provider, in menu order.
    pub const ALL: &[Self] = &[Self::Groq, Self::OpenAi, Self::Gemini];

    /// Display name for menus.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OpenAi => "ChatGPT (OpenAI)",
            Self::Groq => "Groq",
            Self::Gemini => "Google Gemini",
        }
    }

    /// Environment variable holding the API key.
    #[must_use]
    pub const fn env_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }

    /// Model used when none is chosen.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-3.5-turbo",
            Self::Groq => "llama-3.3-70b-versatile",
            Self::Gemini => "gemini-2.0-flash",
        }
    }

    /// Known models, recommended first.
    #[must_use]
    pub const fn models(self) -> &'static [ModelInfo] {
        match self {
            Self::OpenAi => OPENAI_MODELS,
            Self::Groq => GROQ_MODELS,
            Self::Gemini => GEMINI_MODELS,
        }
    }
}

/// Creates a provider of `kind` authenticated with `api_key`.
///
/// # Errors
///
/// Returns [`AiError::Config`] if `api_key` is blank.
pub fn create_provider(kind: ProviderKind, api_key: &str) -> Result<Box<dyn LlmProvider>, AiError> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(AiError::Config {
            message: format!("{} API key is empty (set {})", kind.label(), kind.env_var()),
        });
    }

    let api_key = api_key.to_string();
    Ok(match kind {
        ProviderKind::OpenAi => Box::new(openai::OpenAiProvider::new(api_key)),
        ProviderKind::Groq => Box::new(groq::GroqProvider::new(api_key)),
        ProviderKind::Gemini => Box::new(gemini::GeminiProvider::new(api_key)),
    })
}

/// Creates a provider of `kind` using the API key from its environment
/// variable.
///
/// # Errors
///
/// Returns [`AiError::Config`] if the variable is not set.
pub fn create_provider_from_env(kind: ProviderKind) -> Result<Box<dyn LlmProvider>, AiError> {
    let api_key = std::env::var(kind.env_var()).map_err(|_| AiError::Config {
        message: format!("{} environment variable not set", kind.env_var()),
    })?;
    log::debug!("Using {} provider", kind.label());
    create_provider(kind, &api_key)
}

/// `{"error": {"message": ...}}`, shared by every supported service.
#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Turns a non-success response into [`AiError::Provider`], preferring the
/// service's own error message.
fn provider_error(status: reqwest::StatusCode, body: &str) -> AiError {
    let message = serde_json::from_str::<ApiError>(body)
        .map_or_else(|_| format!("HTTP {status}: {body}"), |err| err.error.message);
    AiError::Provider { message }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn provider_names_parse_case_insensitively() {
        assert_eq!(ProviderKind::from_str("OpenAI").unwrap(), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::from_str("chatgpt").unwrap(), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::from_str("groq").unwrap(), ProviderKind::Groq);
        assert_eq!(ProviderKind::from_str("Gemini").unwrap(), ProviderKind::Gemini);
        assert!(ProviderKind::from_str("claude").is_err());
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
    }

    #[test]
    fn default_models_are_listed_first() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.models()[0].id, kind.default_model());
        }
    }

    #[test]
    fn blank_api_key_is_a_config_error() {
        let err = create_provider(ProviderKind::Groq, "  ").err().unwrap();
        assert!(matches!(err, AiError::Config { .. }));
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn created_provider_reports_its_kind() {
        let provider = create_provider(ProviderKind::Gemini, "key").unwrap();
        assert_eq!(provider.kind(), ProviderKind::Gemini);
    }

    #[test]
    fn provider_error_prefers_service_message() {
        let err = provider_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"Invalid API key"}}"#,
        );
        assert_eq!(err.to_string(), "Provider error: Invalid API key");

        let err = provider_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(
            err.to_string(),
            "Provider error: HTTP 502 Bad Gateway: upstream down"
        );
    }
}
