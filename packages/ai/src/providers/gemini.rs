//! Google Gemini provider.
//!
//! When the requested model fails, the prompt is retried once with
//! [`FALLBACK_MODEL`] and the answer is prefixed with [`FALLBACK_NOTICE`].

use serde::{Deserialize, Serialize};

use super::{LlmProvider, ProviderKind, provider_error};
use crate::AiError;

/// Base URL of the Gemini REST API.
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model retried when the requested one fails.
pub const FALLBACK_MODEL: &str = "gemini-pro";

/// Prefix for answers produced by [`FALLBACK_MODEL`].
pub const FALLBACK_NOTICE: &str =
    "Requested model unavailable. Response generated with fallback model gemini-pro:\n\n";

/// Google Gemini API provider.
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: GEMINI_API_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String, AiError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let resp = self
            .client
            .post(format!("{}/models/{model}:generateContent", self.base_url))
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(provider_error(status, &body));
        }

        parse_generate_response(&body)
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn parse_generate_response(body: &str) -> Result<String, AiError> {
    let response: GenerateResponse = serde_json::from_str(body)?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().map(|part| part.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(AiError::Provider {
            message: "No response from the model. Try another model.".to_string(),
        });
    }
    Ok(text)
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn complete(&self, prompt: &str, model: &str) -> Result<String, AiError> {
        log::info!("Using Gemini model {model}");

        let err = match self.generate(prompt, model).await {
            Ok(text) => return Ok(text),
            Err(e) if model == FALLBACK_MODEL => return Err(e),
            Err(e) => e,
        };

        log::warn!("Gemini model {model} failed ({err}); retrying with {FALLBACK_MODEL}");
        match self.generate(prompt, FALLBACK_MODEL).await {
            Ok(text) => Ok(format!("{FALLBACK_NOTICE}{text}")),
            Err(fallback) => Err(AiError::Provider {
                message: format!("All Gemini models failed. Error: {err}. Fallback error: {fallback}"),
            }),
        }
    }
}
