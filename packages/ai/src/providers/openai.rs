//! `OpenAI` chat completions provider.
//!
//! The request/response shapes here are also spoken by Groq, which reuses
//! [`chat_completion`].

use serde::{Deserialize, Serialize};

use super::{LlmProvider, ProviderKind, provider_error};
use crate::AiError;

/// Default chat completions endpoint.
pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// System message sent ahead of every `OpenAI` prompt.
pub const SYSTEM_PROMPT: &str = "You are an expert in web scraping.";

/// `OpenAI` API provider.
pub struct OpenAiProvider {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAI` provider.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            endpoint: OPENAI_CHAT_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Sends one user turn (optionally preceded by a system turn) to a chat
/// completions endpoint.
pub(crate) async fn chat_completion(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    system_prompt: Option<&str>,
    prompt: &str,
    model: &str,
) -> Result<String, AiError> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system_prompt {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: prompt,
    });

    let resp = client
        .post(endpoint)
        .header("Authorization", format!("Bearer {api_key}"))
        .header("Content-Type", "application/json")
        .json(&ChatRequest { model, messages })
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(provider_error(status, &body));
    }

    parse_chat_response(&body)
}

fn parse_chat_response(body: &str) -> Result<String, AiError> {
    let response: ChatResponse = serde_json::from_str(body)?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AiError::Provider {
            message: "No choices in chat completion response".to_string(),
        })
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn complete(&self, prompt: &str, model: &str) -> Result<String, AiError> {
        log::debug!("Sending {} chars to OpenAI model {model}", prompt.len());
        chat_completion(
            &self.client,
            &self.endpoint,
            &self.api_key,
            Some(SYSTEM_PROMPT),
            prompt,
            model,
        )
        .await
        .inspect_err(|e| log::error!("OpenAI request with model {model} failed: {e}"))
    }
}
