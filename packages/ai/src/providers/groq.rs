//! Groq provider, using Groq's `OpenAI`-compatible endpoint.

use super::openai::chat_completion;
use super::{LlmProvider, ProviderKind};
use crate::AiError;

/// Groq chat completions endpoint.
pub const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Groq API provider.
pub struct GroqProvider {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl GroqProvider {
    /// Creates a new Groq provider.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            endpoint: GROQ_CHAT_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

/// Rejects Groq's speech-to-text models, which cannot answer prompts.
///
/// # Errors
///
/// Returns [`AiError::UnsupportedModel`] for any model id containing
/// `whisper`.
pub fn ensure_chat_model(model: &str) -> Result<(), AiError> {
    if model.to_lowercase().contains("whisper") {
        log::info!("Refusing transcription model {model} for a text prompt");
        return Err(AiError::UnsupportedModel {
            model: model.to_string(),
            reason: "it transcribes audio; pick an LLM for text questions".to_string(),
        });
    }
    Ok(())
}

#[async_trait::async_trait]
impl LlmProvider for GroqProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Groq
    }

    async fn complete(&self, prompt: &str, model: &str) -> Result<String, AiError> {
        ensure_chat_model(model)?;

        log::debug!("Sending {} chars to Groq model {model}", prompt.len());
        chat_completion(&self.client, &self.endpoint, &self.api_key, None, prompt, model)
            .await
            .inspect_err(|e| log::error!("Groq request with model {model} failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whisper_models_are_rejected() {
        for model in ["whisper-large-v3", "distil-whisper-large-v3-en", "Whisper-Large-V3-Turbo"] {
            assert!(matches!(
                ensure_chat_model(model),
                Err(AiError::UnsupportedModel { .. })
            ));
        }
        assert!(ensure_chat_model("llama-3.3-70b-versatile").is_ok());
    }

    #[tokio::test]
    async fn whisper_is_rejected_without_a_request() {
        let mut provider = GroqProvider::new("key".to_string());
        provider.endpoint = "http://127.0.0.1:9/never".to_string();

        let err = provider.complete("hello", "whisper-large-v3").await.unwrap_err();

        assert!(matches!(err, AiError::UnsupportedModel { .. }));
        assert!(err.to_string().starts_with("Model whisper-large-v3 is not a chat model"));
    }
}
