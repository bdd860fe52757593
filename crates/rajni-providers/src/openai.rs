//! OpenAI-compatible chat completion gateway.
//!
//! Works with OpenAI's API and any compatible endpoint.

use async_trait::async_trait;
use rajni_core::{
    config::OpenAiConfig,
    context::{ApiMessage, Context},
    error::RajniError,
    traits::Provider,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Literal reply when the provider returns a response with no content.
/// A successful call with empty content is not an error.
pub const EMPTY_RESPONSE_FALLBACK: &str =
    "Sorry, I didn't understand that. Could you please repeat?";

/// OpenAI-compatible completion provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create from config values and the API key.
    pub fn from_config(config: OpenAiConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key,
            config,
        }
    }
}

/// Build wire-format messages: one system entry, then the windowed turns in
/// chronological order.
pub(crate) fn build_messages(system: &str, api_messages: &[ApiMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(api_messages.len() + 1);
    if !system.is_empty() {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: system.to_string(),
        });
    }
    for m in api_messages {
        messages.push(ChatMessage {
            role: m.role.clone(),
            content: m.content.clone(),
        });
    }
    messages
}

#[derive(Serialize, Deserialize, Clone)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Option<Vec<ChatChoice>>,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ChatMessage>,
}

/// Extract the top response text, degrading to the fallback string when the
/// provider returned no usable content.
pub(crate) fn extract_reply(parsed: &ChatCompletionResponse) -> String {
    parsed
        .choices
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|c| c.message.as_ref())
        .map(|m| m.content.clone())
        .filter(|content| !content.is_empty())
        .unwrap_or_else(|| EMPTY_RESPONSE_FALLBACK.to_string())
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, context: &Context) -> Result<String, RajniError> {
        let (system, api_messages) = context.to_api_messages();
        let messages = build_messages(&system, &api_messages);

        let body = ChatCompletionRequest {
            model: self.config.chat_model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            presence_penalty: self.config.presence_penalty,
            frequency_penalty: self.config.frequency_penalty,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(
            "openai: POST {url} model={} turns={}",
            self.config.chat_model,
            context.turns.len()
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RajniError::Provider(format!("openai request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(RajniError::Provider(format!(
                "openai returned {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| RajniError::Provider(format!("openai: failed to parse response: {e}")))?;

        Ok(extract_reply(&parsed))
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("openai: no API key configured");
            return false;
        }
        let url = format!("{}/models", self.base_url.trim_end_matches('/'));
        match self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("openai not available: {e}");
                false
            }
        }
    }
}
