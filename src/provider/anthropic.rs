//! Anthropic messages-API backend.

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{ChatMessage, Completion, CompletionProvider, FailureKind, ProviderFailure};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic backend.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    max_tokens: u32,
    client: Client,
}

impl AnthropicProvider {
    /// Backend with an explicit API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            client: Client::new(),
        }
    }

    /// Backend configured from `ANTHROPIC_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns a configuration failure if `ANTHROPIC_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ProviderFailure> {
        env::var("ANTHROPIC_API_KEY").map(Self::new).map_err(|_| {
            ProviderFailure::configuration("ANTHROPIC_API_KEY environment variable not set")
        })
    }

    /// Point at a different endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Cap on generated tokens (the messages API requires one).
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn wrap(model: &str, cause: ProviderFailure) -> ProviderFailure {
        ProviderFailure::new(FailureKind::Other, format!("anthropic completion for {model} failed"))
            .caused_by(cause)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a ChatMessage>,
}

impl<'a> MessagesRequest<'a> {
    /// System messages go in the top-level `system` field, the rest in `messages`.
    fn build(model: &'a str, messages: &'a [ChatMessage], max_tokens: u32, temperature: f32) -> Self {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();
        Self {
            model,
            max_tokens,
            temperature,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: messages.iter().filter(|m| m.role != "system").collect(),
        }
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    model: Option<String>,
    content: Vec<ContentBlock>,
}

impl MessagesResponse {
    /// Concatenated text of every `text` block, other block kinds skipped.
    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect()
    }
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    async fn complete(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<Completion, ProviderFailure> {
        debug!(model = model_id, message_count = messages.len(), "anthropic messages call");

        let url = format!("{}/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&MessagesRequest::build(model_id, messages, self.max_tokens, temperature))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "failed to send request to Anthropic API");
                Self::wrap(model_id, ProviderFailure::transport(e.to_string()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            error!(status = %status, body = %body, "Anthropic API returned error status");
            return Err(Self::wrap(model_id, ProviderFailure::http(status.as_u16(), body)));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            Self::wrap(
                model_id,
                ProviderFailure::decode(format!("failed to parse response: {e}")),
            )
        })?;

        Ok(Completion {
            text: parsed.text(),
            model: parsed.model,
        })
    }
}
