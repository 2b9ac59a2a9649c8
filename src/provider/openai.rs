//! OpenAI chat-completions backend.
//!
//! Also serves any OpenAI-compatible endpoint via a custom base URL.

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{ChatMessage, Completion, CompletionProvider, FailureKind, ProviderFailure};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI backend.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAiProvider {
    /// Backend with an explicit API key against the public endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Backend configured from `OPENAI_API_KEY` and optional `OPENAI_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns a configuration failure if `OPENAI_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ProviderFailure> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            ProviderFailure::configuration("OPENAI_API_KEY environment variable not set")
        })?;
        let provider = Self::new(api_key);
        Ok(match env::var("OPENAI_BASE_URL") {
            Ok(url) => provider.with_base_url(url),
            Err(_) => provider,
        })
    }

    /// Point at a different OpenAI-compatible endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn wrap(model: &str, cause: ProviderFailure) -> ProviderFailure {
        ProviderFailure::new(FailureKind::Other, format!("openai completion for {model} failed"))
            .caused_by(cause)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<Completion, ProviderFailure> {
        debug!(model = model_id, message_count = messages.len(), "openai chat completion");

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: model_id,
                messages,
                temperature,
            })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "failed to send request to OpenAI API");
                Self::wrap(model_id, ProviderFailure::transport(e.to_string()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            error!(status = %status, body = %body, "OpenAI API returned error status");
            return Err(Self::wrap(model_id, ProviderFailure::http(status.as_u16(), body)));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            Self::wrap(
                model_id,
                ProviderFailure::decode(format!("failed to parse response: {e}")),
            )
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                Self::wrap(model_id, ProviderFailure::decode("response contained no choices"))
            })?;

        Ok(Completion {
            text,
            model: parsed.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = OpenAiProvider::new("key").with_base_url("http://localhost:8080/v1/");
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_request_shape() {
        let messages = [ChatMessage::system("s"), ChatMessage::user("u")];
        let body = serde_json::to_value(ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.0,
        })
        .unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["temperature"], 0.0);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_failure() {
        let provider = OpenAiProvider::new("key").with_base_url("http://127.0.0.1:9");
        let failure = provider
            .complete("gpt-4o-mini", &[ChatMessage::user("hi")], 0.0)
            .await
            .unwrap_err();
        assert_eq!(failure.cause.unwrap().kind, FailureKind::Transport);
    }

    #[tokio::test]
    async fn test_completion_parsed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"model":"gpt-4o-mini-2024-07-18","choices":[{"message":{"role":"assistant","content":"Arr, hello!"}}]}"#,
            )
            .create_async()
            .await;

        let provider = OpenAiProvider::new("test-key").with_base_url(server.url());
        let completion = provider
            .complete("gpt-4o-mini", &[ChatMessage::user("hi")], 0.0)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(completion.text, "Arr, hello!");
        assert_eq!(completion.model.as_deref(), Some("gpt-4o-mini-2024-07-18"));
    }

    #[tokio::test]
    async fn test_error_status_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"error":{"message":"Rate limit reached"}}"#;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(body)
            .create_async()
            .await;

        let provider = OpenAiProvider::new("test-key").with_base_url(server.url());
        let failure = provider
            .complete("gpt-4o-mini", &[ChatMessage::user("hi")], 0.0)
            .await
            .unwrap_err();

        assert_eq!(failure.http_error(), Some((429, body)));
        let rendered = failure.render();
        assert!(rendered.starts_with("openai completion for gpt-4o-mini failed"));
        assert!(rendered.contains("HTTP 429"));
        assert!(rendered.contains("Rate limit reached"));
    }

    #[tokio::test]
    async fn test_empty_choices_is_decode_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"model":"gpt-4o-mini","choices":[]}"#)
            .create_async()
            .await;

        let provider = OpenAiProvider::new("test-key").with_base_url(server.url());
        let failure = provider
            .complete("gpt-4o-mini", &[ChatMessage::user("hi")], 0.0)
            .await
            .unwrap_err();

        let cause = failure.cause.unwrap();
        assert_eq!(cause.kind, FailureKind::Decode);
        assert_eq!(cause.message, "response contained no choices");
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let provider = OpenAiProvider::new("test-key").with_base_url(server.url());
        let failure = provider
            .complete("gpt-4o-mini", &[ChatMessage::user("hi")], 0.0)
            .await
            .unwrap_err();
        assert_eq!(failure.cause.unwrap().kind, FailureKind::Decode);
    }
}
