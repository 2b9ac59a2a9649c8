//! Completion providers.
//!
//! The orchestrator sees a single capability,
//! `complete(model_id, messages, temperature)`, that either returns the
//! completion text or fails with a [`ProviderFailure`]. Model identifiers
//! are provider-qualified (`"openai:gpt-4o-mini"`); [`ProviderRouter`]
//! splits the prefix off and dispatches to a registered backend.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use llm_eval::provider::{ChatMessage, CompletionProvider, OpenAiProvider, ProviderRouter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let router = ProviderRouter::new().register("openai", Arc::new(OpenAiProvider::from_env()?));
//! let messages = [ChatMessage::system("Be terse."), ChatMessage::user("Hi")];
//! let completion = router.complete("openai:gpt-4o-mini", &messages, 0.0).await?;
//! println!("{}", completion.text);
//! # Ok(())
//! # }
//! ```

mod anthropic;
mod failure;
mod openai;
mod router;

pub use anthropic::AnthropicProvider;
pub use failure::{FailureKind, ProviderFailure, CAUSED_BY};
pub use openai::OpenAiProvider;
pub use router::{split_model_id, ProviderRouter};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `"system"`, `"user"` or `"assistant"`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// System message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    /// User message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// A successful completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text.
    pub text: String,
    /// Model that served the request, as reported upstream.
    #[serde(default)]
    pub model: Option<String>,
}

impl Completion {
    /// Completion with only text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
        }
    }
}

/// One chat-completion call against some backend.
///
/// Implementations must be `Send + Sync`; the orchestrator holds them
/// behind an `Arc`.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Issue one completion request.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderFailure`] describing why no completion was produced.
    async fn complete(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<Completion, ProviderFailure>;
}
