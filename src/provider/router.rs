//! Provider-prefix routing.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{ChatMessage, Completion, CompletionProvider, ProviderFailure};

/// Split `"provider:model"` into its two halves.
///
/// Only the first `:` separates; model names may contain more colons
/// (e.g. `"ollama:llama3:8b"`). Returns `None` if either half is empty.
#[must_use]
pub fn split_model_id(model_id: &str) -> Option<(&str, &str)> {
    let (provider, model) = model_id.split_once(':')?;
    if provider.is_empty() || model.is_empty() {
        return None;
    }
    Some((provider, model))
}

/// Dispatches provider-qualified model identifiers to registered backends.
///
/// Backends receive the bare model name (prefix stripped).
#[derive(Default, Clone)]
pub struct ProviderRouter {
    backends: HashMap<String, Arc<dyn CompletionProvider>>,
}

impl ProviderRouter {
    /// Router with no backends.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under a provider prefix, replacing any previous one.
    #[must_use]
    pub fn register(mut self, provider: impl Into<String>, backend: Arc<dyn CompletionProvider>) -> Self {
        self.backends.insert(provider.into(), backend);
        self
    }

    /// Registered provider prefixes, sorted.
    #[must_use]
    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ProviderRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRouter")
            .field("providers", &self.providers())
            .finish()
    }
}

#[async_trait]
impl CompletionProvider for ProviderRouter {
    async fn complete(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<Completion, ProviderFailure> {
        let (provider, model) = split_model_id(model_id).ok_or_else(|| {
            ProviderFailure::configuration(format!(
                "model identifier '{model_id}' is not of the form provider:model"
            ))
        })?;
        let backend = self.backends.get(provider).ok_or_else(|| {
            ProviderFailure::configuration(format!(
                "no backend registered for provider '{provider}' (known: {})",
                self.providers().join(", ")
            ))
        })?;
        debug!(provider, model, "routing completion request");
        backend.complete(model, messages, temperature).await
    }
}
