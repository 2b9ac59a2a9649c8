//! Token accounting.
//!
//! The orchestrator only needs `count_tokens(text, model_id) -> usize`.
//! [`EncodingTokenCounter`] resolves the model identifier to a BPE
//! [`Tokenizer`] and counts the encoded tokens. Encoders are built once per
//! tokenizer and shared across calls.
//!
//! Counting never fails. An identifier the encoder does not recognise
//! falls back to [`DEFAULT_TOKENIZER`].

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tiktoken_rs::tokenizer::get_tokenizer;
use tiktoken_rs::{cl100k_base, get_bpe_from_tokenizer, CoreBPE};
use tracing::{debug, warn};

use crate::provider::split_model_id;

pub use tiktoken_rs::tokenizer::Tokenizer;

/// Tokenizer used for unrecognised model identifiers.
pub const DEFAULT_TOKENIZER: Tokenizer = Tokenizer::Cl100kBase;

/// Token counting capability.
pub trait TokenCounter: Send + Sync {
    /// Number of tokens `text` costs for `model_id`.
    fn count_tokens(&self, text: &str, model_id: &str) -> usize;
}

/// Tokenizer for a model identifier, if recognised.
///
/// A provider prefix (`"openai:"`) is ignored.
#[must_use]
pub fn tokenizer_for_model(model_id: &str) -> Option<Tokenizer> {
    let model = split_model_id(model_id).map_or(model_id, |(_, m)| m);
    get_tokenizer(model)
}

/// BPE counter keyed on the model's tokenizer.
#[derive(Default)]
pub struct EncodingTokenCounter {
    encoders: DashMap<Tokenizer, Arc<CoreBPE>>,
}

impl fmt::Debug for EncodingTokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodingTokenCounter")
            .field("loaded", &self.encoders.len())
            .finish()
    }
}

impl EncodingTokenCounter {
    /// Create a counter with no encoders loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenizer for `model_id`, falling back to the default.
    #[must_use]
    pub fn tokenizer(model_id: &str) -> Tokenizer {
        tokenizer_for_model(model_id).unwrap_or_else(|| {
            debug!(model = model_id, "unrecognised model, using default encoding");
            DEFAULT_TOKENIZER
        })
    }

    /// Count `text` under a specific tokenizer.
    #[must_use]
    pub fn count_with(&self, text: &str, tokenizer: Tokenizer) -> usize {
        self.encoder(tokenizer)
            .map_or(0, |bpe| bpe.encode_ordinary(text).len())
    }

    fn encoder(&self, tokenizer: Tokenizer) -> Option<Arc<CoreBPE>> {
        if let Some(bpe) = self.encoders.get(&tokenizer) {
            return Some(Arc::clone(bpe.value()));
        }
        let bpe = match get_bpe_from_tokenizer(tokenizer).or_else(|e| {
            warn!(?tokenizer, error = %e, "encoding unavailable, using cl100k_base");
            cl100k_base()
        }) {
            Ok(bpe) => Arc::new(bpe),
            Err(e) => {
                warn!(?tokenizer, error = %e, "no encoding available, counting zero tokens");
                return None;
            }
        };
        Some(Arc::clone(
            self.encoders.entry(tokenizer).or_insert(bpe).value(),
        ))
    }
}

impl TokenCounter for EncodingTokenCounter {
    fn count_tokens(&self, text: &str, model_id: &str) -> usize {
        self.count_with(text, Self::tokenizer(model_id))
    }
}
