//! Structured provider failures.
//!
//! A failure is a chain of records, outermost first. It is only turned
//! into text when persisted or returned, via [`ProviderFailure::render`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator placed between chained failure messages.
pub const CAUSED_BY: &str = "\nCaused by: ";

/// What kind of failure a record describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Upstream answered with a non-success HTTP status.
    Http {
        /// HTTP status code
        status: u16,
        /// Response body as received
        body: String,
    },
    /// Request never produced a response (DNS, TLS, connection reset).
    Transport,
    /// The call exceeded the configured per-call timeout.
    Timeout,
    /// Response arrived but could not be decoded.
    Decode,
    /// Provider not registered, missing credentials, malformed model identifier.
    Configuration,
    /// Anything else.
    Other,
}

/// One record in a provider failure chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    /// Failure kind.
    #[serde(flatten)]
    pub kind: FailureKind,
    /// Human-readable message for this level.
    pub message: String,
    /// The failure this one wraps, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ProviderFailure>>,
}

impl ProviderFailure {
    /// Create a failure record without a cause.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Upstream HTTP error.
    #[must_use]
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::new(
            FailureKind::Http {
                status,
                body: body.into(),
            },
            format!("upstream returned HTTP {status}"),
        )
    }

    /// Transport-level failure.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message)
    }

    /// Per-call timeout.
    #[must_use]
    pub fn timeout(model: &str, seconds: f64) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("call to {model} timed out after {seconds:.1}s"),
        )
    }

    /// Undecodable response.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Decode, message)
    }

    /// Configuration problem.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Configuration, message)
    }

    /// Wrap `cause` under this failure.
    #[must_use]
    pub fn caused_by(mut self, cause: Self) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Iterate the chain, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(Some(self), |f| f.cause.as_deref())
    }

    /// The first HTTP record in the chain, if any.
    #[must_use]
    pub fn http_error(&self) -> Option<(u16, &str)> {
        self.chain().find_map(|f| match &f.kind {
            FailureKind::Http { status, body } => Some((*status, body.as_str())),
            _ => None,
        })
    }

    /// Render the chain as one message.
    ///
    /// If an upstream HTTP error is in the chain, the status code and body
    /// are reported under the outermost message, or alone when the outermost
    /// record is the HTTP error. Otherwise every message in the chain is
    /// joined with `"\nCaused by: "`.
    #[must_use]
    pub fn render(&self) -> String {
        if let Some((status, body)) = self.http_error() {
            let detail = format!("HTTP {status}: {body}");
            return match self.kind {
                FailureKind::Http { .. } => detail,
                _ => format!("{}{CAUSED_BY}{detail}", self.message),
            };
        }
        self.chain()
            .map(|f| f.message.as_str())
            .collect::<Vec<_>>()
            .join(CAUSED_BY)
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl std::error::Error for ProviderFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn std::error::Error + 'static))
    }
}
