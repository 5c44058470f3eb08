//! Provider and capability error taxonomy
//!
//! Every failure a provider can produce is one of the variants below, so the
//! dispatcher, health tracker, and callers agree on classification. Fatal
//! aggregate failures live in the dispatch layer; everything here is a
//! per-item status.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors a single provider request can produce.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderError {
    /// The provider's circuit is open; retryable after the reported delay.
    #[error("circuit open, retry after {retry_after_ms}ms")]
    CircuitOpen {
        /// Milliseconds until a half-open trial is allowed.
        retry_after_ms: u64,
    },

    /// The prompt exceeds the provider's input limit; retryable shorter.
    #[error("input too long: {length} chars exceeds limit {limit}")]
    InputTooLong {
        /// Prompt length in characters.
        length: usize,
        /// Provider-specific limit.
        limit: usize,
    },

    /// Authentication-class failure; triggers fallback-provider substitution.
    #[error("provider authentication failed: {0}")]
    AuthFailed(String),

    /// Generic upstream failure.
    #[error("provider error: {0}")]
    Upstream(String),

    /// The provider produced no usable text after recovery attempts.
    #[error("empty response")]
    EmptyResponse,

    /// The request was cancelled (abort or deadline).
    #[error("request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Stable machine-readable code for persistence and error maps.
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::CircuitOpen { .. } => "circuit_open",
            ProviderError::InputTooLong { .. } => "input_too_long",
            ProviderError::AuthFailed(_) => "provider_auth_failed",
            ProviderError::Upstream(_) => "provider_error",
            ProviderError::EmptyResponse => "empty_response",
            ProviderError::Cancelled => "cancelled",
        }
    }

    /// Whether the same request may be retried against the same provider.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::CircuitOpen { .. }
                | ProviderError::InputTooLong { .. }
                | ProviderError::Upstream(_)
        )
    }

    /// Whether this failure should trigger provider substitution.
    pub fn is_auth(&self) -> bool {
        matches!(self, ProviderError::AuthFailed(_))
    }

    /// Whether this failure should count against the provider's circuit.
    ///
    /// Skips (open circuit, oversized input) and cancellations are not the
    /// provider's fault and must not trip the breaker.
    pub fn counts_as_failure(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthFailed(_)
                | ProviderError::Upstream(_)
                | ProviderError::EmptyResponse
        )
    }
}

/// Errors from the external claim-labeling capability.
#[derive(Debug, Error)]
pub enum MapperError {
    /// The mapper call itself failed.
    #[error("mapper call failed: {0}")]
    Call(String),

    /// The mapper's structured output was malformed. Non-fatal: the turn
    /// degrades to a raw-text-only artifact.
    #[error("mapper output malformed: {0}")]
    ParseFailed(String),
}

/// Errors from the context persistence capability.
#[derive(Debug, Error)]
pub enum ContextError {
    /// No contexts stored for the requested session.
    #[error("no contexts for session {0}")]
    NotFound(String),

    /// Underlying storage failure.
    #[error("context storage error: {0}")]
    Storage(String),
}
