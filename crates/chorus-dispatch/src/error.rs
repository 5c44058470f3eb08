//! Dispatch-level errors

use thiserror::Error;

/// Errors that fail a whole dispatch rather than a single provider.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Every requested provider was skipped or failed with no recoverable
    /// text. This is the only fatal outcome; partial success settles normally.
    #[error("all providers failed: {summary}")]
    AllProvidersFailed {
        /// Per-provider error codes joined for diagnostics.
        summary: String,
    },

    /// The request named no providers.
    #[error("no providers requested")]
    NoProviders,

    /// A provider id with no registered adapter was requested.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}
