//! Opaque stable identifiers
//!
//! Every id that crosses a stage boundary is an opaque string, safe to
//! persist and re-reference across turns. Statement, paragraph, claim, and
//! region ids are *derived* (deterministic from their inputs) so that
//! re-running extraction over identical text reproduces identical ids.
//! Session ids are UUIDv7 for chronological sortability.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier string.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id! {
    /// Identifies one upstream LLM provider (e.g. `"gpt"`, `"claude"`).
    ProviderId
}

string_id! {
    /// Stable id of an extracted statement, derived from its source position.
    StatementId
}

string_id! {
    /// Stable id of a paragraph citation unit, derived from its source position.
    ParagraphId
}

string_id! {
    /// Stable id of a synthesized claim.
    ClaimId
}

string_id! {
    /// Stable id of a substrate region (cluster).
    RegionId
}

string_id! {
    /// Identifies one conversation session.
    SessionId
}

impl StatementId {
    /// Derive the id for the `ordinal`-th statement of model `model_index`.
    pub fn derive(model_index: usize, ordinal: usize) -> Self {
        Self(format!("s{}.{}", model_index, ordinal))
    }
}

impl ParagraphId {
    /// Derive the id for the `ordinal`-th paragraph of model `model_index`.
    pub fn derive(model_index: usize, ordinal: usize) -> Self {
        Self(format!("p{}.{}", model_index, ordinal))
    }
}

impl ClaimId {
    /// Derive the id for the `ordinal`-th claim returned by the mapper.
    pub fn derive(ordinal: usize) -> Self {
        Self(format!("c{}", ordinal))
    }
}

impl RegionId {
    /// Derive the id for the `ordinal`-th substrate region.
    pub fn derive(ordinal: usize) -> Self {
        Self(format!("r{}", ordinal))
    }
}

impl SessionId {
    /// Generate a fresh UUIDv7-based session id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }
}
