//! Dispatch events and settlement types

use chorus_domain::traits::ProviderMeta;
use chorus_domain::{ProviderError, ProviderId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Terminal status of one provider within a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    /// Not attempted: circuit open or input too long.
    Skipped,
    /// Full answer received.
    Completed,
    /// The provider errored after partial output; the partial text was
    /// recovered and is annotated with the soft error.
    CompletedWithSoftError,
    /// No usable text was recovered.
    Failed,
}

impl ProviderStatus {
    /// Whether this status carries usable answer text.
    pub fn has_text(&self) -> bool {
        matches!(
            self,
            ProviderStatus::Completed | ProviderStatus::CompletedWithSoftError
        )
    }
}

/// One provider's settled result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderOutcome {
    /// Terminal status.
    pub status: ProviderStatus,
    /// Answer text (partial when recovered from a soft error, empty when
    /// skipped or failed).
    pub text: String,
    /// Provider-reported metadata.
    pub meta: ProviderMeta,
    /// Soft-error annotation for recovered partial answers.
    pub soft_error: Option<String>,
}

impl ProviderOutcome {
    pub(crate) fn skipped() -> Self {
        Self {
            status: ProviderStatus::Skipped,
            text: String::new(),
            meta: ProviderMeta::default(),
            soft_error: None,
        }
    }

    pub(crate) fn failed() -> Self {
        Self {
            status: ProviderStatus::Failed,
            text: String::new(),
            meta: ProviderMeta::default(),
            soft_error: None,
        }
    }
}

/// Streaming events emitted while a dispatch is in flight.
///
/// Delta ordering is guaranteed per provider only; deltas from different
/// providers interleave arbitrarily.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    /// A streamed text chunk from one provider.
    Delta {
        /// Source provider.
        provider: ProviderId,
        /// The chunk text.
        text: String,
    },
    /// One provider resolved (success, failure, or skip). Emitted immediately
    /// for progress reporting; the settlement still arrives exactly once
    /// after every provider resolves.
    ProviderDone {
        /// The provider that resolved.
        provider: ProviderId,
        /// Its terminal status.
        status: ProviderStatus,
    },
}

/// The final settled result of one dispatch.
///
/// The outcome map's keys equal exactly the requested provider set; skip,
/// complete, and fail statuses account for 100% of requested providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanoutSettlement {
    /// Requested providers in request order.
    pub providers: Vec<ProviderId>,
    /// Per-provider results.
    pub outcomes: BTreeMap<ProviderId, ProviderOutcome>,
    /// Per-provider errors (also present for soft-error recoveries).
    pub errors: BTreeMap<ProviderId, ProviderError>,
}

impl FanoutSettlement {
    /// Providers with usable text, in request order, paired with their text.
    pub fn texts_in_request_order(&self) -> Vec<(ProviderId, String)> {
        self.providers
            .iter()
            .filter_map(|p| {
                let outcome = self.outcomes.get(p)?;
                if outcome.status.has_text() && !outcome.text.is_empty() {
                    Some((p.clone(), outcome.text.clone()))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Whether any provider produced usable text.
    pub fn has_any_text(&self) -> bool {
        self.outcomes
            .values()
            .any(|o| o.status.has_text() && !o.text.is_empty())
    }

    /// Providers whose failure was authentication-class; candidates for
    /// fallback substitution.
    pub fn auth_failures(&self) -> Vec<ProviderId> {
        self.errors
            .iter()
            .filter(|(_, e)| e.is_auth())
            .map(|(p, _)| p.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_has_text() {
        assert!(ProviderStatus::Completed.has_text());
        assert!(ProviderStatus::CompletedWithSoftError.has_text());
        assert!(!ProviderStatus::Skipped.has_text());
        assert!(!ProviderStatus::Failed.has_text());
    }

    #[test]
    fn test_texts_in_request_order() {
        let a = ProviderId::new("a");
        let b = ProviderId::new("b");
        let c = ProviderId::new("c");

        let mut outcomes = BTreeMap::new();
        outcomes.insert(
            a.clone(),
            ProviderOutcome {
                status: ProviderStatus::Completed,
                text: "alpha".to_string(),
                meta: ProviderMeta::default(),
                soft_error: None,
            },
        );
        outcomes.insert(b.clone(), ProviderOutcome::failed());
        outcomes.insert(
            c.clone(),
            ProviderOutcome {
                status: ProviderStatus::CompletedWithSoftError,
                text: "gamma".to_string(),
                meta: ProviderMeta::default(),
                soft_error: Some("truncated".to_string()),
            },
        );

        let settlement = FanoutSettlement {
            // Request order differs from BTreeMap key order on purpose.
            providers: vec![c.clone(), a.clone(), b.clone()],
            outcomes,
            errors: BTreeMap::new(),
        };

        let texts = settlement.texts_in_request_order();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].0, c);
        assert_eq!(texts[1].0, a);
        assert!(settlement.has_any_text());
    }

    #[test]
    fn test_auth_failures() {
        let mut errors = BTreeMap::new();
        errors.insert(ProviderId::new("a"), ProviderError::AuthFailed("401".into()));
        errors.insert(ProviderId::new("b"), ProviderError::Upstream("500".into()));

        let settlement = FanoutSettlement {
            providers: vec![ProviderId::new("a"), ProviderId::new("b")],
            outcomes: BTreeMap::new(),
            errors,
        };
        assert_eq!(settlement.auth_failures(), vec![ProviderId::new("a")]);
    }
}
