//! Capability trait interfaces
//!
//! All external collaborators are reached through the traits in this module:
//! provider adapters, the embedding backend (see [`crate::embedding`]), the
//! context persistence layer, and the claim-labeling mapper. Infrastructure
//! implementations live in other crates.

use crate::artifact::PreSemanticSummary;
use crate::error::{ContextError, MapperError, ProviderError};
use crate::ids::{ProviderId, SessionId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Channel a provider adapter delivers streamed text chunks on.
///
/// Chunks for one provider arrive in emission order; no ordering is
/// guaranteed across providers.
pub type ChunkSink = UnboundedSender<String>;

/// Metadata a provider reports alongside its answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderMeta {
    /// Upstream model name, when the provider reports one.
    pub model: Option<String>,
    /// Wall-clock latency of the request in milliseconds.
    pub latency_ms: Option<u64>,
}

/// The settled answer from one provider request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderReply {
    /// Full answer text.
    pub text: String,
    /// Provider-reported metadata.
    pub meta: ProviderMeta,
    /// Set when the provider recovered from a non-fatal upstream hiccup
    /// but the text should be treated with reduced confidence.
    pub soft_error: Option<String>,
}

impl ProviderReply {
    /// A plain successful reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            meta: ProviderMeta::default(),
            soft_error: None,
        }
    }
}

/// One upstream LLM provider.
///
/// Implementations must support cancellation and partial-chunk delivery:
/// every chunk sent on `chunks` must also appear in the final reply text,
/// and a cancelled request must return [`ProviderError::Cancelled`] promptly.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// This provider's stable id.
    fn id(&self) -> ProviderId;

    /// Provider-specific input limit in characters.
    fn max_input_chars(&self) -> usize {
        200_000
    }

    /// Send a prompt and stream the answer.
    async fn ask(
        &self,
        prompt: &str,
        context: Option<&str>,
        session: &SessionId,
        chunks: ChunkSink,
        cancel: CancellationToken,
    ) -> Result<ProviderReply, ProviderError>;
}

/// Which pipeline step a persisted provider context belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextRole {
    /// The initial prompt fan-out.
    Prompt,
    /// The mapping (claim-labeling) fan-out.
    Mapping,
    /// The survey follow-up.
    Survey,
}

/// One provider's conversational context for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderContext {
    /// The provider the context belongs to.
    pub provider: ProviderId,
    /// Opaque context blob (conversation/thread state).
    pub context: String,
}

/// Durable storage of per-provider conversation contexts.
///
/// `persist_contexts` is fire-and-forget from the pipeline's perspective:
/// the pipeline spawns the call and never awaits or inspects the result
/// beyond logging.
pub trait ContextStore: Send + Sync {
    /// Persist updated contexts for a session and role.
    fn persist_contexts(
        &self,
        session: &SessionId,
        updates: Vec<ProviderContext>,
        role: ContextRole,
    ) -> Result<(), ContextError>;

    /// Read back contexts for a session and role.
    fn get_contexts(
        &self,
        session: &SessionId,
        role: ContextRole,
    ) -> Result<Vec<ProviderContext>, ContextError>;
}

/// The external claim-labeling capability (an LLM "mapper").
///
/// Consumes the structured pre-semantic summary and returns raw structured
/// text; the pipeline parses it tolerantly and degrades to raw text when
/// parsing fails.
#[async_trait]
pub trait ClaimMapper: Send + Sync {
    /// Label the summarized evidence with claims, edges, and conditionals.
    async fn label(&self, summary: &PreSemanticSummary) -> Result<String, MapperError>;
}
