//! Chorus Provider Adapters
//!
//! Implementations of the `ProviderAdapter` capability from `chorus-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: deterministic scripted adapter for testing, including
//!   error-after-partial-stream scripts
//! - `OllamaAdapter`: streaming integration with a local Ollama API

#![warn(missing_docs)]

pub mod ollama;

use async_trait::async_trait;
use chorus_domain::traits::{ChunkSink, ProviderAdapter, ProviderMeta, ProviderReply};
use chorus_domain::{ProviderError, ProviderId, SessionId};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use ollama::OllamaAdapter;

/// What a [`MockProvider`] does when asked.
#[derive(Debug, Clone)]
pub enum MockScript {
    /// Stream the chunks, then reply with their concatenation.
    Reply(Vec<String>),
    /// Stream the chunks, then reply with a soft-error annotation.
    ReplySoft(Vec<String>, String),
    /// Stream the chunks, then fail with the given error.
    FailAfter(Vec<String>, ProviderError),
    /// Fail immediately.
    Fail(ProviderError),
    /// Never resolve until cancelled.
    Hang,
}

/// Deterministic scripted provider for testing.
///
/// # Examples
///
/// ```
/// use chorus_provider::MockProvider;
///
/// let provider = MockProvider::new("gpt", "Hello from the model");
/// assert_eq!(provider.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    id: ProviderId,
    script: MockScript,
    chunk_delay: Option<Duration>,
    max_input_chars: usize,
    call_count: Arc<Mutex<usize>>,
}

impl MockProvider {
    /// A provider that replies with a fixed text in a single chunk.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::scripted(id, MockScript::Reply(vec![text.into()]))
    }

    /// A provider driven by an explicit script.
    pub fn scripted(id: impl Into<String>, script: MockScript) -> Self {
        Self {
            id: ProviderId::new(id.into()),
            script,
            chunk_delay: None,
            max_input_chars: 200_000,
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// A provider that streams the given chunks then errors.
    pub fn fail_after(
        id: impl Into<String>,
        chunks: Vec<&str>,
        error: ProviderError,
    ) -> Self {
        Self::scripted(
            id,
            MockScript::FailAfter(chunks.into_iter().map(String::from).collect(), error),
        )
    }

    /// A provider that fails immediately.
    pub fn failing(id: impl Into<String>, error: ProviderError) -> Self {
        Self::scripted(id, MockScript::Fail(error))
    }

    /// A provider that hangs until cancelled.
    pub fn hanging(id: impl Into<String>) -> Self {
        Self::scripted(id, MockScript::Hang)
    }

    /// Sleep between chunks to exercise interleaving.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Override the provider's input-length limit.
    pub fn with_max_input_chars(mut self, limit: usize) -> Self {
        self.max_input_chars = limit;
        self
    }

    /// Number of times `ask` was called.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    async fn stream_chunks(
        &self,
        chunks: &[String],
        sink: &ChunkSink,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        let mut text = String::new();
        for chunk in chunks {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }
            let _ = sink.send(chunk.clone());
            text.push_str(chunk);
            if let Some(delay) = self.chunk_delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                }
            }
        }
        Ok(text)
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    async fn ask(
        &self,
        _prompt: &str,
        _context: Option<&str>,
        _session: &SessionId,
        chunks: ChunkSink,
        cancel: CancellationToken,
    ) -> Result<ProviderReply, ProviderError> {
        *self.call_count.lock().unwrap() += 1;

        match &self.script {
            MockScript::Reply(parts) => {
                let text = self.stream_chunks(parts, &chunks, &cancel).await?;
                Ok(ProviderReply {
                    text,
                    meta: ProviderMeta {
                        model: Some("mock".to_string()),
                        latency_ms: Some(0),
                    },
                    soft_error: None,
                })
            }
            MockScript::ReplySoft(parts, soft) => {
                let text = self.stream_chunks(parts, &chunks, &cancel).await?;
                Ok(ProviderReply {
                    text,
                    meta: ProviderMeta {
                        model: Some("mock".to_string()),
                        latency_ms: Some(0),
                    },
                    soft_error: Some(soft.clone()),
                })
            }
            MockScript::FailAfter(parts, error) => {
                self.stream_chunks(parts, &chunks, &cancel).await?;
                Err(error.clone())
            }
            MockScript::Fail(error) => Err(error.clone()),
            MockScript::Hang => {
                cancel.cancelled().await;
                Err(ProviderError::Cancelled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn sink() -> (ChunkSink, mpsc::UnboundedReceiver<String>) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn test_mock_reply_streams_chunks() {
        let provider = MockProvider::scripted(
            "m",
            MockScript::Reply(vec!["Hello ".to_string(), "world".to_string()]),
        );
        let (tx, mut rx) = sink();

        let reply = provider
            .ask("prompt", None, &SessionId::new("s"), tx, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reply.text, "Hello world");
        assert_eq!(rx.recv().await.unwrap(), "Hello ");
        assert_eq!(rx.recv().await.unwrap(), "world");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_fail_after_partial() {
        let provider = MockProvider::fail_after(
            "m",
            vec!["partial output"],
            ProviderError::Upstream("connection reset".into()),
        );
        let (tx, mut rx) = sink();

        let result = provider
            .ask("prompt", None, &SessionId::new("s"), tx, CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ProviderError::Upstream(_))));
        // The partial chunk was still delivered before the error.
        assert_eq!(rx.recv().await.unwrap(), "partial output");
    }

    #[tokio::test]
    async fn test_mock_hang_resolves_on_cancel() {
        let provider = MockProvider::hanging("m");
        let (tx, _rx) = sink();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = provider
            .ask("prompt", None, &SessionId::new("s"), tx, cancel)
            .await;
        assert!(matches!(result, Err(ProviderError::Cancelled)));
    }

    #[tokio::test]
    async fn test_mock_clone_shares_call_count() {
        let a = MockProvider::new("m", "text");
        let b = a.clone();
        let (tx, _rx) = sink();

        a.ask("p", None, &SessionId::new("s"), tx, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(b.call_count(), 1);
    }
}
