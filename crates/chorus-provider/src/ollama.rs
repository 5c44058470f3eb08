//! Ollama streaming adapter
//!
//! Integration with Ollama's local LLM API in streaming mode: the generate
//! endpoint returns newline-delimited JSON, each line carrying one response
//! fragment. Fragments are forwarded on the chunk sink as they arrive, and a
//! stream that breaks mid-answer degrades to a soft error with the partial
//! text preserved.

use async_trait::async_trait;
use chorus_domain::traits::{ChunkSink, ProviderAdapter, ProviderMeta, ProviderReply};
use chorus_domain::{ProviderError, ProviderId, SessionId};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default Ollama API endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default request timeout (120 seconds; streaming answers are slow).
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default input limit in characters.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 32_000;

/// Streaming Ollama provider adapter.
pub struct OllamaAdapter {
    id: ProviderId,
    endpoint: String,
    model: String,
    client: reqwest::Client,
    max_input_chars: usize,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

impl OllamaAdapter {
    /// Create an adapter for one model behind one endpoint.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(
        id: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Upstream(format!("client build failed: {}", e)))?;

        Ok(Self {
            id: ProviderId::new(id.into()),
            endpoint: endpoint.into(),
            model: model.into(),
            client,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        })
    }

    /// Create an adapter against the default local endpoint.
    pub fn default_endpoint(
        id: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Self::new(id, DEFAULT_ENDPOINT, model)
    }

    /// Override the input-length limit.
    pub fn with_max_input_chars(mut self, limit: usize) -> Self {
        self.max_input_chars = limit;
        self
    }

    fn classify_status(&self, status: reqwest::StatusCode, body: String) -> ProviderError {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            ProviderError::AuthFailed(format!("HTTP {}: {}", status, body))
        } else if status == reqwest::StatusCode::NOT_FOUND {
            ProviderError::Upstream(format!("model not available: {}", self.model))
        } else {
            ProviderError::Upstream(format!("HTTP {}: {}", status, body))
        }
    }
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    async fn ask(
        &self,
        prompt: &str,
        _context: Option<&str>,
        _session: &SessionId,
        chunks: ChunkSink,
        cancel: CancellationToken,
    ) -> Result<ProviderReply, ProviderError> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: true,
        };
        let started = Instant::now();

        let response = tokio::select! {
            res = self.client.post(&url).json(&body).send() => {
                res.map_err(|e| ProviderError::Upstream(format!("request failed: {}", e)))?
            }
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(self.classify_status(status, body));
        }

        let mut stream = response.bytes_stream();
        let mut text = String::new();
        let mut line_buf = String::new();
        let mut broke_mid_stream: Option<String> = None;

        'outer: loop {
            let next = tokio::select! {
                next = stream.next() => next,
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            };

            match next {
                Some(Ok(bytes)) => {
                    line_buf.push_str(&String::from_utf8_lossy(&bytes));
                    while let Some(pos) = line_buf.find('\n') {
                        let line: String = line_buf.drain(..=pos).collect();
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<GenerateChunk>(line) {
                            Ok(chunk) => {
                                if !chunk.response.is_empty() {
                                    let _ = chunks.send(chunk.response.clone());
                                    text.push_str(&chunk.response);
                                }
                                if chunk.done {
                                    break 'outer;
                                }
                            }
                            Err(e) => {
                                warn!(provider = %self.id, error = %e, "unparseable stream line");
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    broke_mid_stream = Some(format!("stream broke: {}", e));
                    break;
                }
                None => break,
            }
        }

        if text.is_empty() {
            return Err(match broke_mid_stream {
                Some(reason) => ProviderError::Upstream(reason),
                None => ProviderError::EmptyResponse,
            });
        }

        debug!(
            provider = %self.id,
            chars = text.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "ollama answer settled"
        );
        Ok(ProviderReply {
            text,
            meta: ProviderMeta {
                model: Some(self.model.clone()),
                latency_ms: Some(started.elapsed().as_millis() as u64),
            },
            soft_error: broke_mid_stream,
        })
    }
}
