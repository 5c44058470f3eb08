//! Concurrent fan-out request execution
//!
//! One task per requested provider, isolated so one provider's failure or
//! cancellation cannot affect the others. Streamed deltas are captured as
//! they arrive so that a provider erroring after partial output still
//! contributes its partial text to the settlement.

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::events::{DispatchEvent, FanoutSettlement, ProviderOutcome, ProviderStatus};
use crate::health::HealthTracker;
use crate::registry::AbortRegistry;
use chorus_domain::traits::{ProviderAdapter, ProviderMeta, ProviderReply};
use chorus_domain::{ProviderError, ProviderId, SessionId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

/// One fan-out request: a prompt to run against a set of providers.
#[derive(Debug, Clone)]
pub struct FanoutRequest {
    /// Owning session.
    pub session: SessionId,
    /// Step label for logging (`prompt`, `mapping`, `survey`).
    pub step: String,
    /// The prompt text sent to every provider.
    pub prompt: String,
    /// Requested providers, in order. Duplicates are ignored.
    pub providers: Vec<ProviderId>,
    /// Per-provider conversational contexts.
    pub contexts: HashMap<ProviderId, String>,
    /// Skip the health gate (explicit recompute).
    pub bypass_health: bool,
    /// Deadline racing the whole dispatch; falls back to the configured
    /// default when absent.
    pub deadline: Option<Duration>,
}

impl FanoutRequest {
    /// A request with default options.
    pub fn new(
        session: SessionId,
        step: impl Into<String>,
        prompt: impl Into<String>,
        providers: Vec<ProviderId>,
    ) -> Self {
        Self {
            session,
            step: step.into(),
            prompt: prompt.into(),
            providers,
            contexts: HashMap::new(),
            bypass_health: false,
            deadline: None,
        }
    }
}

struct TaskOutcome {
    provider: ProviderId,
    result: Result<ProviderReply, ProviderError>,
    partial: String,
}

struct SettleState {
    outcomes: BTreeMap<ProviderId, ProviderOutcome>,
    errors: BTreeMap<ProviderId, ProviderError>,
    // Health bookkeeping is idempotent per provider per dispatch.
    reported: HashSet<ProviderId>,
    pending: HashSet<ProviderId>,
    events: Option<UnboundedSender<DispatchEvent>>,
}

impl SettleState {
    fn emit_done(&self, provider: &ProviderId, status: ProviderStatus) {
        if let Some(events) = &self.events {
            let _ = events.send(DispatchEvent::ProviderDone {
                provider: provider.clone(),
                status,
            });
        }
    }
}

/// Executes prompts against N providers concurrently and joins the results
/// into a single settlement.
pub struct FanoutDispatcher {
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
    health: Arc<HealthTracker>,
    registry: Arc<AbortRegistry>,
    config: DispatchConfig,
}

impl FanoutDispatcher {
    /// Create a dispatcher with no registered adapters.
    pub fn new(config: DispatchConfig) -> Self {
        let health = Arc::new(HealthTracker::new(config.health.clone()));
        Self {
            adapters: HashMap::new(),
            health,
            registry: Arc::new(AbortRegistry::new()),
            config,
        }
    }

    /// Register a provider adapter under its own id.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    /// The dispatcher's circuit-breaker state.
    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    /// The per-session abort registry.
    pub fn registry(&self) -> &Arc<AbortRegistry> {
        &self.registry
    }

    /// Run one fan-out.
    ///
    /// Streams [`DispatchEvent`]s on `events` as providers produce deltas and
    /// resolve; returns the settlement exactly once, strictly after every
    /// provider task has individually resolved.
    ///
    /// # Errors
    ///
    /// Fails with [`DispatchError::AllProvidersFailed`] only when no provider
    /// yields text or partial text; partial success settles normally.
    pub async fn dispatch(
        &self,
        request: FanoutRequest,
        events: Option<UnboundedSender<DispatchEvent>>,
    ) -> Result<FanoutSettlement, DispatchError> {
        // Dedup while preserving request order.
        let mut providers: Vec<ProviderId> = Vec::new();
        for p in &request.providers {
            if !providers.contains(p) {
                providers.push(p.clone());
            }
        }
        if providers.is_empty() {
            return Err(DispatchError::NoProviders);
        }
        for p in &providers {
            if !self.adapters.contains_key(p) {
                return Err(DispatchError::UnknownProvider(p.to_string()));
            }
        }

        info!(
            session = %request.session,
            step = %request.step,
            providers = providers.len(),
            "dispatch started"
        );

        let dispatch_token = self.registry.register(&request.session);
        let mut state = SettleState {
            outcomes: BTreeMap::new(),
            errors: BTreeMap::new(),
            reported: HashSet::new(),
            pending: HashSet::new(),
            events,
        };

        let mut set: JoinSet<TaskOutcome> = JoinSet::new();
        for pid in &providers {
            let adapter = Arc::clone(&self.adapters[pid]);

            if !request.bypass_health {
                let decision = self.health.should_attempt(pid);
                if let Some(retry_after_ms) = decision.retry_after_ms() {
                    debug!(provider = %pid, retry_after_ms, "skipped: circuit open");
                    state.outcomes.insert(pid.clone(), ProviderOutcome::skipped());
                    state
                        .errors
                        .insert(pid.clone(), ProviderError::CircuitOpen { retry_after_ms });
                    state.emit_done(pid, ProviderStatus::Skipped);
                    continue;
                }
            }

            let limit = adapter.max_input_chars();
            if request.prompt.len() > limit {
                debug!(provider = %pid, limit, "skipped: input too long");
                state.outcomes.insert(pid.clone(), ProviderOutcome::skipped());
                state.errors.insert(
                    pid.clone(),
                    ProviderError::InputTooLong {
                        length: request.prompt.len(),
                        limit,
                    },
                );
                state.emit_done(pid, ProviderStatus::Skipped);
                continue;
            }

            state.pending.insert(pid.clone());
            let prompt = request.prompt.clone();
            let context = request.contexts.get(pid).cloned();
            let session = request.session.clone();
            let task_events = state.events.clone();
            let provider = pid.clone();
            let token = dispatch_token.child_token();

            set.spawn(async move {
                let (tx, mut rx) = mpsc::unbounded_channel::<String>();
                let ask = adapter.ask(&prompt, context.as_deref(), &session, tx, token);
                tokio::pin!(ask);

                let mut partial = String::new();
                let mut chunks_open = true;
                let result = loop {
                    tokio::select! {
                        res = &mut ask => {
                            // Drain chunks emitted just before resolution.
                            while let Ok(chunk) = rx.try_recv() {
                                if let Some(events) = &task_events {
                                    let _ = events.send(DispatchEvent::Delta {
                                        provider: provider.clone(),
                                        text: chunk.clone(),
                                    });
                                }
                                partial.push_str(&chunk);
                            }
                            break res;
                        }
                        maybe = rx.recv(), if chunks_open => {
                            match maybe {
                                Some(chunk) => {
                                    if let Some(events) = &task_events {
                                        let _ = events.send(DispatchEvent::Delta {
                                            provider: provider.clone(),
                                            text: chunk.clone(),
                                        });
                                    }
                                    partial.push_str(&chunk);
                                }
                                None => chunks_open = false,
                            }
                        }
                    }
                };

                TaskOutcome {
                    provider,
                    result,
                    partial,
                }
            });
        }

        // Join barrier, raced against the deadline. On expiry every provider
        // token is cancelled and partials are recovered via the normal path.
        let deadline = request.deadline.or_else(|| self.config.default_deadline());
        if let Some(d) = deadline {
            let timer = tokio::time::sleep(d);
            tokio::pin!(timer);
            let mut timed_out = false;
            loop {
                tokio::select! {
                    _ = &mut timer, if !timed_out => {
                        warn!(session = %request.session, "dispatch deadline elapsed, cancelling remaining providers");
                        dispatch_token.cancel();
                        timed_out = true;
                    }
                    joined = set.join_next() => {
                        match joined {
                            Some(res) => self.settle(res, &mut state),
                            None => break,
                        }
                    }
                }
            }
        } else {
            while let Some(res) = set.join_next().await {
                self.settle(res, &mut state);
            }
        }

        // A panicked task never reaches settle(); account for it so the
        // settlement still covers every requested provider.
        let unsettled: Vec<ProviderId> = state.pending.iter().cloned().collect();
        for pid in unsettled {
            warn!(provider = %pid, "provider task vanished without settling");
            state.pending.remove(&pid);
            state.outcomes.insert(pid.clone(), ProviderOutcome::failed());
            state
                .errors
                .insert(pid.clone(), ProviderError::Upstream("provider task panicked".into()));
            state.emit_done(&pid, ProviderStatus::Failed);
        }

        let settlement = FanoutSettlement {
            providers,
            outcomes: state.outcomes,
            errors: state.errors,
        };

        if !settlement.has_any_text() {
            let summary = settlement
                .errors
                .iter()
                .map(|(p, e)| format!("{}={}", p, e.code()))
                .collect::<Vec<_>>()
                .join(", ");
            warn!(session = %request.session, %summary, "dispatch yielded no usable text");
            return Err(DispatchError::AllProvidersFailed { summary });
        }

        info!(
            session = %request.session,
            step = %request.step,
            completed = settlement.texts_in_request_order().len(),
            "dispatch settled"
        );
        Ok(settlement)
    }

    fn settle(&self, joined: Result<TaskOutcome, JoinError>, state: &mut SettleState) {
        let task = match joined {
            Ok(task) => task,
            Err(join_err) => {
                // Provider id is unknown here; the post-join sweep marks the
                // vanished provider as failed.
                warn!(error = %join_err, "provider task join error");
                return;
            }
        };

        state.pending.remove(&task.provider);

        let (outcome, error) = match task.result {
            Ok(reply) => {
                let text = if reply.text.is_empty() {
                    task.partial
                } else {
                    reply.text
                };
                if text.is_empty() {
                    (ProviderOutcome::failed(), Some(ProviderError::EmptyResponse))
                } else if let Some(soft) = reply.soft_error {
                    (
                        ProviderOutcome {
                            status: ProviderStatus::CompletedWithSoftError,
                            text,
                            meta: reply.meta,
                            soft_error: Some(soft),
                        },
                        None,
                    )
                } else {
                    (
                        ProviderOutcome {
                            status: ProviderStatus::Completed,
                            text,
                            meta: reply.meta,
                            soft_error: None,
                        },
                        None,
                    )
                }
            }
            Err(err) => {
                if task.partial.is_empty() {
                    (ProviderOutcome::failed(), Some(err))
                } else {
                    // Partial recovery: keep the streamed text, annotate it.
                    (
                        ProviderOutcome {
                            status: ProviderStatus::CompletedWithSoftError,
                            text: task.partial,
                            meta: ProviderMeta::default(),
                            soft_error: Some(err.to_string()),
                        },
                        Some(err),
                    )
                }
            }
        };

        if state.reported.insert(task.provider.clone()) {
            match (&outcome.status, &error) {
                (ProviderStatus::Completed, _) => self.health.record_success(&task.provider),
                (_, Some(e)) if e.counts_as_failure() => self.health.record_failure(&task.provider),
                (ProviderStatus::CompletedWithSoftError, None) => {
                    // Soft error reported by the provider itself, with full
                    // text delivered: the request still succeeded.
                    self.health.record_success(&task.provider)
                }
                _ => {}
            }
        }

        debug!(provider = %task.provider, status = ?outcome.status, "provider settled");
        state.emit_done(&task.provider, outcome.status);
        state.outcomes.insert(task.provider.clone(), outcome);
        if let Some(err) = error {
            state.errors.insert(task.provider.clone(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_no_providers() {
        let dispatcher = FanoutDispatcher::new(DispatchConfig::default());
        let request = FanoutRequest::new(SessionId::new("s"), "prompt", "hi", Vec::new());
        let result = dispatcher.dispatch(request, None).await;
        assert!(matches!(result, Err(DispatchError::NoProviders)));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_provider() {
        let dispatcher = FanoutDispatcher::new(DispatchConfig::default());
        let request = FanoutRequest::new(
            SessionId::new("s"),
            "prompt",
            "hi",
            vec![ProviderId::new("ghost")],
        );
        let result = dispatcher.dispatch(request, None).await;
        assert!(matches!(result, Err(DispatchError::UnknownProvider(_))));
    }
}
