//! Per-provider circuit-breaker state

use crate::config::HealthConfig;
use chorus_domain::ProviderId;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Answer to "may this provider be attempted right now?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptDecision {
    /// Circuit closed, attempt normally.
    Allowed,
    /// Circuit was open and the cooldown elapsed; this attempt is the single
    /// half-open trial.
    Trial,
    /// Circuit open; retry after the reported delay.
    Open {
        /// Time until a half-open trial will be allowed.
        retry_after: Duration,
    },
}

impl AttemptDecision {
    /// Whether a request may be sent.
    pub fn is_allowed(&self) -> bool {
        matches!(self, AttemptDecision::Allowed | AttemptDecision::Trial)
    }

    /// Retry delay in milliseconds when the circuit is open.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            AttemptDecision::Open { retry_after } => Some(retry_after.as_millis() as u64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CircuitStatus {
    Closed,
    Open { until: Instant },
    // A trial request is in flight; further attempts wait for its outcome.
    HalfOpen,
}

#[derive(Debug, Clone)]
struct CircuitState {
    consecutive_failures: u32,
    status: CircuitStatus,
}

impl CircuitState {
    fn new() -> Self {
        Self {
            consecutive_failures: 0,
            status: CircuitStatus::Closed,
        }
    }
}

/// Process-wide circuit-breaker state, keyed by provider id.
///
/// Failures increment a per-provider counter; once the threshold is crossed
/// the circuit opens for a cooldown window, after which a single half-open
/// trial is allowed. Success resets the counter and closes the circuit.
/// State is partitioned by key, so a single mutex over the map is sufficient:
/// no operation touches more than one provider's entry.
pub struct HealthTracker {
    states: Mutex<HashMap<ProviderId, CircuitState>>,
    config: HealthConfig,
}

impl HealthTracker {
    /// Create a tracker with the given thresholds.
    pub fn new(config: HealthConfig) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Whether the provider may be attempted right now.
    pub fn should_attempt(&self, provider: &ProviderId) -> AttemptDecision {
        let mut states = self.states.lock().unwrap();
        let state = states.entry(provider.clone()).or_insert_with(CircuitState::new);

        match state.status {
            CircuitStatus::Closed => AttemptDecision::Allowed,
            CircuitStatus::Open { until } => {
                let now = Instant::now();
                if now >= until {
                    debug!(provider = %provider, "cooldown elapsed, allowing half-open trial");
                    state.status = CircuitStatus::HalfOpen;
                    AttemptDecision::Trial
                } else {
                    AttemptDecision::Open {
                        retry_after: until - now,
                    }
                }
            }
            CircuitStatus::HalfOpen => AttemptDecision::Open {
                retry_after: self.config.cooldown(),
            },
        }
    }

    /// Record a successful request; closes the circuit and resets the counter.
    pub fn record_success(&self, provider: &ProviderId) {
        let mut states = self.states.lock().unwrap();
        let state = states.entry(provider.clone()).or_insert_with(CircuitState::new);

        if state.status != CircuitStatus::Closed {
            info!(provider = %provider, "circuit closed after successful request");
        }
        state.consecutive_failures = 0;
        state.status = CircuitStatus::Closed;
    }

    /// Record a failed request; opens the circuit once the threshold is
    /// crossed, and immediately on a failed half-open trial.
    pub fn record_failure(&self, provider: &ProviderId) {
        let mut states = self.states.lock().unwrap();
        let state = states.entry(provider.clone()).or_insert_with(CircuitState::new);

        state.consecutive_failures += 1;
        let failed_trial = state.status == CircuitStatus::HalfOpen;

        if failed_trial || state.consecutive_failures >= self.config.failure_threshold {
            let until = Instant::now() + self.config.cooldown();
            state.status = CircuitStatus::Open { until };
            warn!(
                provider = %provider,
                failures = state.consecutive_failures,
                cooldown_secs = self.config.cooldown_secs,
                "circuit opened"
            );
        }
    }

    /// Consecutive-failure count for a provider (0 when unknown).
    pub fn failure_count(&self, provider: &ProviderId) -> u32 {
        let states = self.states.lock().unwrap();
        states
            .get(provider)
            .map(|s| s.consecutive_failures)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn tracker(threshold: u32, cooldown_secs: u64) -> HealthTracker {
        HealthTracker::new(HealthConfig {
            failure_threshold: threshold,
            cooldown_secs,
        })
    }

    fn provider(name: &str) -> ProviderId {
        ProviderId::new(name)
    }

    #[test]
    fn test_closed_circuit_allows() {
        let tracker = tracker(3, 30);
        assert_eq!(tracker.should_attempt(&provider("a")), AttemptDecision::Allowed);
    }

    #[test]
    fn test_opens_after_threshold() {
        let tracker = tracker(3, 30);
        let p = provider("a");

        tracker.record_failure(&p);
        tracker.record_failure(&p);
        assert!(tracker.should_attempt(&p).is_allowed());

        tracker.record_failure(&p);
        let decision = tracker.should_attempt(&p);
        assert!(!decision.is_allowed());
        assert!(decision.retry_after_ms().unwrap() > 0);
    }

    #[test]
    fn test_success_resets() {
        let tracker = tracker(3, 30);
        let p = provider("a");

        tracker.record_failure(&p);
        tracker.record_failure(&p);
        tracker.record_success(&p);
        assert_eq!(tracker.failure_count(&p), 0);

        tracker.record_failure(&p);
        tracker.record_failure(&p);
        assert!(tracker.should_attempt(&p).is_allowed());
    }

    #[test]
    fn test_half_open_trial_after_cooldown() {
        let tracker = tracker(1, 0);
        let p = provider("a");

        tracker.record_failure(&p);
        // Zero cooldown: the next check becomes the half-open trial.
        assert_eq!(tracker.should_attempt(&p), AttemptDecision::Trial);
        // A second attempt while the trial is outstanding is rejected.
        assert!(!tracker.should_attempt(&p).is_allowed());

        tracker.record_success(&p);
        assert_eq!(tracker.should_attempt(&p), AttemptDecision::Allowed);
    }

    #[test]
    fn test_failed_trial_reopens() {
        let tracker = tracker(1, 0);
        let p = provider("a");

        tracker.record_failure(&p);
        assert_eq!(tracker.should_attempt(&p), AttemptDecision::Trial);
        tracker.record_failure(&p);

        // Reopened with a fresh cooldown (still zero, so trial again).
        assert_eq!(tracker.should_attempt(&p), AttemptDecision::Trial);
    }

    #[test]
    fn test_providers_are_independent() {
        let tracker = tracker(1, 30);
        tracker.record_failure(&provider("a"));

        assert!(!tracker.should_attempt(&provider("a")).is_allowed());
        assert!(tracker.should_attempt(&provider("b")).is_allowed());
    }

    #[test]
    fn test_concurrent_access() {
        let tracker = Arc::new(tracker(100, 30));
        let mut handles = Vec::new();

        for i in 0..8 {
            let tracker = Arc::clone(&tracker);
            handles.push(std::thread::spawn(move || {
                let p = provider(if i % 2 == 0 { "even" } else { "odd" });
                for _ in 0..100 {
                    tracker.should_attempt(&p);
                    tracker.record_failure(&p);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.failure_count(&provider("even")), 400);
        assert_eq!(tracker.failure_count(&provider("odd")), 400);
    }
}
