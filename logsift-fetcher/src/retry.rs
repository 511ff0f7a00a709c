//! Retry executor
//!
//! Wraps every outbound call to an upstream log source with exponential
//! backoff and the circuit breaker. Transient errors are retried per
//! policy; permanent errors propagate immediately; per-attempt timeouts
//! count as transient. Cancellation is observed at attempt and backoff
//! boundaries.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use logsift_core::domain::fetch::FetchFailure;

use crate::circuit::{Admission, CircuitBreakerRegistry, Transition};
use crate::config::RetryPolicy;
use crate::observer::{AttemptEvent, AttemptOutcome, FetchObserver};
use crate::source::SourceError;

/// Executes operations under a retry policy and circuit breaker
pub struct RetryExecutor {
    policy: RetryPolicy,
    attempt_timeout: Duration,
    circuit: Arc<CircuitBreakerRegistry>,
    observer: Arc<dyn FetchObserver>,
}

impl RetryExecutor {
    /// Creates an executor
    ///
    /// # Arguments
    /// * `policy` - Retry/backoff configuration
    /// * `attempt_timeout` - Per-attempt ceiling; expiry counts as transient
    /// * `circuit` - Shared circuit registry, keyed by upstream identity
    /// * `observer` - Sink for attempt and circuit events
    pub fn new(
        policy: RetryPolicy,
        attempt_timeout: Duration,
        circuit: Arc<CircuitBreakerRegistry>,
        observer: Arc<dyn FetchObserver>,
    ) -> Self {
        Self {
            policy,
            attempt_timeout,
            circuit,
            observer,
        }
    }

    /// Runs `operation` until it succeeds, fails permanently, exhausts the
    /// policy, or is rejected by the circuit for `upstream`
    ///
    /// The operation receives the 1-based attempt number.
    pub async fn execute<T, F, Fut>(
        &self,
        upstream: &str,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<T, FetchFailure>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            if cancel.is_cancelled() {
                return Err(FetchFailure::cancelled());
            }

            let (admission, transition) = self.circuit.admit(upstream);
            self.emit_transition(upstream, transition);

            if admission == Admission::Rejected {
                self.emit_attempt(upstream, attempt, AttemptOutcome::Rejected, None);
                return Err(FetchFailure::circuit_open(format!(
                    "upstream {} circuit open",
                    upstream
                )));
            }
            let trial = admission == Admission::Trial;

            let attempt_result =
                tokio::time::timeout(self.attempt_timeout, operation(attempt)).await;

            let (message, outcome) = match attempt_result {
                Ok(Ok(value)) => {
                    let transition = self.circuit.record_success(upstream);
                    self.emit_transition(upstream, transition);
                    self.emit_attempt(upstream, attempt, AttemptOutcome::Succeeded, None);
                    return Ok(value);
                }
                Ok(Err(SourceError::Cancelled)) => {
                    if trial {
                        self.circuit.release_trial(upstream);
                    }
                    return Err(FetchFailure::cancelled());
                }
                Ok(Err(SourceError::Permanent(message))) => {
                    // A permanent error is an answer, not an outage; it
                    // leaves the breaker counter untouched.
                    if trial {
                        self.circuit.release_trial(upstream);
                    }
                    self.emit_attempt(upstream, attempt, AttemptOutcome::Permanent, None);
                    return Err(FetchFailure::permanent(message));
                }
                Ok(Err(SourceError::Transient(message))) => (message, AttemptOutcome::Transient),
                Err(_elapsed) => (
                    format!("attempt timed out after {:?}", self.attempt_timeout),
                    AttemptOutcome::TimedOut,
                ),
            };

            let transition = self.circuit.record_failure(upstream);
            self.emit_transition(upstream, transition);

            if attempt >= self.policy.max_attempts {
                self.emit_attempt(upstream, attempt, outcome, None);
                warn!(
                    upstream,
                    attempts = attempt,
                    "giving up on upstream: {}",
                    message
                );
                return Err(FetchFailure::transient(format!(
                    "{} (after {} attempts)",
                    message, attempt
                )));
            }

            let delay = backoff_delay(&self.policy, upstream, attempt);
            self.emit_attempt(upstream, attempt, outcome, Some(delay));
            debug!(upstream, attempt, ?delay, "retrying after backoff");

            tokio::select! {
                _ = cancel.cancelled() => return Err(FetchFailure::cancelled()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn emit_attempt(
        &self,
        upstream: &str,
        attempt: u32,
        outcome: AttemptOutcome,
        retry_in: Option<Duration>,
    ) {
        self.observer.on_attempt(&AttemptEvent {
            upstream: upstream.to_string(),
            attempt,
            max_attempts: self.policy.max_attempts,
            outcome,
            retry_in,
        });
    }

    fn emit_transition(&self, upstream: &str, transition: Option<Transition>) {
        if let Some(t) = transition {
            self.observer.on_circuit_transition(upstream, t.from, t.to);
        }
    }
}

/// Delay inserted after the given failed attempt (1-based)
///
/// `base_delay * multiplier^(attempt-1)` plus bounded deterministic jitter,
/// never exceeding `max_delay`.
pub(crate) fn backoff_delay(policy: &RetryPolicy, upstream: &str, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1) as i32;
    let exponential = policy.base_delay.as_millis() as f64 * policy.multiplier.powi(exponent);
    let capped = exponential.min(policy.max_delay.as_millis() as f64) as u64;

    let jittered = capped.saturating_add(jitter_ms(policy.jitter, upstream, attempt));
    Duration::from_millis(jittered.min(policy.max_delay.as_millis() as u64))
}

/// Deterministic jitter in `[0, bound]`, keyed by upstream and attempt
///
/// Hash-derived rather than random so schedules are reproducible in tests
/// while still de-synchronizing callers hitting the same upstream.
fn jitter_ms(bound: Duration, upstream: &str, attempt: u32) -> u64 {
    let bound_ms = bound.as_millis() as u64;
    if bound_ms == 0 {
        return 0;
    }

    let mut hasher = DefaultHasher::new();
    upstream.hash(&mut hasher);
    attempt.hash(&mut hasher);
    hasher.finish() % (bound_ms + 1)
}
