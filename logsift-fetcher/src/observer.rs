//! Retry and circuit event observation
//!
//! The fetcher emits structured events for every attempt and circuit
//! transition; an external metrics/logging sink consumes them through this
//! narrow interface. The fetcher does not own a logging subsystem — the
//! default [`TracingObserver`] forwards to `tracing` and the embedding
//! process decides where that goes.

use std::time::Duration;

use tracing::{debug, warn};

use crate::circuit::CircuitState;

/// Outcome of a single fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The attempt returned data
    Succeeded,
    /// The attempt failed with a retryable error
    Transient,
    /// The attempt exceeded the per-attempt timeout
    TimedOut,
    /// The attempt failed with a non-retryable error
    Permanent,
    /// The circuit rejected the attempt before the upstream was contacted
    Rejected,
}

/// Structured record of one fetch attempt
#[derive(Debug, Clone)]
pub struct AttemptEvent {
    /// Circuit key of the upstream being called
    pub upstream: String,
    /// 1-based attempt number
    pub attempt: u32,
    /// Attempt ceiling from the retry policy
    pub max_attempts: u32,
    pub outcome: AttemptOutcome,
    /// Backoff delay before the next attempt, when one is scheduled
    pub retry_in: Option<Duration>,
}

/// Observer interface for retry/circuit events
///
/// Default methods are no-ops so implementers opt into what they need.
pub trait FetchObserver: Send + Sync {
    fn on_attempt(&self, _event: &AttemptEvent) {}

    fn on_circuit_transition(&self, _upstream: &str, _from: CircuitState, _to: CircuitState) {}
}

/// Observer that forwards events to `tracing`
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn on_attempt(&self, event: &AttemptEvent) {
        match event.outcome {
            AttemptOutcome::Succeeded => {
                debug!(
                    upstream = %event.upstream,
                    attempt = event.attempt,
                    "fetch attempt succeeded"
                );
            }
            outcome => {
                warn!(
                    upstream = %event.upstream,
                    attempt = event.attempt,
                    max_attempts = event.max_attempts,
                    outcome = ?outcome,
                    retry_in = ?event.retry_in,
                    "fetch attempt failed"
                );
            }
        }
    }

    fn on_circuit_transition(&self, upstream: &str, from: CircuitState, to: CircuitState) {
        warn!(upstream, %from, %to, "circuit transition");
    }
}
