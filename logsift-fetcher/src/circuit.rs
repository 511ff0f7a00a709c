//! Circuit breaker for upstream protection
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: upstream assumed down, calls fail fast
//! - Half-Open: testing whether the upstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_threshold transient failures within failure_window
//! Open → Half-Open: first admission after the cooldown elapses
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails
//! ```
//!
//! Breakers are kept per upstream key so one flaky endpoint does not starve
//! others. The registry is process-wide state: it outlives individual
//! batches and is reset only explicitly. The lock guards state transitions
//! only and is never held across I/O.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;

/// Per-upstream circuit state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        };
        write!(f, "{}", name)
    }
}

/// Admission decision for one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Circuit closed; the call may proceed
    Allowed,
    /// Half-open trial granted to this caller alone
    Trial,
    /// Circuit open, or a trial is already in flight; fail fast
    Rejected,
}

/// A state change produced by an operation, for event emission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

#[derive(Debug)]
struct Breaker {
    state: CircuitState,
    failures: u32,
    window_start: Option<Instant>,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

impl Default for Breaker {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            window_start: None,
            opened_at: None,
            trial_in_flight: false,
        }
    }
}

/// Owned map of circuit breakers keyed by upstream identity
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: Mutex<HashMap<String, Breaker>>,
}

impl CircuitBreakerRegistry {
    /// Creates a registry with no tracked upstreams
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Decides whether a call to `key` may proceed
    ///
    /// An open circuit whose cooldown has elapsed moves to half-open and
    /// grants the caller the single trial slot; the accompanying transition
    /// is returned for event emission.
    pub fn admit(&self, key: &str) -> (Admission, Option<Transition>) {
        let mut breakers = self.breakers.lock().unwrap();
        let breaker = breakers.entry(key.to_string()).or_default();

        match breaker.state {
            CircuitState::Closed => (Admission::Allowed, None),
            CircuitState::Open => {
                let cooled_down = breaker
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.cooldown);
                if cooled_down {
                    breaker.state = CircuitState::HalfOpen;
                    breaker.trial_in_flight = true;
                    (
                        Admission::Trial,
                        Some(Transition {
                            from: CircuitState::Open,
                            to: CircuitState::HalfOpen,
                        }),
                    )
                } else {
                    (Admission::Rejected, None)
                }
            }
            CircuitState::HalfOpen => {
                if breaker.trial_in_flight {
                    (Admission::Rejected, None)
                } else {
                    breaker.trial_in_flight = true;
                    (Admission::Trial, None)
                }
            }
        }
    }

    /// Records a successful call to `key`
    ///
    /// Resets the failure counter; a half-open trial success closes the
    /// circuit.
    pub fn record_success(&self, key: &str) -> Option<Transition> {
        let mut breakers = self.breakers.lock().unwrap();
        let breaker = breakers.entry(key.to_string()).or_default();

        breaker.failures = 0;
        breaker.window_start = None;
        breaker.trial_in_flight = false;

        if breaker.state == CircuitState::HalfOpen {
            breaker.state = CircuitState::Closed;
            breaker.opened_at = None;
            Some(Transition {
                from: CircuitState::HalfOpen,
                to: CircuitState::Closed,
            })
        } else {
            None
        }
    }

    /// Records a transient failure against `key`
    ///
    /// A half-open trial failure reopens the circuit; in the closed state
    /// the failure counts toward the threshold within the trailing window.
    pub fn record_failure(&self, key: &str) -> Option<Transition> {
        let mut breakers = self.breakers.lock().unwrap();
        let breaker = breakers.entry(key.to_string()).or_default();
        let now = Instant::now();

        match breaker.state {
            CircuitState::HalfOpen => {
                breaker.state = CircuitState::Open;
                breaker.opened_at = Some(now);
                breaker.trial_in_flight = false;
                Some(Transition {
                    from: CircuitState::HalfOpen,
                    to: CircuitState::Open,
                })
            }
            CircuitState::Closed => {
                let window_expired = breaker
                    .window_start
                    .is_none_or(|start| now.duration_since(start) > self.config.failure_window);
                if window_expired {
                    breaker.window_start = Some(now);
                    breaker.failures = 1;
                } else {
                    breaker.failures += 1;
                }

                if breaker.failures >= self.config.failure_threshold {
                    breaker.state = CircuitState::Open;
                    breaker.opened_at = Some(now);
                    Some(Transition {
                        from: CircuitState::Closed,
                        to: CircuitState::Open,
                    })
                } else {
                    None
                }
            }
            // Failures reported by calls admitted before the circuit opened
            // do not change the state.
            CircuitState::Open => None,
        }
    }

    /// Releases a granted trial slot without recording an outcome
    ///
    /// Used when a trial call is abandoned (cancellation) so the slot does
    /// not leak.
    pub fn release_trial(&self, key: &str) {
        let mut breakers = self.breakers.lock().unwrap();
        if let Some(breaker) = breakers.get_mut(key) {
            breaker.trial_in_flight = false;
        }
    }

    /// Current state for `key`; untracked keys are closed
    pub fn state(&self, key: &str) -> CircuitState {
        let breakers = self.breakers.lock().unwrap();
        breakers
            .get(key)
            .map(|b| b.state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Drops all tracked breakers, returning every upstream to closed
    pub fn reset(&self) {
        self.breakers.lock().unwrap().clear();
    }
}
