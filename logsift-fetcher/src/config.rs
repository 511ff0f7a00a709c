//! Fetcher configuration
//!
//! Defines all configurable parameters for the fetch pipeline: retry and
//! circuit breaker behavior, memory caps for log retrieval, extraction
//! filters, and batch concurrency.
//!
//! Settings are immutable after construction; the orchestrator receives one
//! value and never mutates it.

use std::time::Duration;

/// Retry behavior for upstream calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts per operation (including the first)
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub base_delay: Duration,

    /// Multiplier applied to the delay after each failed attempt
    pub multiplier: f64,

    /// Upper bound on the jitter added to each delay; zero disables jitter
    pub jitter: Duration,

    /// Ceiling no computed delay may exceed
    pub max_delay: Duration,
}

/// Circuit breaker behavior, per upstream key
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive transient failures within the window that open the circuit
    pub failure_threshold: u32,

    /// Trailing window in which failures are counted
    pub failure_window: Duration,

    /// How long an open circuit rejects calls before allowing a trial
    pub cooldown: Duration,
}

/// Memory caps for log retrieval
#[derive(Debug, Clone)]
pub struct FetchLimits {
    /// Lines requested in the tail phase
    pub tail_line_limit: usize,

    /// Maximum lines retained during the streaming phase; must exceed
    /// `tail_line_limit`
    pub max_total_lines: usize,

    /// Lines requested per chunk in the streaming phase
    pub chunk_lines: usize,
}

/// Extraction filters and context sizes
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Case-insensitive substrings that mark a line as an error
    pub signatures: Vec<String>,

    /// Case-insensitive substrings that veto a signature match on the same line
    pub ignore_patterns: Vec<String>,

    /// Context lines captured before each match
    pub before_lines: usize,

    /// Context lines captured after each match
    pub after_lines: usize,

    /// Maximum matches collected per job; keeps extraction memory bounded
    /// even when every line of a huge log matches
    pub max_matches: usize,
}

/// Fetcher settings
///
/// All limits and intervals are configurable to allow tuning for different
/// upstream systems (fast internal CI vs rate-limited public APIs).
#[derive(Debug, Clone)]
pub struct Settings {
    pub retry: RetryPolicy,
    pub circuit: CircuitBreakerConfig,
    pub limits: FetchLimits,
    pub extractor: ExtractorConfig,

    /// Max jobs fetched concurrently within a batch
    pub max_parallel_jobs: usize,

    /// Timeout for each individual fetch attempt; expiry counts as a
    /// transient failure
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            jitter: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            cooldown: Duration::from_secs(30),
        }
    }
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            tail_line_limit: 5_000,
            max_total_lines: 20_000,
            chunk_lines: 2_000,
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            signatures: vec![
                "error".to_string(),
                "failed".to_string(),
                "fatal".to_string(),
                "exception".to_string(),
                "traceback".to_string(),
            ],
            ignore_patterns: vec![
                "0 errors".to_string(),
                "0 failed".to_string(),
                "errors: 0".to_string(),
            ],
            before_lines: 5,
            after_lines: 5,
            max_matches: 100,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            circuit: CircuitBreakerConfig::default(),
            limits: FetchLimits::default(),
            extractor: ExtractorConfig::default(),
            max_parallel_jobs: 4,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl Settings {
    /// Creates settings from environment variables
    ///
    /// Every variable is optional; unset or unparseable values fall back to
    /// the defaults. Expected environment variables:
    /// - LOGSIFT_MAX_ATTEMPTS, LOGSIFT_BASE_DELAY_MS,
    ///   LOGSIFT_BACKOFF_MULTIPLIER, LOGSIFT_JITTER_MS, LOGSIFT_MAX_DELAY_MS
    /// - LOGSIFT_CIRCUIT_THRESHOLD, LOGSIFT_CIRCUIT_WINDOW_SECS,
    ///   LOGSIFT_CIRCUIT_COOLDOWN_SECS
    /// - LOGSIFT_TAIL_LINES, LOGSIFT_MAX_TOTAL_LINES, LOGSIFT_CHUNK_LINES
    /// - LOGSIFT_SIGNATURES, LOGSIFT_IGNORE_PATTERNS (comma-separated),
    ///   LOGSIFT_BEFORE_LINES, LOGSIFT_AFTER_LINES, LOGSIFT_MAX_MATCHES
    /// - LOGSIFT_MAX_PARALLEL_JOBS, LOGSIFT_ATTEMPT_TIMEOUT_SECS
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let retry = RetryPolicy {
            max_attempts: env_parse("LOGSIFT_MAX_ATTEMPTS", defaults.retry.max_attempts),
            base_delay: env_millis("LOGSIFT_BASE_DELAY_MS", defaults.retry.base_delay),
            multiplier: env_parse("LOGSIFT_BACKOFF_MULTIPLIER", defaults.retry.multiplier),
            jitter: env_millis("LOGSIFT_JITTER_MS", defaults.retry.jitter),
            max_delay: env_millis("LOGSIFT_MAX_DELAY_MS", defaults.retry.max_delay),
        };

        let circuit = CircuitBreakerConfig {
            failure_threshold: env_parse(
                "LOGSIFT_CIRCUIT_THRESHOLD",
                defaults.circuit.failure_threshold,
            ),
            failure_window: env_secs("LOGSIFT_CIRCUIT_WINDOW_SECS", defaults.circuit.failure_window),
            cooldown: env_secs("LOGSIFT_CIRCUIT_COOLDOWN_SECS", defaults.circuit.cooldown),
        };

        let limits = FetchLimits {
            tail_line_limit: env_parse("LOGSIFT_TAIL_LINES", defaults.limits.tail_line_limit),
            max_total_lines: env_parse("LOGSIFT_MAX_TOTAL_LINES", defaults.limits.max_total_lines),
            chunk_lines: env_parse("LOGSIFT_CHUNK_LINES", defaults.limits.chunk_lines),
        };

        let extractor = ExtractorConfig {
            signatures: env_list("LOGSIFT_SIGNATURES", defaults.extractor.signatures),
            ignore_patterns: env_list(
                "LOGSIFT_IGNORE_PATTERNS",
                defaults.extractor.ignore_patterns,
            ),
            before_lines: env_parse("LOGSIFT_BEFORE_LINES", defaults.extractor.before_lines),
            after_lines: env_parse("LOGSIFT_AFTER_LINES", defaults.extractor.after_lines),
            max_matches: env_parse("LOGSIFT_MAX_MATCHES", defaults.extractor.max_matches),
        };

        Ok(Self {
            retry,
            circuit,
            limits,
            extractor,
            max_parallel_jobs: env_parse("LOGSIFT_MAX_PARALLEL_JOBS", defaults.max_parallel_jobs),
            attempt_timeout: env_secs("LOGSIFT_ATTEMPT_TIMEOUT_SECS", defaults.attempt_timeout),
        })
    }

    /// Validates the settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.retry.max_attempts == 0 {
            anyhow::bail!("max_attempts must be greater than 0");
        }

        if self.retry.multiplier < 1.0 {
            anyhow::bail!("backoff multiplier must be at least 1.0");
        }

        if self.circuit.failure_threshold == 0 {
            anyhow::bail!("circuit failure_threshold must be greater than 0");
        }

        if self.limits.tail_line_limit == 0 {
            anyhow::bail!("tail_line_limit must be greater than 0");
        }

        if self.limits.chunk_lines == 0 {
            anyhow::bail!("chunk_lines must be greater than 0");
        }

        if self.limits.tail_line_limit >= self.limits.max_total_lines {
            anyhow::bail!(
                "tail_line_limit ({}) must be less than max_total_lines ({})",
                self.limits.tail_line_limit,
                self.limits.max_total_lines
            );
        }

        if self.extractor.max_matches == 0 {
            anyhow::bail!("max_matches must be greater than 0");
        }

        if self.max_parallel_jobs == 0 {
            anyhow::bail!("max_parallel_jobs must be greater than 0");
        }

        if self.attempt_timeout.is_zero() {
            anyhow::bail!("attempt_timeout must be greater than 0");
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_millis(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn env_secs(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_list(name: &str, default: Vec<String>) -> Vec<String> {
    match std::env::var(name) {
        Ok(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => default,
    }
}
