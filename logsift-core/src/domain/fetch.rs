//! Fetch result domain types

use serde::{Deserialize, Serialize};

/// Result of retrieving one job's log text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FetchResult {
    /// Log text was retrieved (possibly only a bounded portion of it)
    Text(FetchedText),
    /// Retrieval failed after resilience measures were exhausted
    Failure(FetchFailure),
}

/// Materialized log text, bounded by the configured limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedText {
    /// Retrieved lines, in source order
    pub lines: Vec<String>,
    /// True when a configured cap was hit before covering the whole source
    pub truncated: bool,
    /// Absolute 0-based line number of `lines[0]` in the original source,
    /// when the source reports enough to know it. `None` means line numbers
    /// derived from this text are tail-relative.
    pub start_line: Option<u64>,
}

impl FetchedText {
    /// Text known to cover the source from its first line
    pub fn complete(lines: Vec<String>) -> Self {
        Self {
            lines,
            truncated: false,
            start_line: Some(0),
        }
    }
}

/// Classification of a fetch failure
///
/// `Transient` failures were retried per policy before surfacing; the other
/// kinds surface immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Network blip, timeout, 5xx-equivalent
    Transient,
    /// Authorization failure, not-found-equivalent
    Permanent,
    /// Upstream circuit was open; the source was not contacted
    CircuitOpen,
    /// External cancellation observed before completion
    Cancelled,
}

/// Terminal failure for one job's fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transient, message)
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Permanent, message)
    }

    pub fn circuit_open(message: impl Into<String>) -> Self {
        Self::new(FailureKind::CircuitOpen, message)
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "fetch cancelled")
    }
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            FailureKind::Transient => "transient",
            FailureKind::Permanent => "permanent",
            FailureKind::CircuitOpen => "circuit-open",
            FailureKind::Cancelled => "cancelled",
        };
        write!(f, "{}: {}", kind, self.message)
    }
}
