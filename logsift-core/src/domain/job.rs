//! Job domain types

use serde::{Deserialize, Serialize};

use crate::domain::extract::ExtractionResult;
use crate::domain::fetch::FetchResult;

/// Identifies one log source within a build
///
/// Structure shared between the webhook/payload layer (produces) and the
/// fetcher (consumes). Ids are opaque strings because upstream CI systems
/// disagree on id shapes (numeric, uuid, path-like).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Source system this job originates from (e.g., "gitlab", "jenkins")
    pub source: String,
    /// Build/pipeline id within the source system
    pub build_id: String,
    /// Job id within the build
    pub job_id: String,
    /// Human-readable name used in excerpts and logs
    pub display_name: String,
}

impl JobDescriptor {
    /// Creates a new job descriptor
    pub fn new(
        source: impl Into<String>,
        build_id: impl Into<String>,
        job_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            build_id: build_id.into(),
            job_id: job_id.into(),
            display_name: display_name.into(),
        }
    }
}

impl std::fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{} ({})",
            self.source, self.build_id, self.job_id, self.display_name
        )
    }
}

/// Terminal result for one job within a batch
///
/// Assembled once by the orchestrator and never mutated afterwards.
/// A failed fetch carries an empty extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job: JobDescriptor,
    pub fetch: FetchResult,
    pub extraction: ExtractionResult,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

impl JobOutcome {
    /// Whether the fetch phase succeeded for this job
    pub fn is_success(&self) -> bool {
        matches!(self.fetch, FetchResult::Text(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::extract::{ExtractionResult, LineNumbering};
    use crate::domain::fetch::{FetchFailure, FetchResult, FetchedText};

    #[test]
    fn test_descriptor_display() {
        let job = JobDescriptor::new("gitlab", "512", "9017", "build-images");
        assert_eq!(job.to_string(), "gitlab/512/9017 (build-images)");
    }

    #[test]
    fn test_outcome_success_flag() {
        let job = JobDescriptor::new("gitlab", "512", "9017", "build-images");

        let ok = JobOutcome {
            job: job.clone(),
            fetch: FetchResult::Text(FetchedText {
                lines: vec!["ok".to_string()],
                truncated: false,
                start_line: Some(0),
            }),
            extraction: ExtractionResult::empty(LineNumbering::Absolute),
            completed_at: chrono::Utc::now(),
        };
        assert!(ok.is_success());

        let failed = JobOutcome {
            job,
            fetch: FetchResult::Failure(FetchFailure::transient("connection reset")),
            extraction: ExtractionResult::empty(LineNumbering::Absolute),
            completed_at: chrono::Utc::now(),
        };
        assert!(!failed.is_success());
    }
}
