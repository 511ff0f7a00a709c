//! Batch fetch orchestration
//!
//! Runs a batch of jobs through the retry-wrapped reader and assembles one
//! outcome per job. Jobs are independent: a failure in one never aborts the
//! others, and the returned collection always preserves input order and
//! covers every job.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use logsift_core::domain::extract::{ExtractionResult, LineNumbering};
use logsift_core::domain::fetch::{FetchFailure, FetchResult};
use logsift_core::domain::job::{JobDescriptor, JobOutcome};

use crate::circuit::CircuitBreakerRegistry;
use crate::config::Settings;
use crate::extract::ErrorWindowExtractor;
use crate::observer::{FetchObserver, TracingObserver};
use crate::reader::BoundedLogReader;
use crate::retry::RetryExecutor;
use crate::source::LogSource;

/// Fetches and extracts log excerpts for batches of jobs
///
/// Construct once and reuse across batches: the circuit breaker registry it
/// owns is process-wide state that remembers upstream health between runs.
pub struct FetchOrchestrator {
    source: Arc<dyn LogSource>,
    reader: Arc<BoundedLogReader>,
    extractor: Arc<ErrorWindowExtractor>,
    retry: Arc<RetryExecutor>,
    circuit: Arc<CircuitBreakerRegistry>,
    semaphore: Arc<Semaphore>,
}

impl FetchOrchestrator {
    /// Creates an orchestrator with the default tracing observer
    pub fn new(source: Arc<dyn LogSource>, settings: Settings) -> Self {
        Self::with_observer(source, settings, Arc::new(TracingObserver))
    }

    /// Creates an orchestrator with a custom event sink
    pub fn with_observer(
        source: Arc<dyn LogSource>,
        settings: Settings,
        observer: Arc<dyn FetchObserver>,
    ) -> Self {
        let circuit = Arc::new(CircuitBreakerRegistry::new(settings.circuit.clone()));
        let reader = Arc::new(BoundedLogReader::new(
            Arc::clone(&source),
            settings.limits.clone(),
        ));
        let retry = Arc::new(RetryExecutor::new(
            settings.retry.clone(),
            settings.attempt_timeout,
            Arc::clone(&circuit),
            observer,
        ));

        Self {
            source,
            reader,
            extractor: Arc::new(ErrorWindowExtractor::new(&settings.extractor)),
            retry,
            circuit,
            semaphore: Arc::new(Semaphore::new(settings.max_parallel_jobs)),
        }
    }

    /// Circuit breaker registry handle, for inspection or explicit reset
    pub fn circuit(&self) -> &CircuitBreakerRegistry {
        &self.circuit
    }

    /// Fetches every job and returns one outcome per job, in input order
    ///
    /// Returns only after all jobs resolve. An empty batch is a no-op.
    /// Cancelling `cancel` makes in-flight jobs return promptly with a
    /// `Cancelled` failure at their next retry/backoff/chunk boundary.
    pub async fn run(
        &self,
        jobs: Vec<JobDescriptor>,
        cancel: CancellationToken,
    ) -> Vec<JobOutcome> {
        if jobs.is_empty() {
            return Vec::new();
        }

        let batch_id = Uuid::new_v4();
        info!(%batch_id, jobs = jobs.len(), "starting fetch batch");

        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let semaphore = Arc::clone(&self.semaphore);
            let source = Arc::clone(&self.source);
            let reader = Arc::clone(&self.reader);
            let extractor = Arc::clone(&self.extractor);
            let retry = Arc::clone(&self.retry);
            let cancel = cancel.clone();
            let task_job = job.clone();

            let handle = tokio::spawn(async move {
                let permit = semaphore.acquire_owned().await;
                if permit.is_err() {
                    // The semaphore is only closed when the orchestrator is
                    // being torn down.
                    return failure_outcome(task_job, FetchFailure::cancelled());
                }
                run_job(task_job, source, reader, extractor, retry, cancel).await
            });
            handles.push((job, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (job, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(job = %job, "job task panicked: {}", e);
                    outcomes.push(failure_outcome(
                        job,
                        FetchFailure::transient(format!("job task panicked: {}", e)),
                    ));
                }
            }
        }

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            %batch_id,
            succeeded = outcomes.len() - failed,
            failed,
            "fetch batch complete"
        );

        outcomes
    }
}

/// Fetches one job and assembles its terminal outcome
async fn run_job(
    job: JobDescriptor,
    source: Arc<dyn LogSource>,
    reader: Arc<BoundedLogReader>,
    extractor: Arc<ErrorWindowExtractor>,
    retry: Arc<RetryExecutor>,
    cancel: CancellationToken,
) -> JobOutcome {
    let upstream = source.upstream_key(&job);
    debug!(job = %job, upstream, "fetching job log");

    let result = retry
        .execute(&upstream, &cancel, |_attempt| {
            reader.fetch(&job, &extractor, &cancel)
        })
        .await;

    match result {
        Ok(bounded) => {
            debug!(
                job = %job,
                matches = bounded.extraction.matches.len(),
                truncated = bounded.text.truncated,
                "job log fetched"
            );
            JobOutcome {
                job,
                fetch: FetchResult::Text(bounded.text),
                extraction: bounded.extraction,
                completed_at: chrono::Utc::now(),
            }
        }
        Err(failure) => {
            warn!(job = %job, "fetch failed: {}", failure);
            failure_outcome(job, failure)
        }
    }
}

fn failure_outcome(job: JobDescriptor, failure: FetchFailure) -> JobOutcome {
    JobOutcome {
        job,
        fetch: FetchResult::Failure(failure),
        extraction: ExtractionResult::empty(LineNumbering::Absolute),
        completed_at: chrono::Utc::now(),
    }
}
