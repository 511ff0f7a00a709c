//! Logsift Fetcher
//!
//! The core pipeline that turns huge CI build logs into bounded,
//! context-rich error excerpts.
//!
//! Architecture:
//! - Configuration: immutable settings for retries, circuits, caps, filters
//! - Source: transport seam over upstream log APIs (HTTP or in-memory)
//! - Resilience: retry executor with backoff and per-upstream circuit breakers
//! - Reader: tail-first bounded retrieval with a chunked streaming fallback
//! - Extraction: signature matching with fixed context windows
//! - Orchestration: concurrent per-job fetching with partial-failure results
//!
//! The orchestrator receives job descriptors from the webhook/parsing layer
//! and hands completed outcomes to the storage/delivery layer; both of
//! those live outside this crate.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use logsift_client::LogSourceClient;
//! use logsift_core::domain::job::JobDescriptor;
//! use logsift_fetcher::{FetchOrchestrator, HttpLogSource, Settings};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env()?;
//!     settings.validate()?;
//!
//!     let client = LogSourceClient::new("http://ci.example.com");
//!     let source = Arc::new(HttpLogSource::new(client));
//!     let orchestrator = FetchOrchestrator::new(source, settings);
//!
//!     let jobs = vec![JobDescriptor::new("gitlab", "512", "9017", "build-images")];
//!     let outcomes = orchestrator.run(jobs, CancellationToken::new()).await;
//!
//!     for outcome in outcomes {
//!         println!("{}: {} excerpt(s)", outcome.job, outcome.extraction.matches.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod circuit;
pub mod config;
pub mod extract;
pub mod observer;
pub mod orchestrator;
pub mod reader;
pub mod retry;
pub mod source;

// Re-export the types most embedders need
pub use circuit::{CircuitBreakerRegistry, CircuitState};
pub use config::{CircuitBreakerConfig, ExtractorConfig, FetchLimits, RetryPolicy, Settings};
pub use extract::ErrorWindowExtractor;
pub use observer::{AttemptEvent, AttemptOutcome, FetchObserver, TracingObserver};
pub use orchestrator::FetchOrchestrator;
pub use reader::{BoundedFetch, BoundedLogReader};
pub use retry::RetryExecutor;
pub use source::{HttpLogSource, InMemoryLogSource, LogSource, SourceError};
