//! Log source abstraction
//!
//! The fetch pipeline reads logs through the [`LogSource`] trait so the
//! retrieval strategy stays independent of the transport. The HTTP
//! implementation delegates to `logsift-client`; the in-memory
//! implementation backs tests and documents the slice semantics sources
//! must obey.

use async_trait::async_trait;
use thiserror::Error;

use logsift_client::{ClientError, LogSourceClient};
use logsift_core::domain::job::JobDescriptor;
use logsift_core::dto::log::LogChunk;

/// Errors surfaced by log sources, pre-classified for retry decisions
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network blip, timeout, 5xx-equivalent; worth retrying
    #[error("transient source error: {0}")]
    Transient(String),

    /// Authorization failure, not-found-equivalent; retrying cannot help
    #[error("permanent source error: {0}")]
    Permanent(String),

    /// External cancellation observed mid-fetch
    #[error("fetch cancelled")]
    Cancelled,
}

impl From<ClientError> for SourceError {
    fn from(err: ClientError) -> Self {
        if err.is_timeout() {
            return SourceError::Transient(err.to_string());
        }
        if err.is_not_found() || err.is_auth_error() || err.is_client_error() {
            return SourceError::Permanent(err.to_string());
        }
        // 5xx, connection failures, and malformed responses are all worth
        // another attempt.
        SourceError::Transient(err.to_string())
    }
}

/// A readable log source
///
/// Sources return bounded slices: a suffix (tail) or an offset chunk. They
/// populate `start_line`/`total_lines` when they know their own size, which
/// is what lets the pipeline report absolute line numbers.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Identity of the upstream serving this job, used as the circuit
    /// breaker key (e.g., host plus API family)
    fn upstream_key(&self, job: &JobDescriptor) -> String;

    /// Fetches at most `limit` lines from the end of the source
    async fn fetch_tail(
        &self,
        job: &JobDescriptor,
        limit: usize,
    ) -> Result<LogChunk, SourceError>;

    /// Fetches at most `limit` lines starting at 0-based line `offset`
    async fn fetch_chunk(
        &self,
        job: &JobDescriptor,
        offset: u64,
        limit: usize,
    ) -> Result<LogChunk, SourceError>;
}

/// Log source backed by an upstream HTTP log API
pub struct HttpLogSource {
    client: LogSourceClient,
}

impl HttpLogSource {
    /// Creates a source over a configured client
    pub fn new(client: LogSourceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogSource for HttpLogSource {
    fn upstream_key(&self, _job: &JobDescriptor) -> String {
        format!("{}/logs", self.client.host())
    }

    async fn fetch_tail(
        &self,
        job: &JobDescriptor,
        limit: usize,
    ) -> Result<LogChunk, SourceError> {
        self.client
            .fetch_tail(&job.build_id, &job.job_id, limit)
            .await
            .map_err(SourceError::from)
    }

    async fn fetch_chunk(
        &self,
        job: &JobDescriptor,
        offset: u64,
        limit: usize,
    ) -> Result<LogChunk, SourceError> {
        self.client
            .fetch_chunk(&job.build_id, &job.job_id, offset, limit)
            .await
            .map_err(SourceError::from)
    }
}

/// In-process log source over a fixed set of lines
///
/// Serves every job from the same text. Reports `start_line`/`total_lines`
/// by default; `without_index()` suppresses them to mimic sources that
/// stream without knowing their own size.
pub struct InMemoryLogSource {
    name: String,
    lines: Vec<String>,
    indexed: bool,
}

impl InMemoryLogSource {
    /// Creates an in-memory source
    pub fn new(name: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            name: name.into(),
            lines,
            indexed: true,
        }
    }

    /// Creates an in-memory source by splitting `text` into lines
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, text.lines().map(|l| l.to_string()).collect())
    }

    /// Suppresses `start_line`/`total_lines` in returned chunks
    pub fn without_index(mut self) -> Self {
        self.indexed = false;
        self
    }

    fn chunk(&self, start: usize, end: usize, eof: bool) -> LogChunk {
        LogChunk {
            lines: self.lines[start..end].to_vec(),
            start_line: self.indexed.then_some(start as u64),
            total_lines: self.indexed.then_some(self.lines.len() as u64),
            eof,
        }
    }
}

#[async_trait]
impl LogSource for InMemoryLogSource {
    fn upstream_key(&self, _job: &JobDescriptor) -> String {
        format!("mem/{}", self.name)
    }

    async fn fetch_tail(
        &self,
        _job: &JobDescriptor,
        limit: usize,
    ) -> Result<LogChunk, SourceError> {
        let start = self.lines.len().saturating_sub(limit);
        Ok(self.chunk(start, self.lines.len(), true))
    }

    async fn fetch_chunk(
        &self,
        _job: &JobDescriptor,
        offset: u64,
        limit: usize,
    ) -> Result<LogChunk, SourceError> {
        let start = (offset as usize).min(self.lines.len());
        let end = start.saturating_add(limit).min(self.lines.len());
        Ok(self.chunk(start, end, end == self.lines.len()))
    }
}
