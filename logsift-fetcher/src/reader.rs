//! Bounded log retrieval
//!
//! Most failing builds show their failure near the end of output, so the
//! reader fetches a bounded tail first and only escalates to a chunked
//! front-to-back scan when the tail cannot answer the extraction question.
//! Either way the resident buffer never exceeds `max_total_lines`, no
//! matter how large the source is.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use logsift_core::domain::extract::{ExtractionResult, LineNumbering};
use logsift_core::domain::fetch::FetchedText;
use logsift_core::domain::job::JobDescriptor;
use logsift_core::dto::log::LogChunk;

use crate::config::FetchLimits;
use crate::extract::{ErrorWindowExtractor, StreamMatcher};
use crate::source::{LogSource, SourceError};

/// A bounded fetch together with the extraction computed over everything
/// the reader examined
///
/// The extraction is produced during retrieval because the streaming phase
/// sees lines that may have slid out of the retained buffer by end of scan.
#[derive(Debug)]
pub struct BoundedFetch {
    pub text: FetchedText,
    pub extraction: ExtractionResult,
}

/// Two-phase log reader with a hard memory cap
pub struct BoundedLogReader {
    source: Arc<dyn LogSource>,
    limits: FetchLimits,
}

impl BoundedLogReader {
    /// Creates a reader over `source` with the given caps
    pub fn new(source: Arc<dyn LogSource>, limits: FetchLimits) -> Self {
        Self { source, limits }
    }

    /// Retrieves one job's log under the configured caps
    ///
    /// Phase one fetches the last `tail_line_limit` lines. The tail is
    /// accepted unless [`needs_escalation`] says otherwise, in which case
    /// phase two re-reads the source from the start in `chunk_lines` steps,
    /// retaining a sliding buffer of at most `max_total_lines` lines.
    pub async fn fetch(
        &self,
        job: &JobDescriptor,
        extractor: &ErrorWindowExtractor,
        cancel: &CancellationToken,
    ) -> Result<BoundedFetch, SourceError> {
        let tail = self
            .source
            .fetch_tail(job, self.limits.tail_line_limit)
            .await?;

        // A tail shorter than requested covers the whole source even when
        // the source does not report totals.
        let covers = tail.covers_source() || tail.lines.len() < self.limits.tail_line_limit;

        if needs_escalation(&tail.lines, covers, extractor) {
            debug!(
                job = %job,
                tail_lines = tail.lines.len(),
                "tail inconclusive, streaming from start"
            );
            return self.stream(job, extractor, cancel).await;
        }

        let text = tail_text(tail, covers);
        let extraction = extractor.extract(&text);
        Ok(BoundedFetch { text, extraction })
    }

    /// Phase two: chunked scan from line zero with a sliding line buffer
    async fn stream(
        &self,
        job: &JobDescriptor,
        extractor: &ErrorWindowExtractor,
        cancel: &CancellationToken,
    ) -> Result<BoundedFetch, SourceError> {
        let mut buffer: VecDeque<String> = VecDeque::new();
        let mut matcher = StreamMatcher::new(extractor);
        let mut offset: u64 = 0;
        let mut dropped: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(SourceError::Cancelled);
            }

            let chunk = self
                .source
                .fetch_chunk(job, offset, self.limits.chunk_lines)
                .await?;
            let got = chunk.lines.len();

            for line in chunk.lines {
                matcher.push(&line);
                buffer.push_back(line);
                if buffer.len() > self.limits.max_total_lines {
                    buffer.pop_front();
                    dropped += 1;
                }
            }

            offset += got as u64;
            if chunk.eof || got == 0 {
                break;
            }
        }

        let (matches, capped) = matcher.finish();
        if capped {
            warn!(job = %job, "match cap reached during streaming scan");
        }

        Ok(BoundedFetch {
            text: FetchedText {
                lines: buffer.into_iter().collect(),
                truncated: dropped > 0,
                start_line: Some(dropped),
            },
            extraction: ExtractionResult {
                matches,
                numbering: LineNumbering::Absolute,
            },
        })
    }
}

/// Escalation rule for the tail phase
///
/// The tail answers the extraction question when it covers the whole
/// source, or when it contains at least one match whose `before` context
/// fits entirely inside it. Otherwise the source must be re-read front to
/// back: either the failure is earlier than the tail, or the earliest
/// match's context is starved by the tail boundary.
fn needs_escalation(tail_lines: &[String], covers: bool, extractor: &ErrorWindowExtractor) -> bool {
    if covers {
        return false;
    }

    match extractor.first_match_index(tail_lines) {
        None => true,
        Some(idx) => idx < extractor.before_lines(),
    }
}

/// Converts an accepted tail into fetched text
///
/// The absolute position is recovered from the chunk metadata when the
/// source provides it; a tail that covers the whole source starts at line
/// zero by definition.
fn tail_text(tail: LogChunk, covers: bool) -> FetchedText {
    let lines_len = tail.lines.len() as u64;
    let start_line = tail
        .start_line
        .or_else(|| tail.total_lines.map(|t| t.saturating_sub(lines_len)))
        .or(if covers { Some(0) } else { None });

    FetchedText {
        lines: tail.lines,
        truncated: !covers,
        start_line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractorConfig;
    use crate::source::InMemoryLogSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn job() -> JobDescriptor {
        JobDescriptor::new("mem", "1", "1", "test")
    }

    fn extractor(before: usize, after: usize) -> ErrorWindowExtractor {
        ErrorWindowExtractor::new(&ExtractorConfig {
            signatures: vec!["error".to_string()],
            ignore_patterns: vec!["0 errors".to_string()],
            before_lines: before,
            after_lines: after,
            max_matches: 100,
        })
    }

    fn limits(tail: usize, max_total: usize, chunk: usize) -> FetchLimits {
        FetchLimits {
            tail_line_limit: tail,
            max_total_lines: max_total,
            chunk_lines: chunk,
        }
    }

    fn numbered(count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("line {}", i)).collect()
    }

    /// Wraps a source and counts chunk calls, to prove the tail phase
    /// resolved on its own.
    struct CountingSource {
        inner: InMemoryLogSource,
        chunk_calls: AtomicUsize,
    }

    impl CountingSource {
        fn new(inner: InMemoryLogSource) -> Self {
            Self {
                inner,
                chunk_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LogSource for CountingSource {
        fn upstream_key(&self, job: &JobDescriptor) -> String {
            self.inner.upstream_key(job)
        }

        async fn fetch_tail(
            &self,
            job: &JobDescriptor,
            limit: usize,
        ) -> Result<LogChunk, SourceError> {
            self.inner.fetch_tail(job, limit).await
        }

        async fn fetch_chunk(
            &self,
            job: &JobDescriptor,
            offset: u64,
            limit: usize,
        ) -> Result<LogChunk, SourceError> {
            self.chunk_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_chunk(job, offset, limit).await
        }
    }

    #[tokio::test]
    async fn test_tail_fetch_matches_full_extraction() {
        // The failure sits near the end with room for its before-context,
        // so the tail alone must produce the same extraction as reading
        // everything.
        let mut lines = numbered(10_000);
        lines[9989] = "error: link step failed".to_string();

        let extractor = extractor(5, 2);
        let source = Arc::new(CountingSource::new(InMemoryLogSource::new(
            "big",
            lines.clone(),
        )));
        let reader = BoundedLogReader::new(source.clone(), limits(100, 1_000, 256));

        let fetched = reader
            .fetch(&job(), &extractor, &CancellationToken::new())
            .await
            .unwrap();

        let full = extractor.extract(&FetchedText::complete(lines));
        assert_eq!(fetched.extraction, full);
        assert_eq!(fetched.extraction.matches[0].line_number, 9990);
        assert!(fetched.text.truncated);
        assert_eq!(source.chunk_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_tail_match_escalates_and_finds_early_failure() {
        // The only failure is at line 10 of a large log; the tail finds
        // nothing and the streaming phase must recover it.
        let mut lines = numbered(20_000);
        lines[9] = "error: flaky test".to_string();

        let extractor = extractor(3, 2);
        let source = Arc::new(InMemoryLogSource::new("big", lines));
        let reader = BoundedLogReader::new(source, limits(100, 1_000, 256));

        let fetched = reader
            .fetch(&job(), &extractor, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(fetched.extraction.matches.len(), 1);
        let m = &fetched.extraction.matches[0];
        assert_eq!(m.line_number, 10);
        assert_eq!(m.window.start_line, 7);
        assert_eq!(m.window.lines.len(), 6);

        // The buffer slid: only the last max_total_lines lines remain.
        assert_eq!(fetched.text.lines.len(), 1_000);
        assert!(fetched.text.truncated);
        assert_eq!(fetched.text.start_line, Some(19_000));
    }

    #[tokio::test]
    async fn test_context_starved_tail_escalates() {
        // The match is inside the tail but too close to its start for the
        // before-context, so the reader re-reads from the beginning.
        let mut lines = numbered(1_000);
        lines[952] = "error: starved".to_string();

        let extractor = extractor(5, 1);
        let source = Arc::new(InMemoryLogSource::new("mid", lines));
        // Tail of 50 lines starts at index 950; the match is at relative
        // index 2, which cannot carry 5 lines of context.
        let reader = BoundedLogReader::new(source, limits(50, 2_000, 128));

        let fetched = reader
            .fetch(&job(), &extractor, &CancellationToken::new())
            .await
            .unwrap();

        let m = &fetched.extraction.matches[0];
        assert_eq!(m.line_number, 953);
        assert_eq!(m.window.start_line, 948);
        assert_eq!(m.window.match_index, 5);
        assert!(!fetched.text.truncated);
    }

    #[tokio::test]
    async fn test_small_source_with_no_match_does_not_escalate() {
        let source = Arc::new(CountingSource::new(InMemoryLogSource::new(
            "small",
            numbered(50),
        )));
        let reader = BoundedLogReader::new(source.clone(), limits(100, 1_000, 256));

        let fetched = reader
            .fetch(&job(), &extractor(3, 3), &CancellationToken::new())
            .await
            .unwrap();

        // The tail covered the whole source; "no errors found" is final.
        assert!(fetched.extraction.is_empty());
        assert_eq!(fetched.extraction.numbering, LineNumbering::Absolute);
        assert!(!fetched.text.truncated);
        assert_eq!(source.chunk_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_streaming_buffer_stays_bounded() {
        let source = Arc::new(InMemoryLogSource::new("huge", numbered(50_000)));
        let reader = BoundedLogReader::new(source, limits(100, 1_000, 512));

        let fetched = reader
            .fetch(&job(), &extractor(3, 3), &CancellationToken::new())
            .await
            .unwrap();

        assert!(fetched.extraction.is_empty());
        assert_eq!(fetched.text.lines.len(), 1_000);
        assert!(fetched.text.truncated);
        assert_eq!(fetched.text.start_line, Some(49_000));
        assert_eq!(fetched.text.lines[0], "line 49001");
    }

    #[tokio::test]
    async fn test_unindexed_tail_is_tail_relative() {
        let mut lines = numbered(200);
        lines[150] = "error: somewhere".to_string();

        let source = Arc::new(InMemoryLogSource::new("blind", lines).without_index());
        let reader = BoundedLogReader::new(source, limits(100, 1_000, 256));

        let fetched = reader
            .fetch(&job(), &extractor(5, 1), &CancellationToken::new())
            .await
            .unwrap();

        // The source reports no position, so numbering is relative to the
        // tail start (line 101 of the source is line 1 of the tail).
        assert_eq!(fetched.extraction.numbering, LineNumbering::TailRelative);
        assert_eq!(fetched.extraction.matches[0].line_number, 51);
        assert!(fetched.text.truncated);
        assert_eq!(fetched.text.start_line, None);
    }

    #[tokio::test]
    async fn test_cancellation_observed_at_chunk_boundary() {
        let source = Arc::new(InMemoryLogSource::new("huge", numbered(20_000)));
        let reader = BoundedLogReader::new(source, limits(100, 1_000, 256));

        let cancel = CancellationToken::new();
        cancel.cancel();

        // No tail match forces the streaming phase, which observes the
        // token before its first chunk.
        let result = reader.fetch(&job(), &extractor(3, 3), &cancel).await;
        assert!(matches!(result, Err(SourceError::Cancelled)));
    }

    #[tokio::test]
    async fn test_permanent_source_error_propagates() {
        struct MissingSource;

        #[async_trait]
        impl LogSource for MissingSource {
            fn upstream_key(&self, _job: &JobDescriptor) -> String {
                "missing".to_string()
            }

            async fn fetch_tail(
                &self,
                _job: &JobDescriptor,
                _limit: usize,
            ) -> Result<LogChunk, SourceError> {
                Err(SourceError::Permanent("job not found".to_string()))
            }

            async fn fetch_chunk(
                &self,
                _job: &JobDescriptor,
                _offset: u64,
                _limit: usize,
            ) -> Result<LogChunk, SourceError> {
                Err(SourceError::Permanent("job not found".to_string()))
            }
        }

        let reader = BoundedLogReader::new(Arc::new(MissingSource), limits(100, 1_000, 256));
        let result = reader
            .fetch(&job(), &extractor(3, 3), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(SourceError::Permanent(_))));
    }
}
