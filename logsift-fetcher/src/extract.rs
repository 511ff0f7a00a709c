//! Error window extraction
//!
//! Scans log lines for configured failure signatures and captures a fixed
//! window of context around each genuine match. Matching is a single pass,
//! O(lines × signatures), with no backtracking. Ignore patterns veto a
//! signature match on the same line.
//!
//! Two entry points share the same matching rules: [`ErrorWindowExtractor::extract`]
//! for materialized text, and the crate-internal [`StreamMatcher`] that the
//! streaming phase feeds one line at a time so matches early in a huge log
//! are captured before the line buffer slides past them.

use std::collections::VecDeque;

use tracing::debug;

use logsift_core::domain::extract::{ContextWindow, ErrorMatch, ExtractionResult, LineNumbering};
use logsift_core::domain::fetch::FetchedText;

use crate::config::ExtractorConfig;

/// Signature scanner with fixed context windows
///
/// Stateless after construction; identical input and configuration always
/// produce an identical result.
pub struct ErrorWindowExtractor {
    /// (original, lowercase) signature pairs
    signatures: Vec<(String, String)>,
    ignore_patterns: Vec<String>,
    before: usize,
    after: usize,
    max_matches: usize,
}

impl ErrorWindowExtractor {
    /// Creates an extractor, lowering all patterns once up front
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            signatures: config
                .signatures
                .iter()
                .map(|s| (s.clone(), s.to_lowercase()))
                .collect(),
            ignore_patterns: config
                .ignore_patterns
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            before: config.before_lines,
            after: config.after_lines,
            max_matches: config.max_matches,
        }
    }

    /// Context lines required before a match for a complete window
    pub fn before_lines(&self) -> usize {
        self.before
    }

    /// Scans `text` and returns every signature match with its context window
    ///
    /// Line numbers are absolute when the text knows its position in the
    /// source, tail-relative otherwise.
    pub fn extract(&self, text: &FetchedText) -> ExtractionResult {
        let numbering = if text.start_line.is_some() {
            LineNumbering::Absolute
        } else {
            LineNumbering::TailRelative
        };
        let base = text.start_line.unwrap_or(0);

        let mut matches = Vec::new();
        for (idx, line) in text.lines.iter().enumerate() {
            let Some(signature) = self.match_line(line) else {
                continue;
            };
            if matches.len() >= self.max_matches {
                debug!(limit = self.max_matches, "match cap reached, extra matches dropped");
                break;
            }

            let start = idx.saturating_sub(self.before);
            let end = (idx + self.after + 1).min(text.lines.len());
            matches.push(ErrorMatch {
                line_number: base + idx as u64 + 1,
                signature: signature.to_string(),
                window: ContextWindow {
                    start_line: base + start as u64 + 1,
                    lines: text.lines[start..end].to_vec(),
                    match_index: idx - start,
                },
            });
        }

        ExtractionResult { matches, numbering }
    }

    /// Index within `lines` of the first matching line, if any
    pub(crate) fn first_match_index(&self, lines: &[String]) -> Option<usize> {
        lines.iter().position(|line| self.match_line(line).is_some())
    }

    /// The signature matching `line`, unless an ignore pattern vetoes it
    fn match_line(&self, line: &str) -> Option<&str> {
        if self.signatures.is_empty() {
            return None;
        }

        let lowered = line.to_lowercase();
        let (original, _) = self
            .signatures
            .iter()
            .find(|(_, sig)| lowered.contains(sig.as_str()))?;

        // Ignore patterns take precedence over signatures.
        if self
            .ignore_patterns
            .iter()
            .any(|p| lowered.contains(p.as_str()))
        {
            return None;
        }

        Some(original)
    }
}

/// Incremental matcher for the streaming phase
///
/// Lines are pushed in source order; a match is finalized once its after
/// context has streamed past (or at end of input). Only the last
/// `before + after + 1` lines are retained, so memory stays constant
/// regardless of source size. Line numbers are always absolute because the
/// streaming phase starts at line zero.
pub(crate) struct StreamMatcher<'a> {
    extractor: &'a ErrorWindowExtractor,
    /// Recent lines retained for window assembly
    recent: VecDeque<String>,
    /// Absolute 0-based index of `recent[0]`
    recent_start: u64,
    /// Total lines pushed so far
    pushed: u64,
    matches: Vec<ErrorMatch>,
    capped: bool,
}

impl<'a> StreamMatcher<'a> {
    pub(crate) fn new(extractor: &'a ErrorWindowExtractor) -> Self {
        Self {
            extractor,
            recent: VecDeque::new(),
            recent_start: 0,
            pushed: 0,
            matches: Vec::new(),
            capped: false,
        }
    }

    /// Feeds the next line of the source
    pub(crate) fn push(&mut self, line: &str) {
        self.recent.push_back(line.to_string());
        self.pushed += 1;

        // The line whose after-context just completed can be judged now.
        let after = self.extractor.after as u64;
        if self.pushed > after {
            self.try_match(self.pushed - 1 - after);
        }

        let cap = self.extractor.before + self.extractor.after + 1;
        while self.recent.len() > cap {
            self.recent.pop_front();
            self.recent_start += 1;
        }
    }

    /// Flushes candidates whose after-context was clamped by end of input
    /// and returns all matches plus whether the match cap was hit
    pub(crate) fn finish(mut self) -> (Vec<ErrorMatch>, bool) {
        let after = self.extractor.after as u64;
        for candidate in self.pushed.saturating_sub(after)..self.pushed {
            self.try_match(candidate);
        }
        (self.matches, self.capped)
    }

    fn try_match(&mut self, candidate: u64) {
        let rel = (candidate - self.recent_start) as usize;
        let Some(signature) = self.extractor.match_line(&self.recent[rel]) else {
            return;
        };
        if self.matches.len() >= self.extractor.max_matches {
            self.capped = true;
            return;
        }

        let start_rel = rel.saturating_sub(self.extractor.before);
        let end_rel = (rel + self.extractor.after + 1).min(self.recent.len());
        self.matches.push(ErrorMatch {
            line_number: candidate + 1,
            signature: signature.to_string(),
            window: ContextWindow {
                start_line: self.recent_start + start_rel as u64 + 1,
                lines: self.recent.range(start_rel..end_rel).cloned().collect(),
                match_index: rel - start_rel,
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(
        signatures: &[&str],
        ignores: &[&str],
        before: usize,
        after: usize,
    ) -> ErrorWindowExtractor {
        ErrorWindowExtractor::new(&ExtractorConfig {
            signatures: signatures.iter().map(|s| s.to_string()).collect(),
            ignore_patterns: ignores.iter().map(|s| s.to_string()).collect(),
            before_lines: before,
            after_lines: after,
            max_matches: 100,
        })
    }

    fn text(lines: Vec<String>) -> FetchedText {
        FetchedText {
            lines,
            truncated: false,
            start_line: Some(0),
        }
    }

    fn numbered(count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("line {}", i)).collect()
    }

    #[test]
    fn test_ignore_pattern_takes_precedence() {
        // 5000 lines; line 4990 matches the signature but also an ignore
        // pattern, line 4995 is a genuine failure.
        let mut lines = numbered(5000);
        lines[4989] = "BUILD 0 FAILED".to_string();
        lines[4994] = "TASK FAILED".to_string();

        let extractor = extractor(&["FAILED"], &["0 FAILED"], 2, 1);
        let result = extractor.extract(&text(lines));

        assert_eq!(result.matches.len(), 1);
        let m = &result.matches[0];
        assert_eq!(m.line_number, 4995);
        assert_eq!(m.signature, "FAILED");
        assert_eq!(m.window.start_line, 4993);
        assert_eq!(m.window.end_line(), 4996);
        assert_eq!(m.window.match_index, 2);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let mut lines = numbered(10);
        lines[4] = "build Error: missing header".to_string();

        let extractor = extractor(&["ERROR"], &[], 1, 1);
        let result = extractor.extract(&text(lines));

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].line_number, 5);
    }

    #[test]
    fn test_windows_clamp_at_boundaries() {
        let mut lines = numbered(5);
        lines[0] = "error: first line".to_string();
        lines[4] = "error: last line".to_string();

        let extractor = extractor(&["error"], &[], 3, 3);
        let result = extractor.extract(&text(lines));

        assert_eq!(result.matches.len(), 2);

        let first = &result.matches[0];
        assert_eq!(first.window.start_line, 1);
        assert_eq!(first.window.match_index, 0);
        assert_eq!(first.window.lines.len(), 4);

        let last = &result.matches[1];
        assert_eq!(last.window.start_line, 2);
        assert_eq!(last.window.match_index, 3);
        assert_eq!(last.window.end_line(), 5);
    }

    #[test]
    fn test_overlapping_windows_are_not_merged() {
        let mut lines = numbered(10);
        lines[4] = "error: one".to_string();
        lines[5] = "error: two".to_string();

        let extractor = extractor(&["error"], &[], 2, 2);
        let result = extractor.extract(&text(lines));

        // Adjacent matches each get a full window, duplicating shared lines.
        assert_eq!(result.matches.len(), 2);
        assert_eq!(result.matches[0].window.lines.len(), 5);
        assert_eq!(result.matches[1].window.lines.len(), 5);
        assert!(
            result.matches[0]
                .window
                .lines
                .contains(&"error: two".to_string())
        );
    }

    #[test]
    fn test_empty_signature_set_never_matches() {
        let extractor = extractor(&[], &[], 2, 2);
        let result = extractor.extract(&text(vec!["error everywhere".to_string()]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let mut lines = numbered(50);
        lines[20] = "fatal: disk full".to_string();
        let input = text(lines);

        let extractor = extractor(&["fatal"], &[], 3, 2);
        let first = extractor.extract(&input);
        let second = extractor.extract(&input);
        assert_eq!(first, second);
    }

    #[test]
    fn test_tail_relative_numbering_without_position() {
        let mut lines = numbered(10);
        lines[6] = "error: late".to_string();

        let extractor = extractor(&["error"], &[], 1, 1);
        let result = extractor.extract(&FetchedText {
            lines,
            truncated: true,
            start_line: None,
        });

        assert_eq!(result.numbering, LineNumbering::TailRelative);
        assert_eq!(result.matches[0].line_number, 7);
    }

    #[test]
    fn test_absolute_numbering_with_offset() {
        let mut lines = numbered(10);
        lines[3] = "error: offset".to_string();

        let extractor = extractor(&["error"], &[], 1, 1);
        let result = extractor.extract(&FetchedText {
            lines,
            truncated: true,
            start_line: Some(1000),
        });

        assert_eq!(result.numbering, LineNumbering::Absolute);
        assert_eq!(result.matches[0].line_number, 1004);
        assert_eq!(result.matches[0].window.start_line, 1003);
    }

    #[test]
    fn test_match_cap_bounds_collection() {
        let lines: Vec<String> = (0..50).map(|i| format!("error {}", i)).collect();

        let extractor = ErrorWindowExtractor::new(&ExtractorConfig {
            signatures: vec!["error".to_string()],
            ignore_patterns: vec![],
            before_lines: 1,
            after_lines: 1,
            max_matches: 10,
        });
        let result = extractor.extract(&text(lines));

        assert_eq!(result.matches.len(), 10);
    }

    #[test]
    fn test_stream_matcher_agrees_with_batch_extraction() {
        let mut lines = numbered(200);
        lines[0] = "error: at the very start".to_string();
        lines[49] = "warning, then error here".to_string();
        lines[50] = "error right after".to_string();
        lines[120] = "BUILD 0 FAILED".to_string();
        lines[199] = "error: at the very end".to_string();

        let extractor = extractor(&["error"], &["0 failed"], 4, 3);
        let batch = extractor.extract(&text(lines.clone()));

        let mut matcher = StreamMatcher::new(&extractor);
        for line in &lines {
            matcher.push(line);
        }
        let (streamed, capped) = matcher.finish();

        assert!(!capped);
        assert_eq!(streamed, batch.matches);
    }

    #[test]
    fn test_stream_matcher_handles_short_input() {
        let extractor = extractor(&["error"], &[], 5, 5);
        let lines = vec!["error: lonely".to_string()];

        let mut matcher = StreamMatcher::new(&extractor);
        for line in &lines {
            matcher.push(line);
        }
        let (streamed, _) = matcher.finish();

        assert_eq!(streamed.len(), 1);
        assert_eq!(streamed[0].line_number, 1);
        assert_eq!(streamed[0].window.lines.len(), 1);
        assert_eq!(streamed[0].window.match_index, 0);
    }
}
