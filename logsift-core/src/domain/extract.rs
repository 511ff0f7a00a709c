//! Extraction domain types
//!
//! Line numbers in these types are 1-based, the way editors and CI web UIs
//! count them. Whether they are absolute (original source numbering) or
//! relative to the start of a partial tail is recorded per result in
//! [`LineNumbering`].

use serde::{Deserialize, Serialize};

/// Reference frame for the line numbers in an [`ExtractionResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineNumbering {
    /// Line numbers refer to the original source numbering
    Absolute,
    /// Only a suffix of the source was examined and its true offset is
    /// unknown; line numbers count from the start of that suffix
    TailRelative,
}

/// Contiguous lines surrounding a detected error line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    /// Line number of `lines[0]`
    pub start_line: u64,
    /// The captured lines: up to `before` preceding lines, the matched
    /// line, up to `after` following lines
    pub lines: Vec<String>,
    /// Index of the matched line within `lines`
    pub match_index: usize,
}

impl ContextWindow {
    /// Line number of the last captured line
    pub fn end_line(&self) -> u64 {
        self.start_line + self.lines.len().saturating_sub(1) as u64
    }
}

/// One detected error line with its surrounding context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMatch {
    /// Line number of the matched line
    pub line_number: u64,
    /// The configured signature that triggered this match
    pub signature: String,
    pub window: ContextWindow,
}

/// Ordered matches for one job
///
/// An empty `matches` vector is a valid, meaningful result ("no errors
/// found") and is distinct from a fetch failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub matches: Vec<ErrorMatch>,
    pub numbering: LineNumbering,
}

impl ExtractionResult {
    /// Creates an extraction result with no matches
    pub fn empty(numbering: LineNumbering) -> Self {
        Self {
            matches: Vec::new(),
            numbering,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
