//! Log slice DTOs

use serde::{Deserialize, Serialize};

/// One bounded slice of a job's log
///
/// Returned by both tail and offset-chunk requests. Sources that know their
/// own size populate `start_line`/`total_lines`, which lets the pipeline
/// report absolute line numbers; sources that stream without an index may
/// leave them unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogChunk {
    /// Lines in source order
    pub lines: Vec<String>,
    /// Absolute 0-based line number of `lines[0]`, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u64>,
    /// Total number of lines in the source, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_lines: Option<u64>,
    /// True when this slice reaches the end of the source
    pub eof: bool,
}

impl LogChunk {
    /// Whether this chunk alone covers the entire source
    ///
    /// True when the chunk starts at line zero and reaches the end, or when
    /// the source reports a total equal to the chunk length.
    pub fn covers_source(&self) -> bool {
        match (self.start_line, self.total_lines) {
            (Some(0), _) if self.eof => true,
            (_, Some(total)) => total as usize == self.lines.len(),
            _ => false,
        }
    }
}
