//! Data Transfer Objects for upstream communication
//!
//! Wire shapes exchanged with upstream log source APIs. These are kept
//! separate from the domain types: a source speaks in bounded line slices,
//! the pipeline speaks in fetch results and extractions.

pub mod log;
