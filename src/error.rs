//! Error types raised by the annotation engine.

use std::fmt;

use thiserror::Error;

/// Which input stream an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// BED query regions.
    Query,
    /// GTF/GFF annotation features.
    Feature,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Query => write!(f, "BED query"),
            StreamKind::Feature => write!(f, "annotation"),
        }
    }
}

/// Errors that abort an annotation run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotateError {
    /// A chromosome reappeared after its block was closed.
    #[error(
        "{stream} input is not grouped by chromosome: {chromosome} appears again after other chromosomes; sort the input by chromosome"
    )]
    ChromosomeReorder {
        chromosome: String,
        stream: StreamKind,
    },

    /// A record whose end precedes its start.
    #[error("malformed interval on {chromosome}: end {end} is before start {start}")]
    MalformedInterval {
        chromosome: String,
        start: u64,
        end: u64,
    },
}
