//! Matching of query regions to annotation features.

pub mod annotate;
pub mod index;
pub mod merge;
pub mod priority;

pub use annotate::{annotate_streams, Annotation, Annotator, AnnotatorStats, RunSummary};
pub use index::{ChromosomeIndex, FeatureIndex};
pub use merge::{ChromosomeBatch, DriverState, DriverStats, MergeDriver};
pub use priority::{compare, select_best, PriorityKey};
