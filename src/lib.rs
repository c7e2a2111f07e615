//! bedanno - annotate genomic regions with the best-overlapping gene.
//!
//! This library assigns each region of a BED file the gene name of the
//! single highest-priority annotation feature (from a GTF/GFF file) that
//! overlaps it, or `.` when nothing does.
//!
//! # Features
//!
//! - Stream BED and GTF/GFF3 files (with gzip support)
//! - Merge both inputs chromosome by chromosome, holding only the current
//!   chromosome's features in memory when the files share an order
//! - Detect inputs that are not grouped by chromosome instead of
//!   mis-annotating them
//! - Rank candidates by feature type, MANE Select, transcript support level,
//!   confidence level, protein-coding status and overlap fraction
//!
//! # Example
//!
//! ```ignore
//! use bedanno::config::{AnnotationFormat, Config};
//! use bedanno::matcher::annotate_streams;
//! use bedanno::parser::{BedReader, GtfReader};
//! use std::path::Path;
//!
//! let config = Config::default();
//! let regions = BedReader::from_path(Path::new("peaks.bed"))?;
//! let features = GtfReader::from_path(Path::new("genes.gtf"), AnnotationFormat::Gtf, &config)?;
//!
//! annotate_streams(regions, features, &config, |region, gene| {
//!     println!("{}\t{}", region.id(), gene);
//!     Ok(())
//! })?;
//! ```

pub mod config;
pub mod error;
pub mod matcher;
pub mod output;
pub mod parser;
pub mod types;

pub use config::{Config, SENTINEL};
pub use error::{AnnotateError, StreamKind};
pub use matcher::{annotate_streams, Annotation, Annotator};
pub use parser::{BedReader, GtfReader};
pub use types::{Feature, FeatureType, Interval, Region};
