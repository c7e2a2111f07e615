//! Configuration and defaults for bedanno.
//!
//! This module contains the configuration structure, the "no match"
//! sentinel, and resolution of the annotation source.

use anyhow::{bail, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Gene name reported for a region with no overlapping feature.
pub const SENTINEL: &str = ".";

/// Annotation used when none is given on the command line.
pub const DEFAULT_GENOME: &str = "hg38";

/// Built-in genome aliases and the annotation file each resolves to.
pub const GENOME_ANNOTATIONS: [(&str, &str); 1] =
    [("hg38", "data/hg38/gencode.v43.basic.annotation.gtf.gz")];

/// Attribute syntax of the annotation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationFormat {
    /// GTF / GFF2: `key "value";`
    Gtf,
    /// GFF3: `key=value;`
    Gff3,
}

/// Error type for parsing annotation format from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAnnotationFormatError;

impl fmt::Display for ParseAnnotationFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid annotation format: expected 'gtf' or 'gff3'")
    }
}

impl std::error::Error for ParseAnnotationFormatError {}

impl FromStr for AnnotationFormat {
    type Err = ParseAnnotationFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gtf" | "gff2" => Ok(AnnotationFormat::Gtf),
            "gff" | "gff3" => Ok(AnnotationFormat::Gff3),
            _ => Err(ParseAnnotationFormatError),
        }
    }
}

impl AnnotationFormat {
    /// Detect the format from a file name, ignoring a trailing `.gz`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path.to_string_lossy();
        let name = name.trim_end_matches(".gz");
        match name.rsplit_once('.') {
            Some((_, "gtf")) | Some((_, "gff2")) => Ok(AnnotationFormat::Gtf),
            Some((_, "gff")) | Some((_, "gff3")) => Ok(AnnotationFormat::Gff3),
            _ => bail!(
                "Annotation must be a GTF or GFF file, or a genome name ({}): {}",
                genome_names().join(", "),
                path.display()
            ),
        }
    }
}

fn genome_names() -> Vec<&'static str> {
    GENOME_ANNOTATIONS.iter().map(|(name, _)| *name).collect()
}

/// Resolve a genome alias (e.g. `hg38`) to its bundled annotation path.
///
/// Anything that is not a known alias is taken as a file path.
pub fn resolve_annotation(name: &str) -> PathBuf {
    GENOME_ANNOTATIONS
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, path)| PathBuf::from(path))
        .unwrap_or_else(|| PathBuf::from(name))
}

/// Configuration for the annotation process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Attribute holding the reported gene name.
    pub gene_name_tag: String,
    /// Attribute used when `gene_name_tag` is absent.
    pub gene_id_tag: String,
    /// Attribute holding the transcript ID.
    pub transcript_id_tag: String,
    /// Drain the annotation stream after the last query to check chromosome order.
    pub validate_feature_order: bool,
    /// Worker threads (0 = all CPUs, 1 = sequential).
    pub threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gene_name_tag: "gene_name".to_string(),
            gene_id_tag: "gene_id".to_string(),
            transcript_id_tag: "transcript_id".to_string(),
            validate_feature_order: true,
            threads: 1,
        }
    }
}

impl Config {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of worker threads to actually use.
    pub fn effective_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}
