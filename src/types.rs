//! Core data structures for bedanno.
//!
//! This module contains the interval, query region and annotation feature
//! types shared by the parsers and the matching engine.

use std::fmt;
use std::str::FromStr;

/// Half-open genomic interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
}

impl Interval {
    /// Create a new interval.
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(end >= start, "interval end {} < start {}", end, start);
        Interval { start, end }
    }

    /// Interval length in bases.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Two intervals overlap iff `max(starts) < min(ends)`.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start.max(other.start) < self.end.min(other.end)
    }

    /// Number of bases shared by both intervals.
    pub fn intersection_len(&self, other: &Interval) -> u64 {
        self.end
            .min(other.end)
            .saturating_sub(self.start.max(other.start))
    }

    /// Fraction of `query` covered by this interval, in `[0, 1]`.
    pub fn overlap_fraction(&self, query: &Interval) -> f64 {
        if query.is_empty() {
            return 0.0;
        }
        self.intersection_len(query) as f64 / query.len() as f64
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Anything that lives on a chromosome.
///
/// The merge driver only needs the chromosome name to decide how far each
/// stream has progressed.
pub trait Chromosomal {
    fn chrom(&self) -> &str;
}

/// A query region from a BED file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub chrom: String,
    pub interval: Interval,
    /// BED columns after the third, kept verbatim.
    pub metadata: Vec<String>,
}

impl Region {
    /// Create a new region.
    pub fn new(chrom: String, start: u64, end: u64, metadata: Vec<String>) -> Self {
        Region {
            chrom,
            interval: Interval::new(start, end),
            metadata,
        }
    }

    pub fn start(&self) -> u64 {
        self.interval.start
    }

    pub fn end(&self) -> u64 {
        self.interval.end
    }

    /// Get the region ID (chrom:start-end).
    pub fn id(&self) -> String {
        format!("{}:{}-{}", self.chrom, self.interval.start, self.interval.end)
    }
}

impl Chromosomal for Region {
    fn chrom(&self) -> &str {
        &self.chrom
    }
}

/// Annotation feature type, ordered from least to most specific.
///
/// The derived `Ord` is the priority order: `Cds` is the greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureType {
    Other,
    Gene,
    Transcript,
    Exon,
    Utr,
    StartCodon,
    StopCodon,
    Cds,
}

/// Error type for parsing feature type from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFeatureTypeError;

impl fmt::Display for ParseFeatureTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "empty feature type")
    }
}

impl std::error::Error for ParseFeatureTypeError {}

impl FromStr for FeatureType {
    type Err = ParseFeatureTypeError;

    /// Unknown feature types are valid and map to `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(ParseFeatureTypeError),
            "CDS" => Ok(FeatureType::Cds),
            "stop_codon" => Ok(FeatureType::StopCodon),
            "start_codon" => Ok(FeatureType::StartCodon),
            "UTR" | "five_prime_UTR" | "three_prime_UTR" | "five_prime_utr" | "three_prime_utr"
            | "5UTR" | "3UTR" => Ok(FeatureType::Utr),
            "exon" => Ok(FeatureType::Exon),
            "transcript" | "mRNA" => Ok(FeatureType::Transcript),
            "gene" => Ok(FeatureType::Gene),
            _ => Ok(FeatureType::Other),
        }
    }
}

impl FeatureType {
    /// Convert feature type to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Cds => "CDS",
            FeatureType::StopCodon => "stop_codon",
            FeatureType::StartCodon => "start_codon",
            FeatureType::Utr => "UTR",
            FeatureType::Exon => "exon",
            FeatureType::Transcript => "transcript",
            FeatureType::Gene => "gene",
            FeatureType::Other => "other",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transcript support level.
///
/// Declared worst-first so the derived `Ord` puts `One` on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum TranscriptSupportLevel {
    #[default]
    Na,
    Five,
    Four,
    Three,
    Two,
    One,
}

/// Error type for parsing transcript support level from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTslError;

impl fmt::Display for ParseTslError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid transcript support level: expected 1-5 or NA")
    }
}

impl std::error::Error for ParseTslError {}

impl FromStr for TranscriptSupportLevel {
    type Err = ParseTslError;

    /// Accepts Ensembl's annotated form, e.g. `1 (assigned to previous version 5)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_whitespace().next().unwrap_or("") {
            "1" => Ok(TranscriptSupportLevel::One),
            "2" => Ok(TranscriptSupportLevel::Two),
            "3" => Ok(TranscriptSupportLevel::Three),
            "4" => Ok(TranscriptSupportLevel::Four),
            "5" => Ok(TranscriptSupportLevel::Five),
            "NA" => Ok(TranscriptSupportLevel::Na),
            _ => Err(ParseTslError),
        }
    }
}

impl TranscriptSupportLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptSupportLevel::One => "1",
            TranscriptSupportLevel::Two => "2",
            TranscriptSupportLevel::Three => "3",
            TranscriptSupportLevel::Four => "4",
            TranscriptSupportLevel::Five => "5",
            TranscriptSupportLevel::Na => "NA",
        }
    }
}

impl fmt::Display for TranscriptSupportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// GENCODE annotation confidence `level`; 1 is verified, 3 is automated.
///
/// Declared worst-first so the derived `Ord` puts `One` on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfidenceLevel {
    Three,
    Two,
    One,
}

/// Error type for parsing confidence level from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseConfidenceLevelError;

impl fmt::Display for ParseConfidenceLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid confidence level: expected 1, 2 or 3")
    }
}

impl std::error::Error for ParseConfidenceLevelError {}

impl FromStr for ConfidenceLevel {
    type Err = ParseConfidenceLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(ConfidenceLevel::One),
            "2" => Ok(ConfidenceLevel::Two),
            "3" => Ok(ConfidenceLevel::Three),
            _ => Err(ParseConfidenceLevelError),
        }
    }
}

/// An annotation feature from a GTF/GFF file.
///
/// Exons, CDS, transcript and gene records are all separate features that
/// may share a gene name.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub chrom: String,
    pub interval: Interval,
    pub feature_type: FeatureType,
    pub gene_name: String,
    pub transcript_id: String,
    pub mane_select: bool,
    pub tsl: TranscriptSupportLevel,
    /// `None` when the record carries no usable `level`; ranks below 3.
    pub confidence: Option<ConfidenceLevel>,
    pub transcript_type: String,
}

impl Feature {
    /// Create a feature with default qualifiers.
    pub fn new(
        chrom: impl Into<String>,
        start: u64,
        end: u64,
        feature_type: FeatureType,
        gene_name: impl Into<String>,
    ) -> Self {
        Feature {
            chrom: chrom.into(),
            interval: Interval::new(start, end),
            feature_type,
            gene_name: gene_name.into(),
            transcript_id: String::new(),
            mane_select: false,
            tsl: TranscriptSupportLevel::Na,
            confidence: None,
            transcript_type: String::new(),
        }
    }

    pub fn is_protein_coding(&self) -> bool {
        self.transcript_type == "protein_coding"
    }
}

impl Chromosomal for Feature {
    fn chrom(&self) -> &str {
        &self.chrom
    }
}
