//! Priority rule for choosing one feature among overlapping candidates.
//!
//! Candidates are ranked lexicographically by:
//!
//! 1. feature type (`CDS > stop_codon > start_codon > UTR > exon > transcript > gene > other`)
//! 2. MANE Select
//! 3. transcript support level (`1 > 2 > 3 > 4 > 5 > NA`)
//! 4. confidence level (`1 > 2 > 3 > missing`)
//! 5. protein-coding transcript type
//! 6. fraction of the query covered by the feature
//!
//! The key is recomputed per query because the overlap fraction depends on
//! the query interval.

use std::cmp::Ordering;

use crate::types::{ConfidenceLevel, Feature, FeatureType, Interval, TranscriptSupportLevel};

/// Sort key of one candidate for one query; greater is better.
///
/// Field order is the comparison order. The overlap is stored as a base
/// count: every key for a query shares the same denominator, so comparing
/// bases is the same as comparing fractions, without float rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PriorityKey {
    pub feature_type: FeatureType,
    pub mane_select: bool,
    pub tsl: TranscriptSupportLevel,
    pub confidence: Option<ConfidenceLevel>,
    pub protein_coding: bool,
    pub overlap_bases: u64,
}

impl PriorityKey {
    pub fn new(feature: &Feature, query: &Interval) -> Self {
        PriorityKey {
            feature_type: feature.feature_type,
            mane_select: feature.mane_select,
            tsl: feature.tsl,
            confidence: feature.confidence,
            protein_coding: feature.is_protein_coding(),
            overlap_bases: feature.interval.intersection_len(query),
        }
    }

    /// Intersection length divided by query length.
    pub fn overlap_fraction(&self, query: &Interval) -> f64 {
        if query.is_empty() {
            return 0.0;
        }
        self.overlap_bases as f64 / query.len() as f64
    }
}

/// Compare two candidates for `query`.
///
/// `Greater` means `a` wins, `Less` means `b` wins, `Equal` is a tie on
/// every component of the key.
pub fn compare(a: &Feature, b: &Feature, query: &Interval) -> Ordering {
    PriorityKey::new(a, query).cmp(&PriorityKey::new(b, query))
}

/// Order among candidates whose keys are equal.
///
/// Depends only on feature content, so the winner does not change with the
/// order candidates were read in: lower start, then lower end, then gene
/// name, then transcript ID.
fn residual_order(a: &Feature, b: &Feature) -> Ordering {
    b.interval
        .start
        .cmp(&a.interval.start)
        .then_with(|| b.interval.end.cmp(&a.interval.end))
        .then_with(|| b.gene_name.cmp(&a.gene_name))
        .then_with(|| b.transcript_id.cmp(&a.transcript_id))
}

/// Pick the highest-priority candidate, or `None` for an empty set.
pub fn select_best<'a, I>(candidates: I, query: &Interval) -> Option<&'a Feature>
where
    I: IntoIterator<Item = &'a Feature>,
{
    candidates
        .into_iter()
        .map(|f| (PriorityKey::new(f, query), f))
        .max_by(|(ka, a), (kb, b)| ka.cmp(kb).then_with(|| residual_order(a, b)))
        .map(|(_, f)| f)
}
