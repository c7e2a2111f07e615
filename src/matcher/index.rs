//! Feature index for overlap queries.
//!
//! Features of one chromosome are kept in a [`ChromosomeIndex`]: a vector
//! sorted by start plus a running maximum of end coordinates. An overlap
//! query binary-searches both arrays, so only features whose start lies
//! before the query end and whose preceding max end reaches the query start
//! are inspected.

use ahash::RandomState;
use indexmap::IndexMap;

use crate::types::{Feature, Interval};

/// Overlap index for the features of a single chromosome.
#[derive(Debug, Clone, Default)]
pub struct ChromosomeIndex {
    features: Vec<Feature>,
    /// `max_end[i]` is the largest end among `features[..=i]`.
    max_end: Vec<u64>,
    built: bool,
}

impl ChromosomeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature. Insertion order does not matter.
    pub fn insert(&mut self, feature: Feature) {
        self.features.push(feature);
        self.built = false;
    }

    /// Sort features and compute the running max end.
    ///
    /// Queries before `build` fall back to a linear scan.
    pub fn build(&mut self) {
        if self.built {
            return;
        }
        self.features.sort_by_key(|f| f.interval.start);
        self.max_end.clear();
        self.max_end.reserve(self.features.len());
        let mut running = 0;
        for feature in &self.features {
            running = running.max(feature.interval.end);
            self.max_end.push(running);
        }
        self.built = true;
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// All features overlapping `interval`.
    pub fn query_overlaps(&self, interval: &Interval) -> Vec<&Feature> {
        if !self.built {
            return self
                .features
                .iter()
                .filter(|f| f.interval.overlaps(interval))
                .collect();
        }

        // Everything before `lo` ends at or before the query start.
        let lo = self.max_end.partition_point(|&end| end <= interval.start);
        // Everything from `hi` on starts at or after the query end.
        let hi = self
            .features
            .partition_point(|f| f.interval.start < interval.end);
        if lo >= hi {
            return Vec::new();
        }

        self.features[lo..hi]
            .iter()
            .filter(|f| f.interval.overlaps(interval))
            .collect()
    }
}

/// Features bucketed by chromosome.
///
/// Buckets keep the order in which their chromosome was first seen.
#[derive(Debug, Clone, Default)]
pub struct FeatureIndex {
    buckets: IndexMap<String, ChromosomeIndex, RandomState>,
}

impl FeatureIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature under its chromosome bucket.
    pub fn insert(&mut self, feature: Feature) {
        if let Some(bucket) = self.buckets.get_mut(&feature.chrom) {
            bucket.insert(feature);
            return;
        }
        let mut bucket = ChromosomeIndex::new();
        let chrom = feature.chrom.clone();
        bucket.insert(feature);
        self.buckets.insert(chrom, bucket);
    }

    /// All features on `chrom` overlapping `interval`.
    pub fn query_overlaps(&self, chrom: &str, interval: &Interval) -> Vec<&Feature> {
        self.buckets
            .get(chrom)
            .map(|bucket| bucket.query_overlaps(interval))
            .unwrap_or_default()
    }

    /// Remove and return a chromosome's features.
    pub fn evict(&mut self, chrom: &str) -> Option<ChromosomeIndex> {
        self.buckets.shift_remove(chrom)
    }

    pub fn contains(&self, chrom: &str) -> bool {
        self.buckets.contains_key(chrom)
    }

    /// Chromosomes currently held, in first-seen order.
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    pub fn num_chromosomes(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of features across all chromosomes.
    pub fn len(&self) -> usize {
        self.buckets.values().map(ChromosomeIndex::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(ChromosomeIndex::is_empty)
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
