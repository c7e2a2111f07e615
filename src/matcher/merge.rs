//! Chromosome-ordered merge of the query and annotation streams.
//!
//! Both inputs must be grouped by chromosome (each chromosome one
//! contiguous block), but need not be sorted by position and need not
//! visit chromosomes in the same order. The driver reads one query block at
//! a time, then pulls annotation records until that chromosome's block has
//! been closed on the annotation side. Records for chromosomes the queries
//! have not reached yet are buffered in a [`FeatureIndex`]. Whatever is left
//! once the last query is answered is only read to check its order.
//!
//! When both files list chromosomes in the same order the buffer never holds
//! more than the current chromosome plus one lookahead record.

use ahash::AHashSet;
use anyhow::Result;
use log::{debug, trace};
use std::mem;

use crate::error::{AnnotateError, StreamKind};
use crate::matcher::index::{ChromosomeIndex, FeatureIndex};
use crate::parser::RecordStream;
use crate::types::{Feature, Region};

/// Progress of the query stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverState {
    NoChromosomeYet,
    Active(String),
    Done,
}

/// All queries of one chromosome, in input order, with that chromosome's
/// complete feature set.
#[derive(Debug, Clone)]
pub struct ChromosomeBatch {
    pub chrom: String,
    pub queries: Vec<Region>,
    pub index: ChromosomeIndex,
}

/// Counters collected while merging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Query regions read.
    pub queries: usize,
    /// Query chromosome blocks.
    pub chromosomes: usize,
    /// Annotation records read.
    pub features: usize,
    /// Annotation records with no query left to answer.
    pub discarded_features: usize,
    /// Largest number of chromosomes buffered at once.
    pub peak_buffered_chromosomes: usize,
}

/// Pulls both streams in chromosome order and yields one
/// [`ChromosomeBatch`] per query chromosome.
pub struct MergeDriver<Q, F>
where
    Q: Iterator<Item = Result<Region>>,
    F: Iterator<Item = Result<Feature>>,
{
    queries: RecordStream<Region, Q>,
    features: RecordStream<Feature, F>,
    buffer: FeatureIndex,
    state: DriverState,
    /// Chromosome the annotation stream is currently inside.
    feature_chrom: Option<String>,
    closed_queries: AHashSet<String>,
    closed_features: AHashSet<String>,
    validate_feature_order: bool,
    stats: DriverStats,
}

impl<Q, F> MergeDriver<Q, F>
where
    Q: Iterator<Item = Result<Region>>,
    F: Iterator<Item = Result<Feature>>,
{
    pub fn new(queries: Q, features: F) -> Self {
        MergeDriver {
            queries: RecordStream::new(queries),
            features: RecordStream::new(features),
            buffer: FeatureIndex::new(),
            state: DriverState::NoChromosomeYet,
            feature_chrom: None,
            closed_queries: AHashSet::new(),
            closed_features: AHashSet::new(),
            validate_feature_order: true,
            stats: DriverStats::default(),
        }
    }

    /// Whether to read the rest of the annotation after the last query block
    /// to check that no answered chromosome reappears.
    pub fn with_order_validation(mut self, validate: bool) -> Self {
        self.validate_feature_order = validate;
        self
    }

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    /// Produce the next chromosome batch, or `None` once every query has
    /// been handed out.
    pub fn next_batch(&mut self) -> Result<Option<ChromosomeBatch>> {
        if self.state == DriverState::Done {
            return Ok(None);
        }

        let chrom = match self.queries.current_chromosome()? {
            Some(chrom) => chrom.to_string(),
            None => {
                self.finish()?;
                return Ok(None);
            }
        };
        self.enter(chrom.clone())?;

        let mut queries = Vec::new();
        while self.queries.current_chromosome()? == Some(chrom.as_str()) {
            if let Some(region) = self.queries.next_record()? {
                queries.push(region);
            }
        }
        self.stats.queries += queries.len();

        let mut index = self.collect_features(&chrom)?;
        index.build();
        debug!(
            "{}: {} queries, {} features ({} chromosomes buffered)",
            chrom,
            queries.len(),
            index.len(),
            self.buffer.num_chromosomes()
        );

        Ok(Some(ChromosomeBatch {
            chrom,
            queries,
            index,
        }))
    }

    /// The only transition of the query side: move to `chrom`, closing the
    /// previous chromosome.
    fn enter(&mut self, chrom: String) -> Result<()> {
        if self.closed_queries.contains(&chrom) {
            return Err(AnnotateError::ChromosomeReorder {
                chromosome: chrom,
                stream: StreamKind::Query,
            }
            .into());
        }
        let previous = mem::replace(&mut self.state, DriverState::Active(chrom));
        if let DriverState::Active(previous) = previous {
            self.closed_queries.insert(previous);
        }
        self.stats.chromosomes += 1;
        Ok(())
    }

    /// The only transition of the annotation side.
    fn advance_feature_chromosome(&mut self, next: String) -> Result<()> {
        if self.closed_features.contains(&next) {
            return Err(AnnotateError::ChromosomeReorder {
                chromosome: next,
                stream: StreamKind::Feature,
            }
            .into());
        }
        trace!("annotation stream enters {}", next);
        if let Some(previous) = self.feature_chrom.replace(next) {
            self.closed_features.insert(previous);
        }
        Ok(())
    }

    /// Peek at the next annotation record and apply the chromosome
    /// transition it implies. Returns false at end of stream.
    fn sync_feature_chromosome(&mut self) -> Result<bool> {
        let transition = match self.features.current_chromosome()? {
            None => return Ok(false),
            Some(chrom) if self.feature_chrom.as_deref() == Some(chrom) => None,
            Some(chrom) => Some(chrom.to_string()),
        };
        if let Some(next) = transition {
            self.advance_feature_chromosome(next)?;
        }
        Ok(true)
    }

    /// Read annotation records until `chrom` is complete, then hand its
    /// features over.
    fn collect_features(&mut self, chrom: &str) -> Result<ChromosomeIndex> {
        while !self.closed_features.contains(chrom) {
            if !self.sync_feature_chromosome()? {
                break;
            }
            // the transition may have just closed `chrom`
            if self.closed_features.contains(chrom) {
                break;
            }
            if let Some(feature) = self.features.next_record()? {
                self.accept(feature);
            }
        }
        Ok(self.buffer.evict(chrom).unwrap_or_default())
    }

    fn accept(&mut self, feature: Feature) {
        self.stats.features += 1;
        self.buffer.insert(feature);
        self.stats.peak_buffered_chromosomes = self
            .stats
            .peak_buffered_chromosomes
            .max(self.buffer.num_chromosomes());
    }

    fn finish(&mut self) -> Result<()> {
        if let DriverState::Active(last) = mem::replace(&mut self.state, DriverState::Done) {
            self.closed_queries.insert(last);
        }

        for chrom in self.buffer.chromosomes() {
            debug!("{}: annotated but never queried", chrom);
        }
        self.stats.discarded_features += self.buffer.len();
        self.buffer.clear();

        if self.validate_feature_order {
            while self.sync_feature_chromosome()? {
                if self.features.next_record()?.is_some() {
                    self.stats.features += 1;
                    self.stats.discarded_features += 1;
                }
            }
        }
        Ok(())
    }
}

impl<Q, F> Iterator for MergeDriver<Q, F>
where
    Q: Iterator<Item = Result<Region>>,
    F: Iterator<Item = Result<Feature>>,
{
    type Item = Result<ChromosomeBatch>;

    /// Stops after the first error.
    fn next(&mut self) -> Option<Self::Item> {
        match self.next_batch() {
            Ok(batch) => batch.map(Ok),
            Err(err) => {
                self.state = DriverState::Done;
                Some(Err(err))
            }
        }
    }
}
