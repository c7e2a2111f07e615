//! Per-region annotation.
//!
//! For every query region the annotator collects the overlapping features
//! of its chromosome, keeps the highest-priority one and reports its gene
//! name, or the sentinel when nothing overlaps. Output follows query input
//! order.

use anyhow::Result;
use log::debug;

use crate::config::{Config, SENTINEL};
use crate::matcher::index::ChromosomeIndex;
use crate::matcher::merge::{ChromosomeBatch, DriverStats, MergeDriver};
use crate::matcher::priority::select_best;
use crate::types::{Feature, Region};

/// A query region with its winning gene.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub region: Region,
    /// `None` when no feature overlaps.
    pub gene_name: Option<String>,
}

impl Annotation {
    /// Gene name to report, or the sentinel.
    pub fn gene_name(&self) -> &str {
        self.gene_name.as_deref().unwrap_or(SENTINEL)
    }
}

/// Counters for annotated regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotatorStats {
    pub regions: usize,
    pub matched: usize,
}

impl AnnotatorStats {
    pub fn unmatched(&self) -> usize {
        self.regions - self.matched
    }

    pub fn merge(&mut self, other: AnnotatorStats) {
        self.regions += other.regions;
        self.matched += other.matched;
    }

    fn record(&mut self, matched: bool) {
        self.regions += 1;
        if matched {
            self.matched += 1;
        }
    }
}

/// Summary of a complete annotation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub driver: DriverStats,
    pub annotator: AnnotatorStats,
}

/// Resolves query regions against a chromosome's feature index.
#[derive(Debug, Default)]
pub struct Annotator {
    stats: AnnotatorStats,
}

impl Annotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> AnnotatorStats {
        self.stats
    }

    /// Highest-priority feature overlapping `region`.
    pub fn best_match<'a>(region: &Region, index: &'a ChromosomeIndex) -> Option<&'a Feature> {
        select_best(index.query_overlaps(&region.interval), &region.interval)
    }

    /// Gene name to report for a winner.
    ///
    /// A winning feature with neither a gene name nor a gene ID carries the
    /// sentinel; its region is reported and counted as unmatched.
    fn reported_name(winner: Option<&Feature>) -> Option<&str> {
        winner
            .map(|f| f.gene_name.as_str())
            .filter(|name| *name != SENTINEL)
    }

    /// Annotate a batch, calling `emit` once per query in input order.
    pub fn annotate_batch<E>(&mut self, batch: &ChromosomeBatch, mut emit: E) -> Result<()>
    where
        E: FnMut(&Region, &str) -> Result<()>,
    {
        for region in &batch.queries {
            let gene_name = Self::reported_name(Self::best_match(region, &batch.index));
            self.stats.record(gene_name.is_some());
            emit(region, gene_name.unwrap_or(SENTINEL))?;
        }
        Ok(())
    }

    /// Annotate regions into owned results, in input order.
    pub fn annotate(&mut self, regions: Vec<Region>, index: &ChromosomeIndex) -> Vec<Annotation> {
        regions
            .into_iter()
            .map(|region| {
                let gene_name = Self::reported_name(Self::best_match(&region, index))
                    .map(str::to_string);
                self.stats.record(gene_name.is_some());
                Annotation { region, gene_name }
            })
            .collect()
    }
}

/// Run the whole pipeline on one thread.
///
/// `emit` is called exactly once per query region, in input order. On a
/// chromosome ordering error the run stops; regions already emitted stay
/// emitted.
pub fn annotate_streams<Q, F, E>(
    queries: Q,
    features: F,
    config: &Config,
    mut emit: E,
) -> Result<RunSummary>
where
    Q: Iterator<Item = Result<Region>>,
    F: Iterator<Item = Result<Feature>>,
    E: FnMut(&Region, &str) -> Result<()>,
{
    let mut driver =
        MergeDriver::new(queries, features).with_order_validation(config.validate_feature_order);
    let mut annotator = Annotator::new();

    while let Some(batch) = driver.next_batch()? {
        annotator.annotate_batch(&batch, &mut emit)?;
        debug!("{}: annotated {} regions", batch.chrom, batch.queries.len());
    }

    Ok(RunSummary {
        driver: driver.stats(),
        annotator: annotator.stats(),
    })
}
