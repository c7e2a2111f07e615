//! CLI entry point for bedanno.
//!
//! Reads a BED file (or stdin), annotates every region with the gene of
//! its best-overlapping annotation feature and writes the rows back with
//! the gene name appended.

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossbeam_channel::{bounded, Receiver, Sender};
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use bedanno::config::{resolve_annotation, AnnotationFormat, Config, DEFAULT_GENOME};
use bedanno::matcher::{
    annotate_streams, Annotation, Annotator, AnnotatorStats, ChromosomeIndex, MergeDriver,
    RunSummary,
};
use bedanno::output::{create_output, BedWriter};
use bedanno::parser::{BedReader, GtfReader};
use bedanno::types::Region;

/// Annotate BED regions with the best-overlapping gene.
///
/// Each region receives the gene name of the highest-priority overlapping
/// feature (CDS > stop_codon > start_codon > UTR > exon > transcript > gene,
/// then MANE Select, TSL, level, protein coding, overlap), or "." if none.
#[derive(Parser, Debug)]
#[command(name = "bedanno")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Region BED file ("-" for stdin)
    #[arg(short = 'b', long = "bed", default_value = "-")]
    bed: PathBuf,

    /// GTF/GFF annotation file or genome name
    #[arg(short = 'g', long = "gtf", default_value = DEFAULT_GENOME)]
    gtf: String,

    /// Output file ("-" for stdout)
    #[arg(short = 'o', long = "output", default_value = "-")]
    output: PathBuf,

    /// Annotation attribute syntax: gtf or gff3 (detected from the extension by default)
    #[arg(short = 'f', long = "format")]
    format: Option<String>,

    /// Attribute holding the gene name
    #[arg(short = 'n', long = "gene-name-tag", default_value = "gene_name")]
    gene_name_tag: String,

    /// Attribute used when the gene name attribute is missing
    #[arg(short = 'G', long = "gene-id-tag", default_value = "gene_id")]
    gene_id_tag: String,

    /// Stop reading the annotation after the last region instead of checking its order
    #[arg(long = "no-validate-order")]
    no_validate_order: bool,

    /// Number of worker threads (0 = auto-detect, 1 = sequential)
    #[arg(long = "threads", short = 'j', default_value = "1")]
    threads: usize,

    /// Maximum regions per work item in parallel mode
    #[arg(long = "batch-size", default_value = "5000")]
    batch_size: usize,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new()
        .with_level(level)
        .init()
        .context("Failed to initialize logger")?;

    let annotation = resolve_annotation(&args.gtf);
    if annotation.as_os_str() != "-" && !annotation.exists() {
        bail!("Annotation file not found: {}", annotation.display());
    }
    if args.bed.as_os_str() != "-" && !args.bed.exists() {
        bail!("BED file not found: {}", args.bed.display());
    }
    if args.bed.as_os_str() == "-" && annotation.as_os_str() == "-" {
        bail!("BED and annotation cannot both be read from stdin");
    }

    let format = match &args.format {
        Some(name) => name
            .parse::<AnnotationFormat>()
            .context("Format can only be one of the following: gtf or gff3")?,
        None => AnnotationFormat::from_path(&annotation)?,
    };

    if args.batch_size == 0 {
        bail!("Batch size must be greater than 0");
    }

    let config = Config {
        gene_name_tag: args.gene_name_tag.clone(),
        gene_id_tag: args.gene_id_tag.clone(),
        validate_feature_order: !args.no_validate_order,
        threads: args.threads,
        ..Config::default()
    };

    info!("Annotation: {} ({:?})", annotation.display(), format);
    info!("Regions: {}", args.bed.display());

    let started = Instant::now();
    let num_threads = config.effective_threads();
    let summary = if num_threads == 1 {
        run_sequential(&args, &annotation, format, &config)?
    } else {
        run_parallel(&args, &annotation, format, &config, num_threads)?
    };

    info!(
        "Annotated {} regions on {} chromosomes ({} matched, {} without overlap) in {:.2?}",
        summary.annotator.regions,
        summary.driver.chromosomes,
        summary.annotator.matched,
        summary.annotator.unmatched(),
        started.elapsed()
    );
    info!(
        "Read {} annotation records ({} not needed, at most {} chromosomes buffered)",
        summary.driver.features,
        summary.driver.discarded_features,
        summary.driver.peak_buffered_chromosomes
    );
    if summary.driver.discarded_features > 0 {
        info!(
            "Skipped {} annotation records that no region needed",
            summary.driver.discarded_features
        );
    }
    Ok(())
}

/// Sequential implementation with streaming.
fn run_sequential(
    args: &Args,
    annotation: &Path,
    format: AnnotationFormat,
    config: &Config,
) -> Result<RunSummary> {
    let regions = BedReader::from_path(&args.bed)?;
    let features = GtfReader::from_path(annotation, format, config)?;
    let mut writer = BedWriter::new(create_output(Some(&args.output))?);

    let result = annotate_streams(regions, features, config, |region, gene| {
        writer.write(region, gene)
    });

    // keep what was written before an ordering error
    writer.finish()?;
    result
}

/// Work item for the parallel pipeline.
struct WorkItem {
    /// Sequence number for ordering (file order).
    seq_id: u64,
    /// Regions to process (all from same chromosome, in file order).
    regions: Vec<Region>,
    /// Features of that chromosome, shared by all of its work items.
    index: Arc<ChromosomeIndex>,
}

/// Result from processing a work item.
struct WorkResult {
    /// Sequence number matching the input WorkItem.
    seq_id: u64,
    /// Annotations in the same order as input regions.
    annotations: Vec<Annotation>,
}

/// Parallel implementation.
///
/// The main thread runs the merge driver and splits each chromosome batch
/// into work items; a rayon pool annotates them and a writer thread puts
/// results back into input order.
fn run_parallel(
    args: &Args,
    annotation: &Path,
    format: AnnotationFormat,
    config: &Config,
    num_threads: usize,
) -> Result<RunSummary> {
    info!("Using parallel mode with {} threads", num_threads);

    let (work_tx, work_rx): (Sender<WorkItem>, Receiver<WorkItem>) = bounded(num_threads * 4);
    let (result_tx, result_rx): (Sender<WorkResult>, Receiver<WorkResult>) = bounded(2000);

    let output = create_output(Some(&args.output))?;
    let writer_handle = thread::spawn(move || write_results_ordered(output, result_rx));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .context("Failed to create thread pool")?;

    let workers_handle = thread::spawn(move || {
        pool.scope(|s| {
            for _ in 0..num_threads {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                s.spawn(move |_| worker_loop(work_rx, result_tx));
            }
        })
    });

    // Producer: merge both inputs and hand out chunks of each chromosome
    let regions = BedReader::from_path(&args.bed)?;
    let features = GtfReader::from_path(annotation, format, config)?;
    let mut driver =
        MergeDriver::new(regions, features).with_order_validation(config.validate_feature_order);

    let mut seq_id = 0;
    let produced = (|| -> Result<()> {
        while let Some(batch) = driver.next_batch()? {
            let index = Arc::new(batch.index);
            let mut queries = batch.queries;
            while !queries.is_empty() {
                let rest = queries.split_off(queries.len().min(args.batch_size));
                let item = WorkItem {
                    seq_id,
                    regions: queries,
                    index: Arc::clone(&index),
                };
                if work_tx.send(item).is_err() {
                    bail!("Worker threads stopped unexpectedly");
                }
                seq_id += 1;
                queries = rest;
            }
        }
        Ok(())
    })();

    // Close work channel to signal workers to exit
    drop(work_tx);

    workers_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Worker thread panicked"))?;

    let annotator = writer_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Writer thread panicked"))??;

    produced?;

    Ok(RunSummary {
        driver: driver.stats(),
        annotator,
    })
}

/// Worker loop: receives work items and sends results.
fn worker_loop(work_rx: Receiver<WorkItem>, result_tx: Sender<WorkResult>) {
    let mut annotator = Annotator::new();

    while let Ok(item) = work_rx.recv() {
        let annotations = annotator.annotate(item.regions, &item.index);
        let result = WorkResult {
            seq_id: item.seq_id,
            annotations,
        };
        if result_tx.send(result).is_err() {
            break;
        }
    }
}

/// Write results in order, buffering out-of-order results.
fn write_results_ordered(
    output: Box<dyn Write + Send>,
    result_rx: Receiver<WorkResult>,
) -> Result<AnnotatorStats> {
    let mut writer = BedWriter::new(output);
    let mut stats = AnnotatorStats::default();

    let mut pending: BTreeMap<u64, WorkResult> = BTreeMap::new();
    let mut next_expected: u64 = 0;

    for result in result_rx {
        pending.insert(result.seq_id, result);

        // Write all ready consecutive results
        while let Some(ready) = pending.remove(&next_expected) {
            for annotation in &ready.annotations {
                writer.write_annotation(annotation)?;
                stats.merge(AnnotatorStats {
                    regions: 1,
                    matched: usize::from(annotation.gene_name.is_some()),
                });
            }
            next_expected += 1;
        }
    }

    writer.finish()?;
    Ok(stats)
}
