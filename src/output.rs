//! Output formatting for bedanno results.
//!
//! Each region is written back as a BED row (chrom, start, end and any
//! extra columns it had) with the gene name appended as the last column.

use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::matcher::Annotation;
use crate::types::Region;

/// Format a single output line (without newline).
pub fn format_output_line(region: &Region, gene_name: &str) -> String {
    let mut line = format!(
        "{}\t{}\t{}",
        region.chrom, region.interval.start, region.interval.end
    );
    for column in &region.metadata {
        line.push('\t');
        line.push_str(column);
    }
    line.push('\t');
    line.push_str(gene_name);
    line
}

/// Open the output destination: a file, or standard output for `None`/`-`.
pub fn create_output(path: Option<&Path>) -> Result<Box<dyn Write + Send>> {
    match path {
        Some(path) if path.as_os_str() != OsStr::new("-") => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        _ => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

/// Writes annotated regions as BED rows.
pub struct BedWriter<W: Write> {
    writer: W,
    lines_written: usize,
}

impl<W: Write> BedWriter<W> {
    pub fn new(writer: W) -> Self {
        BedWriter {
            writer,
            lines_written: 0,
        }
    }

    /// Write one region with its gene name.
    pub fn write(&mut self, region: &Region, gene_name: &str) -> Result<()> {
        writeln!(self.writer, "{}", format_output_line(region, gene_name))
            .context("Failed to write output")?;
        self.lines_written += 1;
        Ok(())
    }

    pub fn write_annotation(&mut self, annotation: &Annotation) -> Result<()> {
        self.write(&annotation.region, annotation.gene_name())
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush().context("Failed to flush output")?;
        Ok(self.writer)
    }
}
