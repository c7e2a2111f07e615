//! BED file parser with gzip support.
//!
//! Parses BED (Browser Extensible Data) files containing query regions.
//! Records are streamed one at a time so that only the chromosome being
//! annotated has to be held in memory.

use anyhow::{Context, Result};
use std::io::BufRead;
use std::path::Path;

use crate::error::AnnotateError;
use crate::parser::util::open_input;
use crate::types::Region;

/// Streaming BED file reader.
///
/// Yields one [`Region`] per data line, in file order. Blank lines,
/// `#` comments and `track`/`browser` lines are skipped; every other line
/// must be a valid record.
pub struct BedReader<R> {
    reader: R,
    line: String,
    line_number: usize,
}

impl BedReader<Box<dyn BufRead + Send>> {
    /// Create a new BedReader from a file path (supports .gz and `-` for stdin).
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = open_input(path).context("Failed to open BED file")?;
        Ok(BedReader::new(reader))
    }
}

impl<R: BufRead> BedReader<R> {
    pub fn new(reader: R) -> Self {
        BedReader {
            reader,
            line: String::new(),
            line_number: 0,
        }
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read the next region. Returns `None` at EOF.
    pub fn read_region(&mut self) -> Result<Option<Region>> {
        loop {
            self.line.clear();
            let bytes_read = self
                .reader
                .read_line(&mut self.line)
                .context("Failed to read BED line")?;

            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.line.trim_end_matches(&['\n', '\r'][..]);
            if is_header_line(line) {
                continue;
            }

            let region = parse_line(line)
                .with_context(|| format!("Invalid BED record at line {}", self.line_number))?;
            return Ok(Some(region));
        }
    }
}

impl<R: BufRead> Iterator for BedReader<R> {
    type Item = Result<Region>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_region().transpose()
    }
}

fn is_header_line(line: &str) -> bool {
    line.trim().is_empty()
        || line.starts_with('#')
        || line.starts_with("track")
        || line.starts_with("browser")
}

/// Parse a single BED line into a Region.
///
/// All columns after the third are kept verbatim as metadata.
pub fn parse_line(line: &str) -> Result<Region> {
    let mut fields = line.split('\t');

    let chrom = match fields.next() {
        Some(chrom) if !chrom.is_empty() => chrom,
        _ => anyhow::bail!("missing chromosome"),
    };
    let start: u64 = fields
        .next()
        .context("missing start column")?
        .trim()
        .parse()
        .context("start is not a non-negative integer")?;
    let end: u64 = fields
        .next()
        .context("missing end column")?
        .trim()
        .parse()
        .context("end is not a non-negative integer")?;

    if end < start {
        return Err(AnnotateError::MalformedInterval {
            chromosome: chrom.to_string(),
            start,
            end,
        }
        .into());
    }

    let metadata: Vec<String> = fields.map(|s| s.to_string()).collect();

    Ok(Region::new(chrom.to_string(), start, end, metadata))
}
