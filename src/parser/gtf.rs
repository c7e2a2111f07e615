//! GTF/GFF file parser with gzip support.
//!
//! Streams annotation records as flat [`Feature`]s. Each record keeps its
//! own feature type and the qualifiers used for priority selection; no
//! gene/transcript hierarchy is built.

use anyhow::{bail, Context, Result};
use std::io::BufRead;
use std::path::Path;

use crate::config::{AnnotationFormat, Config, SENTINEL};
use crate::error::AnnotateError;
use crate::parser::util::open_input;
use crate::types::{Feature, FeatureType, Interval};

const MANE_SELECT_TAG: &str = "MANE_Select";

/// Attribute names read from the 9th column.
#[derive(Debug, Clone)]
struct AttributeTags {
    gene_name: String,
    gene_id: String,
    transcript_id: String,
}

impl From<&Config> for AttributeTags {
    fn from(config: &Config) -> Self {
        AttributeTags {
            gene_name: config.gene_name_tag.clone(),
            gene_id: config.gene_id_tag.clone(),
            transcript_id: config.transcript_id_tag.clone(),
        }
    }
}

/// Streaming GTF/GFF3 reader.
///
/// Comment lines are skipped. A GFF3 `##FASTA` directive ends the
/// annotation section.
pub struct GtfReader<R> {
    reader: R,
    format: AnnotationFormat,
    tags: AttributeTags,
    line: String,
    line_number: usize,
    finished: bool,
}

impl GtfReader<Box<dyn BufRead + Send>> {
    /// Open an annotation file (supports .gz and `-` for stdin).
    pub fn from_path(path: &Path, format: AnnotationFormat, config: &Config) -> Result<Self> {
        let reader = open_input(path).context("Failed to open annotation file")?;
        Ok(GtfReader::new(reader, format, config))
    }
}

impl<R: BufRead> GtfReader<R> {
    pub fn new(reader: R, format: AnnotationFormat, config: &Config) -> Self {
        GtfReader {
            reader,
            format,
            tags: AttributeTags::from(config),
            line: String::new(),
            line_number: 0,
            finished: false,
        }
    }

    /// Read the next feature. Returns `None` at EOF.
    pub fn read_feature(&mut self) -> Result<Option<Feature>> {
        while !self.finished {
            self.line.clear();
            let bytes_read = self
                .reader
                .read_line(&mut self.line)
                .context("Failed to read annotation line")?;

            if bytes_read == 0 {
                self.finished = true;
                break;
            }
            self.line_number += 1;

            let line = self.line.trim_end_matches(&['\n', '\r'][..]);
            if line.starts_with("##FASTA") {
                self.finished = true;
                break;
            }
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let feature = parse_line(line, self.format, &self.tags).with_context(|| {
                format!("Invalid annotation record at line {}", self.line_number)
            })?;
            return Ok(Some(feature));
        }
        Ok(None)
    }
}

impl<R: BufRead> Iterator for GtfReader<R> {
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_feature().transpose()
    }
}

/// Parse one tab-separated annotation line.
fn parse_line(line: &str, format: AnnotationFormat, tags: &AttributeTags) -> Result<Feature> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 9 {
        bail!("expected 9 tab-separated columns, found {}", fields.len());
    }

    let chrom = fields[0];
    let feature_type: FeatureType = fields[2]
        .parse()
        .map_err(|_| anyhow::anyhow!("missing feature type"))?;
    let start: u64 = fields[3]
        .parse()
        .context("Failed to parse start coordinate")?;
    let end: u64 = fields[4]
        .parse()
        .context("Failed to parse end coordinate")?;

    if start == 0 {
        bail!("start coordinate is 0 but annotation coordinates are 1-based");
    }
    if end < start {
        return Err(AnnotateError::MalformedInterval {
            chromosome: chrom.to_string(),
            start,
            end,
        }
        .into());
    }

    let attributes = Attributes::parse(fields[8], format);

    let gene_name = attributes
        .get(&tags.gene_name)
        .or_else(|| attributes.get(&tags.gene_id))
        .unwrap_or(SENTINEL);
    let tsl = attributes
        .get("transcript_support_level")
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    let confidence = attributes.get("level").and_then(|v| v.parse().ok());
    let transcript_type = attributes
        .get("transcript_type")
        .or_else(|| attributes.get("transcript_biotype"))
        .unwrap_or("");
    let mane_select = attributes.values("tag").any(|v| v == MANE_SELECT_TAG);

    Ok(Feature {
        chrom: chrom.to_string(),
        // 1-based inclusive to half-open
        interval: Interval::new(start - 1, end),
        feature_type,
        gene_name: gene_name.to_string(),
        transcript_id: attributes.get(&tags.transcript_id).unwrap_or("").to_string(),
        mane_select,
        tsl,
        confidence,
        transcript_type: transcript_type.to_string(),
    })
}

/// Key/value pairs of the attributes column, in file order.
///
/// Repeated keys (GTF `tag "a"; tag "b";`) and GFF3 comma lists
/// (`tag=a,b`) both become several pairs with the same key.
struct Attributes<'a> {
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> Attributes<'a> {
    fn parse(column: &'a str, format: AnnotationFormat) -> Self {
        let mut pairs = Vec::new();
        for entry in column.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            match format {
                AnnotationFormat::Gtf => {
                    if let Some((key, value)) = entry.split_once(char::is_whitespace) {
                        pairs.push((key, value.trim().trim_matches('"')));
                    }
                }
                AnnotationFormat::Gff3 => {
                    if let Some((key, value)) = entry.split_once('=') {
                        pairs.extend(value.split(',').map(|v| (key.trim(), v.trim())));
                    }
                }
            }
        }
        Attributes { pairs }
    }

    /// First value for `key`.
    fn get(&self, key: &str) -> Option<&'a str> {
        self.values(key).next()
    }

    fn values<'k>(&'k self, key: &'k str) -> impl Iterator<Item = &'a str> + 'k {
        self.pairs
            .iter()
            .filter(move |(k, _)| *k == key)
            .map(|(_, v)| *v)
    }
}
