//! Utility functions for file parsing.

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Creates a buffered reader that automatically handles gzip-compressed files.
///
/// This function checks if the file path ends with ".gz" and wraps the file
/// in a MultiGzDecoder if so, which also covers bgzip output. Otherwise, it
/// returns a plain buffered reader.
pub fn create_buffered_reader(file: File, path: &Path) -> Box<dyn BufRead + Send> {
    if path.to_string_lossy().ends_with(".gz") {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    }
}

/// Open a path for reading, or standard input when the path is `-`.
///
/// Standard input is sniffed for the gzip magic bytes since it has no name.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    if path.as_os_str() == OsStr::new("-") {
        let mut stdin = BufReader::new(io::stdin());
        let compressed = stdin
            .fill_buf()
            .context("Failed to read standard input")?
            .starts_with(&GZIP_MAGIC);
        if compressed {
            return Ok(Box::new(BufReader::new(MultiGzDecoder::new(stdin))));
        }
        return Ok(Box::new(stdin));
    }

    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(create_buffered_reader(file, path))
}
