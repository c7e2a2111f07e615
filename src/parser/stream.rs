//! Peekable record streams.
//!
//! The merge driver needs to look at the chromosome of the next record
//! before deciding whether to consume it.

use anyhow::Result;

use crate::types::Chromosomal;

/// A pull-based stream of parsed records with one record of lookahead.
pub struct RecordStream<T, I>
where
    I: Iterator<Item = Result<T>>,
{
    records: I,
    peeked: Option<T>,
    exhausted: bool,
}

impl<T, I> RecordStream<T, I>
where
    I: Iterator<Item = Result<T>>,
{
    pub fn new(records: I) -> Self {
        RecordStream {
            records,
            peeked: None,
            exhausted: false,
        }
    }

    fn fill(&mut self) -> Result<()> {
        if self.peeked.is_none() && !self.exhausted {
            match self.records.next() {
                Some(record) => self.peeked = Some(record?),
                None => self.exhausted = true,
            }
        }
        Ok(())
    }

    /// Look at the next record without consuming it.
    pub fn peek(&mut self) -> Result<Option<&T>> {
        self.fill()?;
        Ok(self.peeked.as_ref())
    }

    /// Consume the next record. `None` means end of stream.
    pub fn next_record(&mut self) -> Result<Option<T>> {
        self.fill()?;
        Ok(self.peeked.take())
    }
}

impl<T, I> RecordStream<T, I>
where
    T: Chromosomal,
    I: Iterator<Item = Result<T>>,
{
    /// Chromosome of the next record, if any.
    pub fn current_chromosome(&mut self) -> Result<Option<&str>> {
        Ok(self.peek()?.map(|record| record.chrom()))
    }
}
