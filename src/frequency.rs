use std::collections::BTreeMap;
use std::io::{self, Read};

use crate::error::{FormatError, Result};

/// Occurrence counts of every byte value seen in a message.
///
/// Keys iterate in ascending symbol order, which is the seeding order of the
/// tree builder. Every stored count is at least 1 and the counts always sum
/// to the message size without overflowing `u64`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: BTreeMap<u8, u64>,
    total: u64,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts every byte of `data`.
    pub fn build(data: &[u8]) -> Self {
        let mut histogram = [0u64; 256];
        for &b in data {
            histogram[b as usize] += 1;
        }
        Self::from_histogram(&histogram)
    }

    /// Counts every byte produced by `reader` until end of input.
    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut histogram = [0u64; 256];
        let mut buf = [0u8; 8192];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            for &b in &buf[..n] {
                histogram[b as usize] += 1;
            }
        }
        Ok(Self::from_histogram(&histogram))
    }

    fn from_histogram(histogram: &[u64; 256]) -> Self {
        let counts: BTreeMap<u8, u64> = histogram
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(symbol, &count)| (symbol as u8, count))
            .collect();
        let total = counts.values().sum();
        Self { counts, total }
    }

    /// Records a symbol read back from a header.
    ///
    /// Rejects zero counts, repeated symbols and totals that overflow.
    pub fn insert(&mut self, symbol: u8, count: u64) -> Result<()> {
        if count == 0 {
            return Err(FormatError::ZeroFrequency { symbol }.into());
        }
        if self.counts.contains_key(&symbol) {
            return Err(FormatError::DuplicateSymbol { symbol }.into());
        }
        self.total = self
            .total
            .checked_add(count)
            .ok_or(FormatError::FrequencyOverflow)?;
        self.counts.insert(symbol, count);
        Ok(())
    }

    pub fn get(&self, symbol: u8) -> Option<u64> {
        self.counts.get(&symbol).copied()
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Message size in symbols.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn max_frequency(&self) -> u64 {
        self.counts.values().copied().max().unwrap_or(0)
    }

    /// `(symbol, count)` pairs in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts.iter().map(|(&symbol, &count)| (symbol, count))
    }
}
