//! Read-only statistics over a built code.

use std::fmt;

use serde::Serialize;

use crate::codec::HuffmanCode;
use crate::header::{frequency_width, header_size};
use crate::tree::HuffmanTree;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub symbol_count: usize,
    pub min_code_length: u32,
    pub max_code_length: u32,
    /// Bits per symbol actually spent by the code.
    pub average_code_length: f64,
    /// Bits per symbol, lower bound for any prefix code.
    pub entropy: f64,
    pub message_size: u64,
    pub total_bit_length: u64,
    pub header_size: u64,
    pub body_size: u64,
    pub encoded_size: u64,
    /// Percent saved by the body alone.
    pub gross_space_saving: f64,
    /// Percent saved by the whole encoded file.
    pub net_space_saving: f64,
}

impl Stats {
    pub fn of(code: &HuffmanCode) -> Self {
        let table = code.table();
        let message_size = code.message_size();
        let total_bit_length = code.total_bit_length();
        let body_size = total_bit_length.div_ceil(8);
        let max_frequency = code.tree().map_or(0, HuffmanTree::max_frequency);
        let header_size = header_size(table.len(), frequency_width(max_frequency));
        let encoded_size = header_size + body_size;

        Self {
            symbol_count: table.len(),
            min_code_length: table.min_len(),
            max_code_length: table.max_len(),
            average_code_length: ratio(total_bit_length, message_size),
            entropy: code.tree().map_or(0.0, entropy),
            message_size,
            total_bit_length,
            header_size,
            body_size,
            encoded_size,
            gross_space_saving: saving(body_size, message_size),
            net_space_saving: saving(encoded_size, message_size),
        }
    }
}

/// Shannon entropy of the leaf frequencies, in bits per symbol.
pub fn entropy(tree: &HuffmanTree) -> f64 {
    let total = tree.frequency() as f64;
    tree.leaves()
        .map(|(_, frequency)| {
            let frequency = frequency as f64;
            frequency / total * (total / frequency).log2()
        })
        .sum()
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn saving(size: u64, message_size: u64) -> f64 {
    if message_size == 0 {
        0.0
    } else {
        100.0 - 100.0 * ratio(size, message_size)
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of symbols:       {}", self.symbol_count)?;
        writeln!(f, "Min. encoding length:    {} bits", self.min_code_length)?;
        writeln!(f, "Max. encoding length:    {} bits", self.max_code_length)?;
        writeln!(f, "Avg. encoding length:    {:.2} bits", self.average_code_length)?;
        writeln!(f, "Message entropy:         {:.2} bits", self.entropy)?;
        writeln!(f, "Message encoding length: {} bits", self.total_bit_length)?;
        writeln!(
            f,
            "Encoded file size:       {} bytes ({} [header] + {} [message])",
            self.encoded_size, self.header_size, self.body_size
        )?;
        writeln!(f, "Gross space saving:      {:.2}%", self.gross_space_saving)?;
        writeln!(f, "Net space saving:        {:.2}%", self.net_space_saving)
    }
}
