//! Header layout, all integers little-endian:
//!
//! ```text
//! u32 symbol count N
//! u32 frequency width B
//! N x (u8 symbol, B-byte frequency)
//! ```

use std::io::{self, Read, Write};

use bitstream_io::{ByteRead, ByteReader, ByteWrite, ByteWriter, LittleEndian};
use tracing::debug;

use crate::error::{FormatError, HuffmanError, Result};
use crate::frequency::FrequencyTable;
use crate::tree::HuffmanTree;

pub const MAX_SYMBOLS: u32 = 256;
pub const MAX_FREQUENCY_WIDTH: u32 = 8;

/// Size of the symbol count and width fields.
const FIXED_FIELDS_SIZE: u64 = 8;

/// Smallest number of bytes that holds `max_frequency`, never less than 1.
pub fn frequency_width(max_frequency: u64) -> u32 {
    let significant_bits = u64::BITS - max_frequency.leading_zeros();
    significant_bits.div_ceil(8).max(1)
}

/// Header size in bytes for `symbols` records of `width`-byte frequencies.
pub fn header_size(symbols: usize, width: u32) -> u64 {
    FIXED_FIELDS_SIZE + symbols as u64 * (1 + u64::from(width))
}

/// Writes the leaves of `tree` (or an empty alphabet) and returns the header size.
pub fn write_header<W: Write>(sink: &mut W, tree: Option<&HuffmanTree>) -> io::Result<u64> {
    let (count, width) = match tree {
        Some(tree) => (tree.symbol_count(), frequency_width(tree.max_frequency())),
        None => (0, 1),
    };

    let mut writer = ByteWriter::endian(sink, LittleEndian);
    writer.write::<u32>(count as u32)?;
    writer.write::<u32>(width)?;
    if let Some(tree) = tree {
        for (symbol, frequency) in tree.leaves() {
            writer.write::<u8>(symbol)?;
            writer.write_bytes(&frequency.to_le_bytes()[..width as usize])?;
        }
    }

    let size = header_size(count, width);
    debug!(symbols = count, width, bytes = size, "wrote header");
    Ok(size)
}

/// Reads a header back into the frequency table it was written from.
pub fn read_header<R: Read>(source: &mut R) -> Result<FrequencyTable> {
    let mut reader = ByteReader::endian(source, LittleEndian);

    let count = reader.read::<u32>().map_err(HuffmanError::from_header_io)?;
    if count > MAX_SYMBOLS {
        return Err(FormatError::TooManySymbols { count }.into());
    }
    let width = reader.read::<u32>().map_err(HuffmanError::from_header_io)?;
    if width == 0 || width > MAX_FREQUENCY_WIDTH {
        return Err(FormatError::BadFrequencyWidth { width }.into());
    }

    let mut table = FrequencyTable::new();
    for _ in 0..count {
        let symbol = reader.read::<u8>().map_err(HuffmanError::from_header_io)?;
        let mut frequency = [0u8; 8];
        reader
            .read_bytes(&mut frequency[..width as usize])
            .map_err(HuffmanError::from_header_io)?;
        table.insert(symbol, u64::from_le_bytes(frequency))?;
    }

    debug!(symbols = count, width, message_size = table.total(), "read header");
    Ok(table)
}
