//! Bit-level packing for the encoded body.
//!
//! Bits are packed most-significant-bit first: the first bit pushed lands in
//! bit 7 of the first byte. The final byte is zero-padded in its low bits.

use std::io::{self, Read, Write};

use crate::code_table::Code;

const STAGING_CAPACITY: usize = 4096;

/// Write side of the bit buffer.
///
/// Holds fewer than 8 pending bits at any time; completed bytes are staged
/// and handed to the sink in blocks. [`BitWriter::flush`] consumes the writer
/// so the trailing partial byte is emitted exactly once.
pub struct BitWriter<W: Write> {
    sink: W,
    staged: Vec<u8>,
    pending: u8,
    pending_bits: u32,
    bits_written: u64,
}

impl<W: Write> BitWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            staged: Vec::with_capacity(STAGING_CAPACITY),
            pending: 0,
            pending_bits: 0,
            bits_written: 0,
        }
    }

    /// Appends the low `len` bits of `value`, most significant first.
    pub fn push_bits(&mut self, value: u128, len: u32) -> io::Result<()> {
        debug_assert!(len <= u128::BITS);
        let mut remaining = len;
        while remaining > 0 {
            let take = remaining.min(8 - self.pending_bits);
            let shift = remaining - take;
            let chunk = ((value >> shift) & ((1u128 << take) - 1)) as u8;
            self.pending |= chunk << (8 - self.pending_bits - take);
            self.pending_bits += take;
            remaining -= take;

            if self.pending_bits == 8 {
                self.emit_pending()?;
            }
        }
        self.bits_written += u64::from(len);
        Ok(())
    }

    pub fn push_code(&mut self, code: &Code) -> io::Result<()> {
        self.push_bits(code.value(), code.len())
    }

    /// Number of meaningful bits pushed so far, padding excluded.
    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    /// Pads and emits the partial byte, drains staged bytes and returns the sink.
    pub fn flush(mut self) -> io::Result<W> {
        if self.pending_bits > 0 {
            self.emit_pending()?;
        }
        self.drain()?;
        self.sink.flush()?;
        Ok(self.sink)
    }

    fn emit_pending(&mut self) -> io::Result<()> {
        self.staged.push(self.pending);
        self.pending = 0;
        self.pending_bits = 0;
        if self.staged.len() >= STAGING_CAPACITY {
            self.drain()?;
        }
        Ok(())
    }

    fn drain(&mut self) -> io::Result<()> {
        self.sink.write_all(&self.staged)?;
        self.staged.clear();
        Ok(())
    }
}

/// Read side of the bit buffer.
///
/// Pulls one byte from the source whenever the residual bits run out and
/// hands them back in the same order [`BitWriter`] packed them.
pub struct BitReader<R: Read> {
    source: R,
    current: u8,
    remaining: u32,
}

impl<R: Read> BitReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            current: 0,
            remaining: 0,
        }
    }

    /// Returns the next bit, or `None` once the source is exhausted.
    pub fn next_bit(&mut self) -> io::Result<Option<bool>> {
        if self.remaining == 0 && !self.refill()? {
            return Ok(None);
        }
        let bit = self.current & 0x80 != 0;
        self.current <<= 1;
        self.remaining -= 1;
        Ok(Some(bit))
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    fn refill(&mut self) -> io::Result<bool> {
        let mut byte = [0u8; 1];
        loop {
            match self.source.read(&mut byte) {
                Ok(0) => return Ok(false),
                Ok(_) => {
                    self.current = byte[0];
                    self.remaining = 8;
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}
