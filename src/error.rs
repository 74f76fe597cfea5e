//! Error types for encoding and decoding.

use std::io;

use thiserror::Error;

/// Everything that can abort an encode or decode call.
#[derive(Error, Debug)]
pub enum HuffmanError {
    /// The byte source or sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The encoded stream does not describe a valid message.
    #[error("malformed encoded data: {0}")]
    Format(#[from] FormatError),
}

/// Structural faults found in an encoded stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("header ends before all of its fields were read")]
    TruncatedHeader,

    #[error("header declares {count} symbols, at most 256 are possible")]
    TooManySymbols { count: u32 },

    #[error("header declares a frequency width of {width} bytes, expected 1 to 8")]
    BadFrequencyWidth { width: u32 },

    #[error("symbol {symbol:#04x} has a zero frequency")]
    ZeroFrequency { symbol: u8 },

    #[error("symbol {symbol:#04x} appears twice in the header")]
    DuplicateSymbol { symbol: u8 },

    #[error("sum of symbol frequencies does not fit in 64 bits")]
    FrequencyOverflow,

    #[error("body ends after {decoded} of {expected} symbols")]
    TruncatedBody { decoded: u64, expected: u64 },

    #[error("header declares a {size}-byte message, the limit is {limit}")]
    MessageTooLarge { size: u64, limit: u64 },
}

pub type Result<T> = std::result::Result<T, HuffmanError>;

impl HuffmanError {
    /// Maps an end-of-file while reading the header onto a format error.
    pub(crate) fn from_header_io(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FormatError::TruncatedHeader.into()
        } else {
            HuffmanError::Io(e)
        }
    }

    pub fn is_format(&self) -> bool {
        matches!(self, HuffmanError::Format(_))
    }
}
