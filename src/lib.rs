//! # huffpack
//!
//! Static Huffman coding of byte streams.
//!
//! The encoder counts symbol frequencies, builds the Huffman tree, writes the
//! frequency table as a header and then the bit-packed codes of every input
//! byte. The decoder rebuilds the same tree from the header and walks it bit
//! by bit.
//!
//! ```rust
//! let encoded = huffpack::encode(b"ABCDEFGHABBBBB")?;
//! assert_eq!(huffpack::decode(&encoded)?, b"ABCDEFGHABBBBB");
//! # Ok::<(), huffpack::HuffmanError>(())
//! ```

pub mod bit_buffer;
pub mod code_table;
pub mod codec;
pub mod compare;
pub mod error;
pub mod frequency;
pub mod header;
pub mod metrics;
pub mod tree;

pub use code_table::{Code, CodeTable};
pub use codec::{
    HuffmanCode, decode, decode_file, decode_file_limited, decode_limited, decode_stream,
    decode_stream_limited, encode, encode_file, encode_stream,
};
pub use error::{FormatError, HuffmanError, Result};
pub use frequency::FrequencyTable;
pub use metrics::Stats;
pub use tree::{HuffmanTree, Node};
