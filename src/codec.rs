use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, info_span};

use crate::bit_buffer::{BitReader, BitWriter};
use crate::code_table::CodeTable;
use crate::error::{FormatError, HuffmanError, Result};
use crate::frequency::FrequencyTable;
use crate::header::{read_header, write_header};
use crate::tree::{HuffmanTree, Node};

const CHUNK_SIZE: usize = 8192;

/// The tree and code table built for one message.
///
/// `tree` is `None` only for the empty message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HuffmanCode {
    tree: Option<HuffmanTree>,
    table: CodeTable,
}

impl HuffmanCode {
    pub fn generate(frequencies: &FrequencyTable) -> Self {
        let tree = HuffmanTree::build(frequencies);
        let table = tree.as_ref().map(CodeTable::derive).unwrap_or_default();
        Self { tree, table }
    }

    pub fn tree(&self) -> Option<&HuffmanTree> {
        self.tree.as_ref()
    }

    pub fn table(&self) -> &CodeTable {
        &self.table
    }

    /// Number of symbols in the message, read off the root.
    pub fn message_size(&self) -> u64 {
        self.tree.as_ref().map_or(0, HuffmanTree::frequency)
    }

    pub fn total_bit_length(&self) -> u64 {
        self.tree
            .as_ref()
            .map_or(0, |tree| self.table.total_bit_length(tree))
    }
}

/// Second encoding pass: writes the header for `frequencies`, then the code
/// of every byte `body` yields.
///
/// `body` must produce exactly the bytes `frequencies` was counted from.
pub fn encode_stream<R: Read, W: Write>(
    frequencies: &FrequencyTable,
    mut body: R,
    sink: &mut W,
) -> Result<HuffmanCode> {
    let _span = info_span!("encode", message_size = frequencies.total()).entered();

    let code = HuffmanCode::generate(frequencies);
    let header_size = write_header(sink, code.tree())?;

    let mut bits = BitWriter::new(&mut *sink);
    let mut seen = 0u64;
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        for &b in &buf[..n] {
            let symbol_code = code.table().get(b).ok_or_else(|| input_changed(seen))?;
            bits.push_code(symbol_code)?;
            seen += 1;
        }
    }
    if seen != frequencies.total() {
        return Err(input_changed(seen));
    }

    let body_bits = bits.bits_written();
    bits.flush()?;
    debug!(header_size, body_bits, "encoded message");
    Ok(code)
}

fn input_changed(offset: u64) -> HuffmanError {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("input changed between passes at byte {offset}"),
    )
    .into()
}

/// Encodes a whole in-memory message.
pub fn encode(input: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode_stream(&FrequencyTable::build(input), input, &mut out)?;
    Ok(out)
}

/// Encodes `input` into `output`, reading the input file twice.
pub fn encode_file(input: &Path, output: &Path) -> Result<HuffmanCode> {
    let frequencies = FrequencyTable::from_reader(BufReader::new(File::open(input)?))?;
    let body = File::open(input)?;
    let mut sink = BufWriter::new(File::create(output)?);
    let code = encode_stream(&frequencies, body, &mut sink)?;
    sink.flush()?;
    Ok(code)
}

/// Reads a header and body from `source`, writing the message to `sink`.
///
/// Exactly as many symbols as the header accounts for are produced; pad bits
/// and anything after the body are never read as symbols.
///
/// The message size comes from the header alone. A single-symbol header
/// yields its whole count without consuming any body, so untrusted input
/// should go through [`decode_stream_limited`].
pub fn decode_stream<R: Read, W: Write>(source: &mut R, sink: &mut W) -> Result<HuffmanCode> {
    decode_stream_limited(source, sink, u64::MAX)
}

/// Like [`decode_stream`], but fails before writing anything when the header
/// declares more than `max_output` symbols.
pub fn decode_stream_limited<R: Read, W: Write>(
    source: &mut R,
    sink: &mut W,
    max_output: u64,
) -> Result<HuffmanCode> {
    let frequencies = read_header(source)?;
    if frequencies.total() > max_output {
        return Err(FormatError::MessageTooLarge {
            size: frequencies.total(),
            limit: max_output,
        }
        .into());
    }
    let code = HuffmanCode::generate(&frequencies);
    let total = code.message_size();
    let _span = info_span!("decode", message_size = total).entered();

    match code.tree().map(HuffmanTree::root) {
        None => {}
        Some(Node::Leaf { symbol, .. }) => write_repeated(sink, *symbol, total)?,
        Some(root) => descend_all(root, BitReader::new(source), sink, total)?,
    }

    sink.flush()?;
    debug!(symbols = total, "decoded message");
    Ok(code)
}

fn write_repeated<W: Write>(sink: &mut W, symbol: u8, count: u64) -> io::Result<()> {
    let chunk = [symbol; CHUNK_SIZE];
    let mut remaining = count;
    while remaining > 0 {
        let n = remaining.min(CHUNK_SIZE as u64) as usize;
        sink.write_all(&chunk[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

fn descend_all<R: Read, W: Write>(
    root: &Node,
    mut bits: BitReader<R>,
    sink: &mut W,
    total: u64,
) -> Result<()> {
    let mut staged = Vec::with_capacity(CHUNK_SIZE);
    for decoded in 0..total {
        let mut node = root;
        let symbol = loop {
            match node {
                Node::Leaf { symbol, .. } => break *symbol,
                Node::Internal { left, right, .. } => {
                    node = match bits.next_bit()? {
                        Some(false) => left,
                        Some(true) => right,
                        None => {
                            return Err(FormatError::TruncatedBody {
                                decoded,
                                expected: total,
                            }
                            .into());
                        }
                    };
                }
            }
        };
        staged.push(symbol);
        if staged.len() == CHUNK_SIZE {
            sink.write_all(&staged)?;
            staged.clear();
        }
    }
    sink.write_all(&staged)?;
    Ok(())
}

/// Decodes a whole in-memory encoded stream.
///
/// The output is sized by the header, so a crafted header can ask for far
/// more memory than `input` suggests. Use [`decode_limited`] for untrusted data.
pub fn decode(input: &[u8]) -> Result<Vec<u8>> {
    decode_limited(input, u64::MAX)
}

pub fn decode_limited(input: &[u8], max_output: u64) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decode_stream_limited(&mut &input[..], &mut out, max_output)?;
    Ok(out)
}

pub fn decode_file(input: &Path, output: &Path) -> Result<HuffmanCode> {
    decode_file_limited(input, output, u64::MAX)
}

/// Decodes `input` into `output`, refusing headers that declare more than
/// `max_output` bytes.
pub fn decode_file_limited(input: &Path, output: &Path, max_output: u64) -> Result<HuffmanCode> {
    let mut source = BufReader::new(File::open(input)?);
    let mut sink = BufWriter::new(File::create(output)?);
    decode_stream_limited(&mut source, &mut sink, max_output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{frequency_width, header_size};

    /// Accepts `remaining` bytes, then fails every write.
    struct FailingSink {
        remaining: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::other("sink closed"));
            }
            let n = buf.len().min(self.remaining);
            self.remaining -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingSource;

    impl Read for FailingSource {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("source gone"))
        }
    }

    fn long_message() -> Vec<u8> {
        b"the quick brown fox jumps over the lazy dog".repeat(2_000)
    }

    #[test]
    fn roundtrips_sample_message() {
        let input = b"ABCDEFGHABBBBB";
        let encoded = encode(input).unwrap();
        assert_eq!(decode(&encoded).unwrap(), input.to_vec());
    }

    #[test]
    fn empty_message() {
        let encoded = encode(b"").unwrap();
        assert_eq!(encoded, vec![0, 0, 0, 0, 1, 0, 0, 0]);
        assert!(decode(&encoded).unwrap().is_empty());
    }

    #[test]
    fn single_byte_message() {
        let encoded = encode(b"z").unwrap();
        assert_eq!(encoded.len() as u64, header_size(1, 1));
        assert_eq!(decode(&encoded).unwrap(), b"z".to_vec());
    }

    #[test]
    fn single_symbol_message_has_no_body() {
        let encoded = encode(b"AAAA").unwrap();
        assert_eq!(encoded, vec![1, 0, 0, 0, 1, 0, 0, 0, b'A', 4]);
        assert_eq!(decode(&encoded).unwrap(), b"AAAA".to_vec());
    }

    #[test]
    fn long_single_symbol_message() {
        let input = vec![7u8; CHUNK_SIZE * 3 + 5];
        let encoded = encode(&input).unwrap();
        assert_eq!(encoded.len() as u64, header_size(1, 2));
        assert_eq!(decode(&encoded).unwrap(), input);
    }

    #[test]
    fn two_symbol_body_bits() {
        // B is the left leaf (code 0), A the right one (code 1)
        let encoded = encode(b"AAB").unwrap();
        assert_eq!(encoded.len(), 13);
        assert_eq!(encoded[12], 0b1100_0000);
    }

    #[test]
    fn pad_bits_are_not_decoded() {
        // 3 body bits leave 5 zero pad bits, which would decode as B
        let encoded = encode(b"AAB").unwrap();
        assert_eq!(decode(&encoded).unwrap(), b"AAB".to_vec());
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut encoded = encode(b"hello world").unwrap();
        encoded.extend_from_slice(&[0xFF, 0x00, 0xAA]);
        assert_eq!(decode(&encoded).unwrap(), b"hello world".to_vec());
    }

    #[test]
    fn truncated_body_is_a_format_error() {
        let input: Vec<u8> = b"the quick brown fox jumps over the lazy dog".repeat(4);
        let mut encoded = encode(&input).unwrap();
        encoded.truncate(encoded.len() - 3);
        let err = decode(&encoded).unwrap_err();
        assert!(matches!(
            err,
            HuffmanError::Format(FormatError::TruncatedBody { expected, .. })
                if expected == input.len() as u64
        ));
    }

    #[test]
    fn changed_input_is_rejected() {
        let frequencies = FrequencyTable::build(b"aab");
        let mut out = Vec::new();
        let err = encode_stream(&frequencies, &b"aac"[..], &mut out).unwrap_err();
        assert!(matches!(err, HuffmanError::Io(ref e) if e.kind() == io::ErrorKind::InvalidData));

        let mut out = Vec::new();
        let err = encode_stream(&frequencies, &b"aa"[..], &mut out).unwrap_err();
        assert!(matches!(err, HuffmanError::Io(_)));
    }

    #[test]
    fn generated_code_reports_sizes() {
        let code = HuffmanCode::generate(&FrequencyTable::build(b"ABCDEFGHABBBBB"));
        assert_eq!(code.message_size(), 14);
        assert_eq!(code.table().len(), 8);
        assert_eq!(
            code.total_bit_length(),
            code.table().render(b"ABCDEFGHABBBBB").unwrap().len() as u64
        );

        let empty = HuffmanCode::generate(&FrequencyTable::new());
        assert_eq!(empty.message_size(), 0);
        assert_eq!(empty.total_bit_length(), 0);
        assert!(empty.tree().is_none());
    }

    #[test]
    fn encode_aborts_when_the_sink_fails() {
        let data = long_message();
        let frequencies = FrequencyTable::build(&data);
        let width = frequency_width(frequencies.max_frequency());
        let header = header_size(frequencies.len(), width) as usize;
        // inside the header, at its end, and well into the body
        for remaining in [0, 1, 5, header, header + 10, header + 5_000] {
            let mut sink = FailingSink { remaining };
            let err = encode_stream(&frequencies, &data[..], &mut sink).unwrap_err();
            assert!(matches!(err, HuffmanError::Io(_)), "remaining = {remaining}");
        }
    }

    #[test]
    fn decode_aborts_when_the_sink_fails() {
        let data = long_message();
        let encoded = encode(&data).unwrap();
        for remaining in [0, 100, CHUNK_SIZE + 1] {
            let mut sink = FailingSink { remaining };
            let err = decode_stream(&mut &encoded[..], &mut sink).unwrap_err();
            assert!(matches!(err, HuffmanError::Io(_)), "remaining = {remaining}");
        }

        let single = encode(&[b'z'; 20_000]).unwrap();
        let mut sink = FailingSink { remaining: 10 };
        let err = decode_stream(&mut &single[..], &mut sink).unwrap_err();
        assert!(matches!(err, HuffmanError::Io(_)));
    }

    #[test]
    fn decode_aborts_when_the_source_fails_after_the_header() {
        let data = long_message();
        let encoded = encode(&data).unwrap();
        let frequencies = FrequencyTable::build(&data);
        let width = frequency_width(frequencies.max_frequency());
        let header = header_size(frequencies.len(), width) as usize;
        let mut source = (&encoded[..header]).chain(FailingSource);
        let err = decode_stream(&mut source, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, HuffmanError::Io(_)));
    }

    #[test]
    fn encode_aborts_when_the_body_source_fails() {
        let frequencies = FrequencyTable::build(b"abc");
        let err = encode_stream(&frequencies, FailingSource, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, HuffmanError::Io(_)));
    }

    #[test]
    fn oversized_header_is_refused_before_output() {
        // one symbol claiming 2^56 occurrences, no body needed
        let mut encoded = vec![1, 0, 0, 0, 8, 0, 0, 0, b'x'];
        encoded.extend_from_slice(&(1u64 << 56).to_le_bytes());

        let mut sink = Vec::new();
        let err = decode_stream_limited(&mut &encoded[..], &mut sink, 1 << 20).unwrap_err();
        assert!(matches!(
            err,
            HuffmanError::Format(FormatError::MessageTooLarge { size, limit })
                if size == 1 << 56 && limit == 1 << 20
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn limit_allows_messages_up_to_its_size() {
        let encoded = encode(b"abracadabra").unwrap();
        assert_eq!(decode_limited(&encoded, 11).unwrap(), b"abracadabra".to_vec());
        assert!(decode_limited(&encoded, 10).unwrap_err().is_format());
    }
}
