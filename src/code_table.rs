use std::collections::BTreeMap;
use std::fmt;

use crate::tree::{HuffmanTree, Node, symbol_label};

/// Root-to-leaf path of a symbol; `0` is a step left, `1` a step right.
///
/// The path is right-aligned in `value` with its first step in the most
/// significant of the `len` used bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Code {
    value: u128,
    len: u32,
}

impl Code {
    pub const MAX_LEN: u32 = u128::BITS;

    pub fn value(&self) -> u128 {
        self.value
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Path extended by one step.
    fn step(self, right: bool) -> Code {
        // header totals fit in u64, which keeps tree depth at or below 92
        debug_assert!(self.len < Self::MAX_LEN, "code longer than {} bits", Self::MAX_LEN);
        Code {
            value: (self.value << 1) | u128::from(right),
            len: self.len + 1,
        }
    }

    /// Step `i` of the path, counted from the root.
    pub fn bit(&self, i: u32) -> bool {
        debug_assert!(i < self.len);
        (self.value >> (self.len - 1 - i)) & 1 == 1
    }

    pub fn is_prefix_of(&self, other: &Code) -> bool {
        self.len <= other.len
            && other.value.checked_shr(other.len - self.len).unwrap_or(0) == self.value
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len {
            f.write_str(if self.bit(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Symbol to code mapping for one tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTable {
    codes: BTreeMap<u8, Code>,
}

impl CodeTable {
    /// Walks the tree once, recording the path to every leaf.
    ///
    /// A lone-leaf tree maps its symbol to the empty code.
    pub fn derive(tree: &HuffmanTree) -> Self {
        fn walk(node: &Node, path: Code, codes: &mut BTreeMap<u8, Code>) {
            match node {
                Node::Leaf { symbol, .. } => {
                    codes.insert(*symbol, path);
                }
                Node::Internal { left, right, .. } => {
                    walk(left, path.step(false), codes);
                    walk(right, path.step(true), codes);
                }
            }
        }

        let mut codes = BTreeMap::new();
        walk(tree.root(), Code::default(), &mut codes);
        Self { codes }
    }

    pub fn get(&self, symbol: u8) -> Option<&Code> {
        self.codes.get(&symbol)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Code)> + '_ {
        self.codes.iter().map(|(&symbol, code)| (symbol, code))
    }

    pub fn min_len(&self) -> u32 {
        self.codes.values().map(Code::len).min().unwrap_or(0)
    }

    pub fn max_len(&self) -> u32 {
        self.codes.values().map(Code::len).max().unwrap_or(0)
    }

    /// Body length in bits: frequency times code length, over all leaves.
    pub fn total_bit_length(&self, tree: &HuffmanTree) -> u64 {
        tree.leaves()
            .map(|(symbol, frequency)| {
                let len = self.codes.get(&symbol).map_or(0, Code::len);
                frequency * u64::from(len)
            })
            .sum()
    }

    /// The encoding of `input` as a string of `0` and `1` characters.
    ///
    /// Returns `None` if `input` holds a byte the table has no code for.
    pub fn render(&self, input: &[u8]) -> Option<String> {
        let mut out = String::new();
        for &b in input {
            out.push_str(&self.codes.get(&b)?.to_string());
        }
        Some(out)
    }
}

impl fmt::Display for CodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (symbol, code) in &self.codes {
            writeln!(f, "{}: {}", symbol_label(*symbol), code)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::FrequencyTable;

    fn table_for(data: &[u8]) -> (HuffmanTree, CodeTable) {
        let tree = HuffmanTree::build(&FrequencyTable::build(data)).unwrap();
        let table = CodeTable::derive(&tree);
        (tree, table)
    }

    #[test]
    fn code_steps_and_prefixes() {
        let a = Code::default().step(true).step(false);
        let b = a.step(true);
        assert_eq!(a.to_string(), "10");
        assert_eq!(b.to_string(), "101");
        assert!(a.is_prefix_of(&b));
        assert!(!b.is_prefix_of(&a));
        assert!(Code::default().is_prefix_of(&a));
    }

    #[test]
    fn deepest_possible_code_fits() {
        // Fibonacci frequencies give the deepest tree a u64 total allows
        let mut frequencies = FrequencyTable::new();
        let (mut a, mut b) = (1u64, 1u64);
        for symbol in 0..=90u8 {
            frequencies.insert(symbol, a).unwrap();
            (a, b) = (b, a + b);
        }
        let tree = HuffmanTree::build(&frequencies).unwrap();
        let table = CodeTable::derive(&tree);
        assert!(table.max_len() < Code::MAX_LEN);
        assert_eq!(frequencies.len(), 91);
        assert_eq!(table.max_len(), 90);
    }

    #[test]
    fn two_symbols_get_one_bit_each() {
        let (_, table) = table_for(b"AB");
        assert_eq!(table.get(b'A').unwrap().to_string(), "0");
        assert_eq!(table.get(b'B').unwrap().to_string(), "1");
    }

    #[test]
    fn single_symbol_gets_empty_code() {
        let (tree, table) = table_for(b"AAAA");
        assert_eq!(table.len(), 1);
        assert!(table.get(b'A').unwrap().is_empty());
        assert_eq!(table.total_bit_length(&tree), 0);
        assert_eq!(table.render(b"AAAA").unwrap(), "");
    }

    #[test]
    fn sample_message_code_lengths() {
        let (tree, table) = table_for(b"ABCDEFGHABBBBB");
        assert_eq!(table.len(), 8);
        assert!(table.min_len() >= 1);
        assert!(table.max_len() <= 7);

        let expected: u64 = tree
            .leaves()
            .map(|(s, f)| f * u64::from(table.get(s).unwrap().len()))
            .sum();
        assert_eq!(table.total_bit_length(&tree), expected);
        assert_eq!(
            table.render(b"ABCDEFGHABBBBB").unwrap().len() as u64,
            expected
        );
    }

    #[test]
    fn equal_frequencies_power_of_two() {
        let data: Vec<u8> = (0u8..16).collect();
        let (_, table) = table_for(&data);
        assert!(table.iter().all(|(_, code)| code.len() == 4));
    }

    #[test]
    fn codes_are_prefix_free() {
        let (_, table) = table_for(b"mi mama me mima y yo mimo a mi mama.");
        let codes: Vec<Code> = table.iter().map(|(_, c)| *c).collect();
        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i != j {
                    assert!(!a.is_prefix_of(b), "{a} is a prefix of {b}");
                }
            }
        }
    }

    #[test]
    fn render_rejects_unknown_symbols() {
        let (_, table) = table_for(b"AB");
        assert_eq!(table.render(b"ABC"), None);
    }
}
