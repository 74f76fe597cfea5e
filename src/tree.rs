use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use tracing::{debug, trace};

use crate::frequency::FrequencyTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf {
        symbol: u8,
        frequency: u64,
    },
    /// `frequency` is always the sum of both children.
    Internal {
        frequency: u64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn frequency(&self) -> u64 {
        match self {
            Node::Leaf { frequency, .. } | Node::Internal { frequency, .. } => *frequency,
        }
    }

    pub fn symbol(&self) -> Option<u8> {
        match self {
            Node::Leaf { symbol, .. } => Some(*symbol),
            Node::Internal { .. } => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    fn merge(left: Node, right: Node) -> Node {
        Node::Internal {
            frequency: left.frequency() + right.frequency(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// Entry of the merge queue.
///
/// Ordered so that `BinaryHeap` pops the lowest frequency first, and among
/// equal frequencies the entry that was inserted first.
struct Pending {
    frequency: u64,
    order: u64,
    node: Node,
}

impl Eq for Pending {}
impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.frequency == other.frequency && self.order == other.order
    }
}
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .frequency
            .cmp(&self.frequency)
            .then_with(|| other.order.cmp(&self.order))
    }
}
impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Immutable Huffman tree over a non-empty alphabet.
///
/// A single-symbol alphabet is represented by a lone leaf at the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
    root: Node,
}

impl HuffmanTree {
    /// Builds the tree by greedy merging, or `None` for an empty table.
    ///
    /// Leaves enter the queue in ascending symbol order and every merged node
    /// is appended after them, so ties between equal frequencies go to the
    /// node that was queued first. The first node popped becomes the left
    /// child. Encoder and decoder both rely on this to rebuild the same tree.
    pub fn build(frequencies: &FrequencyTable) -> Option<Self> {
        let mut queue: BinaryHeap<Pending> = frequencies
            .iter()
            .enumerate()
            .map(|(order, (symbol, frequency))| Pending {
                frequency,
                order: order as u64,
                node: Node::Leaf { symbol, frequency },
            })
            .collect();
        let mut next_order = queue.len() as u64;

        while queue.len() > 1 {
            let (Some(left), Some(right)) = (queue.pop(), queue.pop()) else {
                unreachable!("queue holds at least two nodes");
            };
            let node = Node::merge(left.node, right.node);
            trace!(frequency = node.frequency(), order = next_order, "merged subtrees");
            queue.push(Pending {
                frequency: node.frequency(),
                order: next_order,
                node,
            });
            next_order += 1;
        }

        let root = queue.pop()?.node;
        debug!(
            symbols = frequencies.len(),
            message_size = root.frequency(),
            "built huffman tree"
        );
        Some(Self { root })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Total number of symbols in the message.
    pub fn frequency(&self) -> u64 {
        self.root.frequency()
    }

    pub fn is_single_leaf(&self) -> bool {
        self.root.is_leaf()
    }

    /// Leaves in left-to-right order as `(symbol, frequency)`.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            stack: vec![&self.root],
        }
    }

    pub fn symbol_count(&self) -> usize {
        self.leaves().count()
    }

    pub fn max_frequency(&self) -> u64 {
        self.leaves().map(|(_, f)| f).max().unwrap_or(0)
    }
}

pub struct Leaves<'a> {
    stack: Vec<&'a Node>,
}

impl Iterator for Leaves<'_> {
    type Item = (u8, u64);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                Node::Leaf { symbol, frequency } => return Some((*symbol, *frequency)),
                Node::Internal { left, right, .. } => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
            }
        }
        None
    }
}

pub(crate) fn symbol_label(symbol: u8) -> String {
    if symbol.is_ascii_graphic() || symbol == b' ' {
        format!("'{}'", symbol as char)
    } else {
        format!("{symbol:#04x}")
    }
}

/// Sideways view: right subtree above left, `|` marking open branches.
impl fmt::Display for HuffmanTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn walk(
            f: &mut fmt::Formatter<'_>,
            node: &Node,
            branch: &mut Vec<bool>,
            next: bool,
        ) -> fmt::Result {
            for &open in branch.iter() {
                write!(f, "  {}", if open { '|' } else { ' ' })?;
            }
            if !branch.is_empty() {
                write!(f, "  +")?;
            }
            match node {
                Node::Leaf { symbol, frequency } => {
                    writeln!(f, " [{}, {}]", symbol_label(*symbol), frequency)
                }
                Node::Internal {
                    frequency,
                    left,
                    right,
                } => {
                    writeln!(f, " [{frequency}]")?;
                    branch.push(next);
                    walk(f, right, branch, true)?;
                    walk(f, left, branch, false)?;
                    branch.pop();
                    Ok(())
                }
            }
        }

        walk(f, &self.root, &mut Vec::new(), false)
    }
}
