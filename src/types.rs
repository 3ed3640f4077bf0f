use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CircuitError>;

/// Errors raised by graph mutations, queries and (de)serialization.
///
/// Every variant reflects a caller contract violation and is raised
/// synchronously at the point of violation; there are no transient failures
/// to retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CircuitError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("tensor rank mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("bitstring of length {actual} does not match qubit count {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("invalid character {0:?} in bitstring, expected '0' or '1'")]
    InvalidCharacter(char),

    #[error("index {0} is not a valid axis assignment for the decomposed node")]
    UnknownIndex(IndexLabel),

    #[error("unknown label {0}")]
    UnknownLabel(String),
}

/// Identifier of a node in the graph, also used as the storage key for the
/// node's tensor payload.
///
/// Labels are integer handles internally; the human-readable `node_<n>` form
/// produced by [`fmt::Display`] is what appears in serialized documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeLabel(u64);

impl NodeLabel {
    /// Returns the numeric suffix of the label.
    #[inline]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

impl FromStr for NodeLabel {
    type Err = CircuitError;

    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix("node_")
            .and_then(|n| n.parse().ok())
            .map(NodeLabel)
            .ok_or_else(|| CircuitError::UnknownLabel(s.to_owned()))
    }
}

/// Identifier of an edge, i.e. of one shared tensor index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexLabel(u64);

impl IndexLabel {
    /// Returns the numeric suffix of the label.
    #[inline]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for IndexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index_{}", self.0)
    }
}

impl FromStr for IndexLabel {
    type Err = CircuitError;

    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix("index_")
            .and_then(|n| n.parse().ok())
            .map(IndexLabel)
            .ok_or_else(|| CircuitError::UnknownLabel(s.to_owned()))
    }
}

/// Generates unique, monotonically increasing labels, namespaced by kind.
///
/// Counters only ever grow, so labels are never reused within one graph's
/// lifetime even after nodes are deleted; a stale reference surfaces as an
/// "unknown label" instead of silently aliasing a newer object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelAllocator {
    nodes: u64,
    indices: u64,
}

impl LabelAllocator {
    /// Returns a fresh node label. The first label handed out is `node_1`.
    pub fn next_node_label(&mut self) -> NodeLabel {
        self.nodes += 1;
        NodeLabel(self.nodes)
    }

    /// Returns a fresh index label. The first label handed out is `index_1`.
    pub fn next_index_label(&mut self) -> IndexLabel {
        self.indices += 1;
        IndexLabel(self.indices)
    }

    /// Rebuilds an allocator from persisted counter values.
    pub(crate) fn with_counters(nodes: u64, indices: u64) -> Self {
        Self { nodes, indices }
    }
}
