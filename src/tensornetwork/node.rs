use std::fmt;

use crate::types::{IndexLabel, NodeLabel};

/// Abstract representation of one tensor in the network. Stores the ordered
/// sequence of index labels (the tensor's axes) and the label under which the
/// numeric payload is stored in the backend. Axis order always matches the
/// physical axis order of the stored tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    indices: Vec<IndexLabel>,
    data_label: NodeLabel,
}

impl Node {
    /// Constructs a node from its axis labels and storage label.
    pub fn new(indices: Vec<IndexLabel>, data_label: NodeLabel) -> Self {
        Self { indices, data_label }
    }

    /// Returns the axis labels in order.
    #[inline]
    pub fn indices(&self) -> &[IndexLabel] {
        &self.indices
    }

    /// Returns the label the payload is stored under.
    #[inline]
    pub fn data_label(&self) -> NodeLabel {
        self.data_label
    }

    /// Rank of the associated tensor.
    #[inline]
    pub fn rank(&self) -> usize {
        self.indices.len()
    }

    /// Returns whether `index` appears among the node's axes.
    pub fn contains_index(&self, index: IndexLabel) -> bool {
        self.indices.contains(&index)
    }

    /// Replaces every occurrence of `old` in the axis list with `new`. Used
    /// when an upstream edge is relabeled during gate insertion.
    pub(crate) fn replace_index(&mut self, old: IndexLabel, new: IndexLabel) {
        for index in &mut self.indices {
            if *index == old {
                *index = new;
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indices: Vec<String> = self.indices.iter().map(|i| i.to_string()).collect();
        write!(f, "[{}] -> {}", indices.join(", "), self.data_label)
    }
}
