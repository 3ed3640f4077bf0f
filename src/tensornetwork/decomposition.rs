//! Splitting one tensor node into two factors joined by a virtual bond.
//!
//! This is the mechanism behind both two-qubit-gate factoring and bond
//! compression: the node's payload is matricized across a caller-chosen axis
//! bipartition, decomposed by a truncated SVD in the backend, and the graph
//! is rewired so the two factors take the original node's place. The numeric
//! rank of the new bond is data-dependent and only known at runtime, so all
//! validation happens before any mutation is committed: a failed call leaves
//! the graph untouched.

use log::debug;
use rustc_hash::FxHashMap;

use crate::backend::TensorBackend;
use crate::tensornetwork::circuit::TensorNetworkCircuit;
use crate::tensornetwork::edge::Edge;
use crate::tensornetwork::node::Node;
use crate::types::{CircuitError, IndexLabel, NodeLabel, Result};

/// Truncation threshold used when a two-qubit gate is split at insertion
/// time. Low enough to only discard numerical noise, keeping the exact
/// operator-Schmidt rank of the gate.
pub const DEFAULT_SVD_THRESHOLD: f64 = 1e-13;

impl TensorNetworkCircuit {
    /// Factors the tensor of `node_label` into two nodes joined by a new
    /// virtual bond, discarding singular values at or below `threshold`.
    ///
    /// `left_indices` and `right_indices` must partition the node's index
    /// set: together they name every axis exactly once (order within each
    /// group is preserved). The left factor keeps `left_indices` plus the
    /// bond as its last axis; the right factor gets the bond first, then
    /// `right_indices`. Each factor absorbs the square root of the singular
    /// values so the two stay comparably scaled.
    ///
    /// `left_label` / `right_label` override the freshly allocated labels of
    /// the factors; a supplied label must not collide with a registered node.
    /// The original node is removed from the registry; every surrounding edge
    /// is repointed to the factor that kept its index.
    ///
    /// Returns the labels of the left and right factor. A bond dimension of
    /// zero (every singular value truncated) is a degenerate success, not an
    /// error.
    #[allow(clippy::too_many_arguments)]
    pub fn decompose<B: TensorBackend>(
        &mut self,
        backend: &mut B,
        node_label: NodeLabel,
        left_indices: &[IndexLabel],
        right_indices: &[IndexLabel],
        threshold: f64,
        left_label: Option<NodeLabel>,
        right_label: Option<NodeLabel>,
    ) -> Result<(NodeLabel, NodeLabel)> {
        let (node_indices, data_label) = {
            let node = self.node(node_label)?;
            (node.indices().to_vec(), node.data_label())
        };

        // Map index labels to axis positions and check that the two lists
        // assign every axis to exactly one side.
        let positions: FxHashMap<IndexLabel, usize> = node_indices
            .iter()
            .enumerate()
            .map(|(position, &index)| (index, position))
            .collect();
        let mut assigned = vec![false; node_indices.len()];
        for &index in left_indices.iter().chain(right_indices) {
            let Some(&position) = positions.get(&index) else {
                return Err(CircuitError::UnknownIndex(index));
            };
            if assigned[position] {
                return Err(CircuitError::UnknownIndex(index));
            }
            assigned[position] = true;
        }
        if let Some(position) = assigned.iter().position(|&done| !done) {
            return Err(CircuitError::UnknownIndex(node_indices[position]));
        }

        let left_node = match left_label {
            Some(label) => self.claim_label(label)?,
            None => self.label_allocator().next_node_label(),
        };
        let right_node = match right_label {
            Some(label) => self.claim_label(label)?,
            None => self.label_allocator().next_node_label(),
        };
        if left_node == right_node {
            return Err(CircuitError::InvalidArgument(format!(
                "left and right factor labels coincide: {left_node}"
            )));
        }

        let left_axes: Vec<usize> = left_indices.iter().map(|index| positions[index]).collect();
        let right_axes: Vec<usize> = right_indices.iter().map(|index| positions[index]).collect();

        let split = backend.decompose_tensor(data_label, &left_axes, &right_axes, threshold)?;
        backend.store_tensor(left_node, left_node, split.left)?;
        backend.store_tensor(right_node, right_node, split.right)?;

        // Graph surgery: register the factors and the bond, repoint the
        // surrounding edges, then drop the original node.
        let bond = self.label_allocator().next_index_label();
        let mut left_node_indices = left_indices.to_vec();
        left_node_indices.push(bond);
        let mut right_node_indices = vec![bond];
        right_node_indices.extend_from_slice(right_indices);
        self.insert_node(left_node, Node::new(left_node_indices, left_node));
        self.insert_node(right_node, Node::new(right_node_indices, right_node));
        self.insert_edge(bond, Edge::virtual_bond(left_node, right_node));
        for &index in left_indices {
            self.edge_mut(index)
                .expect("node index refers to a registered edge")
                .repoint(node_label, left_node);
        }
        for &index in right_indices {
            self.edge_mut(index)
                .expect("node index refers to a registered edge")
                .repoint(node_label, right_node);
        }
        self.remove_node(node_label);

        debug!(
            "decomposed {node_label} into {left_node} | {right_node}, bond {bond} of dimension {}",
            split.bond_dimension
        );
        Ok((left_node, right_node))
    }

    /// Validates a caller-supplied factor label. The decomposed node itself
    /// still counts as registered at this point, so reusing its label is
    /// rejected as well.
    fn claim_label(&self, label: NodeLabel) -> Result<NodeLabel> {
        if self.nodes().contains_key(&label) {
            return Err(CircuitError::InvalidArgument(format!(
                "label {label} is already in use"
            )));
        }
        Ok(label)
    }
}
