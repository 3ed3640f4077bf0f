//! Construction and mutation of tensor-network circuit graphs.

use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use num_complex::Complex64;

use crate::backend::TensorBackend;
use crate::tensornetwork::decomposition::DEFAULT_SVD_THRESHOLD;
use crate::tensornetwork::edge::Edge;
use crate::tensornetwork::node::Node;
use crate::tensornetwork::tensordata::TensorData;
use crate::types::{CircuitError, IndexLabel, LabelAllocator, NodeLabel, Result};

/// Node labels produced by [`TensorNetworkCircuit::add_gate`]: either the
/// single gate node, or the two factors when the gate was split on insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateNodes {
    Single(NodeLabel),
    Split(NodeLabel, NodeLabel),
}

/// The computational-basis vector bound to a boundary edge.
fn basis_state(bit: bool) -> TensorData {
    let amplitudes = if bit {
        vec![Complex64::ZERO, Complex64::ONE]
    } else {
        vec![Complex64::ONE, Complex64::ZERO]
    };
    TensorData::new_from_flat(&[2], amplitudes).expect("basis vector matches shape [2]")
}

#[derive(Debug, Clone, Copy)]
enum BoundarySide {
    Input,
    Output,
}

/// A quantum circuit represented as a tensor network.
///
/// The graph owns ordered node and edge registries (insertion order is
/// observable through serialization and default traversal), a label
/// allocator, and one "currently open" index per qubit on the input and
/// output side. The open output index of a qubit is where the next gate on
/// that qubit attaches.
///
/// All mutations are synchronous single-threaded read-modify-write sequences;
/// a graph under construction must not be shared between writer threads.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorNetworkCircuit {
    num_qubits: usize,
    input_indices: Vec<IndexLabel>,
    output_indices: Vec<IndexLabel>,
    nodes: IndexMap<NodeLabel, Node>,
    edges: IndexMap<IndexLabel, Edge>,
    labels: LabelAllocator,
}

impl TensorNetworkCircuit {
    /// Creates a circuit graph over `num_qubits` qubits. Each qubit starts
    /// with one doubly-open physical wire; no nodes exist yet.
    ///
    /// # Examples
    /// ```
    /// use tncircuit::tensornetwork::circuit::TensorNetworkCircuit;
    ///
    /// let circuit = TensorNetworkCircuit::new(3).unwrap();
    /// assert_eq!(circuit.edges().len(), 3);
    /// assert_eq!(circuit.nodes().len(), 0);
    /// ```
    pub fn new(num_qubits: usize) -> Result<Self> {
        if num_qubits == 0 {
            return Err(CircuitError::InvalidArgument(
                "a circuit needs at least one qubit".to_owned(),
            ));
        }
        let mut labels = LabelAllocator::default();
        let mut input_indices = Vec::with_capacity(num_qubits);
        let mut edges = IndexMap::with_capacity(num_qubits);
        for qubit in 1..=num_qubits {
            let index = labels.next_index_label();
            edges.insert(index, Edge::open_wire(qubit));
            input_indices.push(index);
        }
        Ok(Self {
            num_qubits,
            output_indices: input_indices.clone(),
            input_indices,
            nodes: IndexMap::new(),
            edges,
            labels,
        })
    }

    /// Number of qubits the graph was created with.
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// The node registry in insertion order.
    #[inline]
    pub fn nodes(&self) -> &IndexMap<NodeLabel, Node> {
        &self.nodes
    }

    /// The edge registry in insertion order.
    #[inline]
    pub fn edges(&self) -> &IndexMap<IndexLabel, Edge> {
        &self.edges
    }

    /// Currently open input index per qubit position.
    #[inline]
    pub fn input_indices(&self) -> &[IndexLabel] {
        &self.input_indices
    }

    /// Currently open output index per qubit position.
    #[inline]
    pub fn output_indices(&self) -> &[IndexLabel] {
        &self.output_indices
    }

    /// Looks up a node by label.
    pub fn node(&self, label: NodeLabel) -> Result<&Node> {
        self.nodes
            .get(&label)
            .ok_or_else(|| CircuitError::UnknownLabel(label.to_string()))
    }

    /// Looks up an edge by index label.
    pub fn edge(&self, label: IndexLabel) -> Result<&Edge> {
        self.edges
            .get(&label)
            .ok_or_else(|| CircuitError::UnknownLabel(label.to_string()))
    }

    pub(crate) fn label_allocator(&mut self) -> &mut LabelAllocator {
        &mut self.labels
    }

    pub(crate) fn edge_mut(&mut self, label: IndexLabel) -> Option<&mut Edge> {
        self.edges.get_mut(&label)
    }

    pub(crate) fn insert_node(&mut self, label: NodeLabel, node: Node) {
        self.nodes.insert(label, node);
    }

    pub(crate) fn insert_edge(&mut self, label: IndexLabel, edge: Edge) {
        self.edges.insert(label, edge);
    }

    /// Removes a node, preserving the insertion order of the remainder.
    pub(crate) fn remove_node(&mut self, label: NodeLabel) {
        self.nodes.shift_remove(&label);
    }

    /// Reassembles a graph from its persisted parts. Counters must already be
    /// re-derived by the caller.
    pub(crate) fn from_parts(
        num_qubits: usize,
        input_indices: Vec<IndexLabel>,
        output_indices: Vec<IndexLabel>,
        nodes: IndexMap<NodeLabel, Node>,
        edges: IndexMap<IndexLabel, Edge>,
        labels: LabelAllocator,
    ) -> Self {
        Self {
            num_qubits,
            input_indices,
            output_indices,
            nodes,
            edges,
            labels,
        }
    }

    /// Appends a gate to the circuit on the given target qubits.
    ///
    /// `payload` must have rank `2 * target_qubits.len()`: the first half of
    /// its axes are the gate inputs, the second half the outputs, both in
    /// target-qubit order. Qubit positions are 1-based and must be distinct.
    /// The payload is stored in the backend under the new node's label.
    ///
    /// With `decompose = true` a two-qubit gate is immediately split into two
    /// single-qubit-acting factors joined by a virtual bond, truncated at
    /// [`DEFAULT_SVD_THRESHOLD`].
    ///
    /// # Examples
    /// ```
    /// use tncircuit::backend::MemoryBackend;
    /// use tncircuit::gates::load_gate;
    /// use tncircuit::tensornetwork::circuit::TensorNetworkCircuit;
    ///
    /// let mut backend = MemoryBackend::new();
    /// let mut circuit = TensorNetworkCircuit::new(2).unwrap();
    /// circuit.add_gate(&mut backend, load_gate("h", &[]), &[1], false).unwrap();
    /// circuit.add_gate(&mut backend, load_gate("cx", &[]), &[1, 2], false).unwrap();
    /// assert_eq!(circuit.nodes().len(), 2);
    /// assert_eq!(circuit.edges().len(), 2 + 3);
    /// ```
    pub fn add_gate<B: TensorBackend>(
        &mut self,
        backend: &mut B,
        payload: TensorData,
        target_qubits: &[usize],
        decompose: bool,
    ) -> Result<GateNodes> {
        self.check_targets(target_qubits)?;
        let arity = target_qubits.len();
        if payload.ndim() != 2 * arity {
            return Err(CircuitError::DimensionMismatch {
                expected: 2 * arity,
                actual: payload.ndim(),
            });
        }

        // The currently open output index of every target wire becomes a gate
        // input; one fresh index per wire becomes the matching output.
        let input_indices: Vec<IndexLabel> = target_qubits
            .iter()
            .map(|&q| self.output_indices[q - 1])
            .collect();
        let output_indices: Vec<IndexLabel> = (0..arity)
            .map(|_| self.labels.next_index_label())
            .collect();
        let node_label = self.labels.next_node_label();

        backend.store_tensor(node_label, node_label, payload)?;

        let mut indices = input_indices.clone();
        indices.extend(&output_indices);
        self.nodes.insert(node_label, Node::new(indices, node_label));

        for ((&qubit, &in_index), &out_index) in
            target_qubits.iter().zip(&input_indices).zip(&output_indices)
        {
            // The new output edge inherits the downstream endpoint of the old
            // open edge; this threads the gate into an existing chain when
            // inserting after decomposition or after output binding.
            let inherited = self.edges[&in_index].destination();
            if let Some(downstream) = inherited {
                self.nodes
                    .get_mut(&downstream)
                    .expect("edge endpoint refers to a registered node")
                    .replace_index(in_index, out_index);
            }
            self.edges.insert(
                out_index,
                Edge::new(Some(node_label), inherited, Some(qubit), false),
            );
            self.edges
                .get_mut(&in_index)
                .expect("open output index refers to a registered edge")
                .set_destination(Some(node_label));
            self.output_indices[qubit - 1] = out_index;
        }
        debug!(
            "added gate {} on qubits {:?} ({} -> {})",
            node_label,
            target_qubits,
            input_indices.iter().join(" "),
            output_indices.iter().join(" "),
        );

        if decompose && arity == 2 {
            let left = [input_indices[0], output_indices[0]];
            let right = [input_indices[1], output_indices[1]];
            let (left_node, right_node) = self.decompose(
                backend,
                node_label,
                &left,
                &right,
                DEFAULT_SVD_THRESHOLD,
                None,
                None,
            )?;
            return Ok(GateNodes::Split(left_node, right_node));
        }
        Ok(GateNodes::Single(node_label))
    }

    /// Binds fixed single-qubit input states to the open input edges.
    ///
    /// `bits` holds one `'0'`/`'1'` per qubit. Positions whose input edge is
    /// already bound are skipped, so repeated calls are no-ops. Returns the
    /// labels of the boundary nodes created by this call.
    pub fn add_input<B: TensorBackend>(
        &mut self,
        backend: &mut B,
        bits: &str,
    ) -> Result<Vec<NodeLabel>> {
        self.bind_boundary(backend, bits, BoundarySide::Input)
    }

    /// Binds fixed single-qubit output states to the open output edges. The
    /// counterpart of [`TensorNetworkCircuit::add_input`].
    pub fn add_output<B: TensorBackend>(
        &mut self,
        backend: &mut B,
        bits: &str,
    ) -> Result<Vec<NodeLabel>> {
        self.bind_boundary(backend, bits, BoundarySide::Output)
    }

    fn bind_boundary<B: TensorBackend>(
        &mut self,
        backend: &mut B,
        bits: &str,
        side: BoundarySide,
    ) -> Result<Vec<NodeLabel>> {
        let length = bits.chars().count();
        if length != self.num_qubits {
            return Err(CircuitError::LengthMismatch {
                expected: self.num_qubits,
                actual: length,
            });
        }
        if let Some(c) = bits.chars().find(|c| *c != '0' && *c != '1') {
            return Err(CircuitError::InvalidCharacter(c));
        }

        let mut created = Vec::new();
        for (position, c) in bits.chars().enumerate() {
            let index = match side {
                BoundarySide::Input => self.input_indices[position],
                BoundarySide::Output => self.output_indices[position],
            };
            let edge = &self.edges[&index];
            let already_bound = match side {
                BoundarySide::Input => edge.source().is_some(),
                BoundarySide::Output => edge.destination().is_some(),
            };
            if already_bound {
                continue;
            }
            let label = self.labels.next_node_label();
            backend.store_tensor(label, label, basis_state(c == '1'))?;
            self.nodes.insert(label, Node::new(vec![index], label));
            let edge = self
                .edges
                .get_mut(&index)
                .expect("boundary index refers to a registered edge");
            match side {
                BoundarySide::Input => edge.set_source(Some(label)),
                BoundarySide::Output => edge.set_destination(Some(label)),
            }
            created.push(label);
        }
        debug!("bound {:?} boundary {bits:?}: {} new node(s)", side, created.len());
        Ok(created)
    }

    /// All nodes sharing an edge with `label`, in first-seen order, without
    /// duplicates or self-loops. Covers directed and virtual edges alike.
    pub fn neighbors(&self, label: NodeLabel) -> Result<Vec<NodeLabel>> {
        let node = self.node(label)?;
        let mut out = Vec::new();
        for &index in node.indices() {
            let edge = &self.edges[&index];
            let other = if edge.source() == Some(label) {
                edge.destination()
            } else {
                edge.source()
            };
            if let Some(other) = other {
                if other != label && !out.contains(&other) {
                    out.push(other);
                }
            }
        }
        Ok(out)
    }

    /// Nodes feeding into `label` over non-virtual edges.
    pub fn in_neighbors(&self, label: NodeLabel) -> Result<Vec<NodeLabel>> {
        let node = self.node(label)?;
        let mut out = Vec::new();
        for &index in node.indices() {
            let edge = &self.edges[&index];
            if edge.is_virtual() || edge.destination() != Some(label) {
                continue;
            }
            if let Some(source) = edge.source() {
                if source != label && !out.contains(&source) {
                    out.push(source);
                }
            }
        }
        Ok(out)
    }

    /// Nodes fed by `label` over non-virtual edges.
    pub fn out_neighbors(&self, label: NodeLabel) -> Result<Vec<NodeLabel>> {
        let node = self.node(label)?;
        let mut out = Vec::new();
        for &index in node.indices() {
            let edge = &self.edges[&index];
            if edge.is_virtual() || edge.source() != Some(label) {
                continue;
            }
            if let Some(destination) = edge.destination() {
                if destination != label && !out.contains(&destination) {
                    out.push(destination);
                }
            }
        }
        Ok(out)
    }

    /// Nodes joined to `label` by virtual bonds.
    pub fn virtual_neighbors(&self, label: NodeLabel) -> Result<Vec<NodeLabel>> {
        let node = self.node(label)?;
        let mut out = Vec::new();
        for &index in node.indices() {
            let edge = &self.edges[&index];
            if !edge.is_virtual() {
                continue;
            }
            let other = if edge.source() == Some(label) {
                edge.destination()
            } else {
                edge.source()
            };
            if let Some(other) = other {
                if other != label && !out.contains(&other) {
                    out.push(other);
                }
            }
        }
        Ok(out)
    }

    /// Index labels of the non-virtual edges entering `label`.
    pub fn in_edges(&self, label: NodeLabel) -> Result<Vec<IndexLabel>> {
        let node = self.node(label)?;
        let mut out = Vec::new();
        for &index in node.indices() {
            let edge = &self.edges[&index];
            if !edge.is_virtual() && edge.destination() == Some(label) && !out.contains(&index) {
                out.push(index);
            }
        }
        Ok(out)
    }

    /// Index labels of the non-virtual edges leaving `label`.
    pub fn out_edges(&self, label: NodeLabel) -> Result<Vec<IndexLabel>> {
        let node = self.node(label)?;
        let mut out = Vec::new();
        for &index in node.indices() {
            let edge = &self.edges[&index];
            if !edge.is_virtual() && edge.source() == Some(label) && !out.contains(&index) {
                out.push(index);
            }
        }
        Ok(out)
    }

    fn check_targets(&self, target_qubits: &[usize]) -> Result<()> {
        if target_qubits.is_empty() {
            return Err(CircuitError::InvalidArgument(
                "a gate must act on at least one qubit".to_owned(),
            ));
        }
        if !target_qubits.iter().all_unique() {
            return Err(CircuitError::InvalidArgument(format!(
                "duplicate target qubits in {target_qubits:?}"
            )));
        }
        if let Some(&q) = target_qubits
            .iter()
            .find(|&&q| q == 0 || q > self.num_qubits)
        {
            return Err(CircuitError::InvalidArgument(format!(
                "qubit {q} is outside 1..={}",
                self.num_qubits
            )));
        }
        Ok(())
    }
}
