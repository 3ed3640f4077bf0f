//! Storage and numeric-kernel contract between the graph core and the tensor
//! execution backend.
//!
//! The graph never performs tensor arithmetic itself. It issues three kinds
//! of typed requests, addressed by label: store a payload, fetch a payload,
//! and decompose a payload across an axis bipartition. [`MemoryBackend`]
//! executes the requests immediately in memory; a deferred backend can record
//! them into a command script instead and satisfy the same trait.

use log::trace;
use nalgebra::DMatrix;
use num_complex::Complex64;
use rustc_hash::FxHashMap;

use crate::tensornetwork::tensordata::TensorData;
use crate::types::{CircuitError, NodeLabel, Result};

/// Two factors produced by a truncated SVD, plus the size of the bond
/// connecting them. The left factor carries the bond as its last axis, the
/// right factor as its first.
#[derive(Debug, Clone)]
pub struct SplitTensor {
    pub left: TensorData,
    pub right: TensorData,
    pub bond_dimension: usize,
}

/// The requests the graph core issues to a tensor backend.
pub trait TensorBackend {
    /// Stores `payload` under `data_label`. `node_label` identifies the graph
    /// node the payload belongs to; deferred backends use it to name the
    /// recorded operation.
    fn store_tensor(
        &mut self,
        node_label: NodeLabel,
        data_label: NodeLabel,
        payload: TensorData,
    ) -> Result<()>;

    /// Retrieves the payload stored under `data_label`.
    fn fetch_tensor(&self, data_label: NodeLabel) -> Result<TensorData>;

    /// Factors the payload stored under `data_label` across the given axis
    /// bipartition, truncating singular values at or below `threshold`.
    /// `left_axes` and `right_axes` are axis positions and must together form
    /// a permutation of the payload's axes.
    fn decompose_tensor(
        &mut self,
        data_label: NodeLabel,
        left_axes: &[usize],
        right_axes: &[usize],
        threshold: f64,
    ) -> Result<SplitTensor>;
}

/// Immediate in-memory backend: payloads live in a map keyed by data label
/// and every request is executed on the spot.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tensors: FxHashMap<NodeLabel, TensorData>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payloads.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Returns whether a payload is stored under `data_label`.
    pub fn contains(&self, data_label: NodeLabel) -> bool {
        self.tensors.contains_key(&data_label)
    }
}

impl TensorBackend for MemoryBackend {
    fn store_tensor(
        &mut self,
        node_label: NodeLabel,
        data_label: NodeLabel,
        payload: TensorData,
    ) -> Result<()> {
        trace!(
            "store {data_label} for {node_label}, shape {:?}",
            payload.shape()
        );
        self.tensors.insert(data_label, payload);
        Ok(())
    }

    fn fetch_tensor(&self, data_label: NodeLabel) -> Result<TensorData> {
        self.tensors
            .get(&data_label)
            .cloned()
            .ok_or_else(|| CircuitError::UnknownLabel(data_label.to_string()))
    }

    fn decompose_tensor(
        &mut self,
        data_label: NodeLabel,
        left_axes: &[usize],
        right_axes: &[usize],
        threshold: f64,
    ) -> Result<SplitTensor> {
        let tensor = self
            .tensors
            .get(&data_label)
            .ok_or_else(|| CircuitError::UnknownLabel(data_label.to_string()))?;
        split_tensor(tensor, left_axes, right_axes, threshold)
    }
}

/// Truncated SVD of a tensor across an axis bipartition.
///
/// The tensor is permuted so all left axes precede all right axes, matricized
/// into `prod(left dims) x prod(right dims)`, and decomposed. Singular values
/// strictly above `threshold` are kept; the square root of each is absorbed
/// into both factors.
pub fn split_tensor(
    tensor: &TensorData,
    left_axes: &[usize],
    right_axes: &[usize],
    threshold: f64,
) -> Result<SplitTensor> {
    let shape = tensor.shape();
    let rank = tensor.ndim();
    let mut covered = vec![false; rank];
    for &axis in left_axes.iter().chain(right_axes) {
        if axis >= rank || covered[axis] {
            return Err(CircuitError::InvalidArgument(format!(
                "axes do not form a bipartition of a rank-{rank} tensor"
            )));
        }
        covered[axis] = true;
    }
    if left_axes.len() + right_axes.len() != rank {
        return Err(CircuitError::InvalidArgument(format!(
            "axes do not form a bipartition of a rank-{rank} tensor"
        )));
    }

    let left_dims: Vec<usize> = left_axes.iter().map(|&a| shape[a]).collect();
    let right_dims: Vec<usize> = right_axes.iter().map(|&a| shape[a]).collect();
    let rows: usize = left_dims.iter().product();
    let cols: usize = right_dims.iter().product();

    let order: Vec<usize> = left_axes.iter().chain(right_axes).copied().collect();
    let permuted = tensor.permuted_axes(&order);
    let flat: Vec<Complex64> = permuted.array().iter().copied().collect();
    let matrix = DMatrix::from_row_slice(rows, cols, &flat);

    let svd = matrix.svd(true, true);
    let u = svd.u.expect("svd was computed with u");
    let v_t = svd.v_t.expect("svd was computed with v_t");
    let singular_values = svd.singular_values;
    // The truncation below relies on descending order; nalgebra guarantees
    // it, but the engine asserts instead of silently trusting the routine.
    debug_assert!(singular_values
        .as_slice()
        .windows(2)
        .all(|pair| pair[0] >= pair[1]));

    let chi = singular_values
        .iter()
        .take_while(|&&value| value > threshold)
        .count();

    let mut left = u.columns(0, chi).into_owned();
    for (column, value) in singular_values.iter().take(chi).enumerate() {
        let weight = value.sqrt();
        for entry in left.column_mut(column).iter_mut() {
            *entry *= weight;
        }
    }
    let mut right = v_t.rows(0, chi).into_owned();
    for (row, value) in singular_values.iter().take(chi).enumerate() {
        let weight = value.sqrt();
        for entry in right.row_mut(row).iter_mut() {
            *entry *= weight;
        }
    }

    let mut left_flat = Vec::with_capacity(rows * chi);
    for row in 0..rows {
        for column in 0..chi {
            left_flat.push(left[(row, column)]);
        }
    }
    let mut right_flat = Vec::with_capacity(chi * cols);
    for row in 0..chi {
        for column in 0..cols {
            right_flat.push(right[(row, column)]);
        }
    }

    let mut left_shape = left_dims;
    left_shape.push(chi);
    let mut right_shape = vec![chi];
    right_shape.extend(right_dims);
    Ok(SplitTensor {
        left: TensorData::new_from_flat(&left_shape, left_flat)?,
        right: TensorData::new_from_flat(&right_shape, right_flat)?,
        bond_dimension: chi,
    })
}

/// Contracts two factors over the bond they share: the last axis of `left`
/// against the first axis of `right`. The result keeps the remaining axes of
/// `left` followed by the remaining axes of `right`.
pub fn contract_bond(left: &TensorData, right: &TensorData) -> Result<TensorData> {
    let left_shape = left.shape();
    let right_shape = right.shape();
    let (Some(&bond), Some(&bond_check)) = (left_shape.last(), right_shape.first()) else {
        return Err(CircuitError::InvalidArgument(
            "cannot contract a rank-0 factor".to_owned(),
        ));
    };
    if bond != bond_check {
        return Err(CircuitError::DimensionMismatch {
            expected: bond,
            actual: bond_check,
        });
    }

    let rows: usize = left_shape[..left_shape.len() - 1].iter().product();
    let cols: usize = right_shape[1..].iter().product();
    let left_flat: Vec<Complex64> = left.array().iter().copied().collect();
    let right_flat: Vec<Complex64> = right.array().iter().copied().collect();
    let product = DMatrix::from_row_slice(rows, bond, &left_flat)
        * DMatrix::from_row_slice(bond, cols, &right_flat);

    let mut shape: Vec<usize> = left_shape[..left_shape.len() - 1].to_vec();
    shape.extend(&right_shape[1..]);
    let mut flat = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for column in 0..cols {
            flat.push(product[(row, column)]);
        }
    }
    TensorData::new_from_flat(&shape, flat)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::str::FromStr;

    use float_cmp::assert_approx_eq;

    fn label(n: u64) -> NodeLabel {
        NodeLabel::from_str(&format!("node_{n}")).unwrap()
    }

    fn real(values: &[f64]) -> Vec<Complex64> {
        values.iter().map(|&v| Complex64::new(v, 0.0)).collect()
    }

    #[test]
    fn store_and_fetch_round_trip() {
        let mut backend = MemoryBackend::new();
        let payload = TensorData::new_from_flat(&[2], real(&[1.0, 0.0])).unwrap();
        backend.store_tensor(label(1), label(1), payload.clone()).unwrap();
        assert!(backend.contains(label(1)));
        assert_eq!(backend.fetch_tensor(label(1)).unwrap(), payload);
        assert!(matches!(
            backend.fetch_tensor(label(2)),
            Err(CircuitError::UnknownLabel(_))
        ));
    }

    #[test]
    fn split_of_identity_keeps_full_rank() {
        let identity = TensorData::new_from_flat(&[2, 2], real(&[1.0, 0.0, 0.0, 1.0])).unwrap();
        let split = split_tensor(&identity, &[0], &[1], 1e-12).unwrap();
        assert_eq!(split.bond_dimension, 2);
        assert_eq!(split.left.shape(), &[2, 2]);
        assert_eq!(split.right.shape(), &[2, 2]);
        let reconstructed = contract_bond(&split.left, &split.right).unwrap();
        assert_eq!(reconstructed, identity);
    }

    #[test]
    fn split_truncates_small_singular_values() {
        // A rank-1 matrix plus a small perturbation collapses to a single
        // bond component at a threshold above the perturbation.
        let data = real(&[1.0, 1.0, 1.0, 1.0 + 1e-6]);
        let matrix = TensorData::new_from_flat(&[2, 2], data).unwrap();
        let split = split_tensor(&matrix, &[0], &[1], 1e-3).unwrap();
        assert_eq!(split.bond_dimension, 1);

        let reconstructed = contract_bond(&split.left, &split.right).unwrap();
        for row in 0..2 {
            for column in 0..2 {
                assert_approx_eq!(
                    f64,
                    reconstructed.get(&[row, column]).re,
                    1.0,
                    epsilon = 1e-3
                );
            }
        }
    }

    #[test]
    fn split_weights_both_factors_evenly() {
        // diag(4, 1) has singular values 4 and 1, so each factor absorbs
        // their square roots: entry magnitudes 2 and 1 on both sides.
        let data = real(&[4.0, 0.0, 0.0, 1.0]);
        let matrix = TensorData::new_from_flat(&[2, 2], data).unwrap();
        let split = split_tensor(&matrix, &[0], &[1], 1e-12).unwrap();
        assert_approx_eq!(f64, split.left.get(&[0, 0]).norm(), 2.0, epsilon = 1e-10);
        assert_approx_eq!(f64, split.left.get(&[1, 1]).norm(), 1.0, epsilon = 1e-10);
        assert_approx_eq!(f64, split.left.get(&[0, 1]).norm(), 0.0, epsilon = 1e-10);
        assert_approx_eq!(f64, split.right.get(&[0, 0]).norm(), 2.0, epsilon = 1e-10);
        assert_approx_eq!(f64, split.right.get(&[1, 1]).norm(), 1.0, epsilon = 1e-10);
        let reconstructed = contract_bond(&split.left, &split.right).unwrap();
        assert_eq!(reconstructed, matrix);
    }

    #[test]
    fn split_validates_the_axis_bipartition() {
        let identity = TensorData::new_from_flat(&[2, 2], real(&[1.0, 0.0, 0.0, 1.0])).unwrap();
        for (left, right) in [
            (&[0usize][..], &[][..]),
            (&[0, 1][..], &[1][..]),
            (&[0][..], &[2][..]),
        ] {
            assert!(matches!(
                split_tensor(&identity, left, right, 1e-12),
                Err(CircuitError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn contract_bond_checks_bond_sizes() {
        let a = TensorData::new_from_flat(&[2, 2], real(&[1.0, 0.0, 0.0, 1.0])).unwrap();
        let b = TensorData::new_from_flat(&[3, 2], real(&[0.0; 6])).unwrap();
        assert!(matches!(
            contract_bond(&a, &b),
            Err(CircuitError::DimensionMismatch { .. })
        ));
    }
}
